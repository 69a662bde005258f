//! Canonical role tables.
//!
//! Every preview of a given kind tries to fill the same slots in the same
//! order so previews stay visually comparable across themes.

use crate::types::{CanonicalRole, Category, ThemeKind};

/// Categories an icon package must populate to count as complete.
pub const REQUIRED_ICON_CATEGORIES: &[Category] =
    &[Category::Places, Category::Devices, Category::Mimetypes];

pub static ICON_ROLES: [CanonicalRole; 16] = [
    // Places
    CanonicalRole {
        id: "folder",
        label: "Folder",
        category: Category::Places,
        aliases: &["folder", "inode-directory", "folder-blue"],
    },
    CanonicalRole {
        id: "user-home",
        label: "Home",
        category: Category::Places,
        aliases: &["user-home", "folder-home", "go-home"],
    },
    CanonicalRole {
        id: "user-desktop",
        label: "Desktop",
        category: Category::Places,
        aliases: &["user-desktop", "desktop", "folder-desktop"],
    },
    CanonicalRole {
        id: "user-trash",
        label: "Trash",
        category: Category::Places,
        aliases: &["user-trash", "user-trash-empty", "trashcan_empty"],
    },
    // Devices
    CanonicalRole {
        id: "drive-harddisk",
        label: "Hard disk",
        category: Category::Devices,
        aliases: &["drive-harddisk", "harddrive", "drive-harddisk-system"],
    },
    CanonicalRole {
        id: "media-optical",
        label: "Optical media",
        category: Category::Devices,
        aliases: &["media-optical", "drive-optical", "media-cdrom"],
    },
    CanonicalRole {
        id: "computer",
        label: "Computer",
        category: Category::Devices,
        aliases: &["computer", "system", "computer-laptop"],
    },
    CanonicalRole {
        id: "input-keyboard",
        label: "Keyboard",
        category: Category::Devices,
        aliases: &["input-keyboard", "keyboard", "preferences-desktop-keyboard"],
    },
    // Mimetypes
    CanonicalRole {
        id: "text-x-generic",
        label: "Text document",
        category: Category::Mimetypes,
        aliases: &["text-x-generic", "text-plain", "text"],
    },
    CanonicalRole {
        id: "image-x-generic",
        label: "Image",
        category: Category::Mimetypes,
        aliases: &["image-x-generic", "image", "image-png"],
    },
    CanonicalRole {
        id: "audio-x-generic",
        label: "Audio",
        category: Category::Mimetypes,
        aliases: &["audio-x-generic", "audio", "audio-mpeg"],
    },
    CanonicalRole {
        id: "video-x-generic",
        label: "Video",
        category: Category::Mimetypes,
        aliases: &["video-x-generic", "video", "video-mp4"],
    },
    // Apps
    CanonicalRole {
        id: "utilities-terminal",
        label: "Terminal",
        category: Category::Apps,
        aliases: &["utilities-terminal", "terminal", "org.gnome.Terminal"],
    },
    CanonicalRole {
        id: "web-browser",
        label: "Web browser",
        category: Category::Apps,
        aliases: &["web-browser", "internet-web-browser", "firefox"],
    },
    CanonicalRole {
        id: "system-file-manager",
        label: "File manager",
        category: Category::Apps,
        aliases: &["system-file-manager", "file-manager", "org.gnome.Nautilus"],
    },
    CanonicalRole {
        id: "preferences-system",
        label: "Settings",
        category: Category::Apps,
        aliases: &[
            "preferences-system",
            "preferences-desktop",
            "gnome-control-center",
        ],
    },
];

pub static CURSOR_ROLES: [CanonicalRole; 16] = [
    cursor("default", "Pointer", &["left_ptr", "default", "arrow"]),
    cursor("pointer", "Link", &["hand2", "pointer", "pointing_hand", "hand1"]),
    cursor("text", "Text", &["xterm", "text", "ibeam"]),
    cursor("wait", "Busy", &["watch", "wait"]),
    cursor("progress", "Working", &["left_ptr_watch", "progress"]),
    cursor("crosshair", "Crosshair", &["crosshair", "cross", "tcross"]),
    cursor("move", "Move", &["fleur", "move", "all-scroll"]),
    cursor("help", "Help", &["question_arrow", "help", "whats_this"]),
    cursor("ew-resize", "Horizontal resize", &["sb_h_double_arrow", "ew-resize", "h_double_arrow"]),
    cursor("ns-resize", "Vertical resize", &["sb_v_double_arrow", "ns-resize", "v_double_arrow"]),
    cursor("se-resize", "Diagonal resize", &["bottom_right_corner", "se-resize", "size_fdiag"]),
    cursor("ne-resize", "Anti-diagonal resize", &["top_right_corner", "ne-resize", "size_bdiag"]),
    cursor("not-allowed", "Unavailable", &["not-allowed", "crossed_circle", "forbidden"]),
    cursor("grabbing", "Grabbing", &["grabbing", "closedhand", "dnd-move"]),
    cursor("pencil", "Draw", &["pencil", "draft"]),
    cursor("zoom-in", "Zoom", &["zoom-in", "zoom_in"]),
];

const fn cursor(
    id: &'static str,
    label: &'static str,
    aliases: &'static [&'static str],
) -> CanonicalRole {
    CanonicalRole {
        id,
        label,
        category: Category::Cursors,
        aliases,
    }
}

/// Role table for a theme kind.
pub fn roles_for(kind: ThemeKind) -> &'static [CanonicalRole] {
    match kind {
        ThemeKind::Icons => &ICON_ROLES,
        ThemeKind::Cursors => &CURSOR_ROLES,
    }
}

/// Look up a role by id within a kind's table.
pub fn role_by_id(kind: ThemeKind, id: &str) -> Option<&'static CanonicalRole> {
    roles_for(kind).iter().find(|r| r.id == id)
}
