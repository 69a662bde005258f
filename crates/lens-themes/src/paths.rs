//! Path helpers for XDG theme directories and `index.theme` metadata.

use crate::types::ThemeKind;
use std::fs;
use std::path::{Path, PathBuf};

/// Built-in roots searched for theme packages (user first, then system).
///
/// Cursor and icon themes share the same XDG locations; they differ only in
/// what marks a package, see [`crate::scanner`].
pub fn default_theme_roots(_kind: ThemeKind) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let home = dirs::home_dir().unwrap_or_default();

    let xdg_data_home = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home.join(".local/share"));
    let xdg_data_dirs = std::env::var("XDG_DATA_DIRS")
        .unwrap_or_else(|_| "/usr/local/share:/usr/share".to_string());

    // User themes
    dirs.push(xdg_data_home.join("icons"));
    dirs.push(home.join(".icons"));

    // System themes
    for data_dir in xdg_data_dirs.split(':') {
        if !data_dir.is_empty() {
            dirs.push(PathBuf::from(data_dir).join("icons"));
        }
    }

    let mut seen = std::collections::HashSet::new();
    dirs.retain(|d| seen.insert(d.clone()));
    dirs
}

/// Human readable label for a root, e.g. "icons (~/.local/share)".
pub fn root_label(root: &Path) -> String {
    let parent = root
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default();
    let home = dirs::home_dir()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_default();

    let under_home = !home.is_empty()
        && home != "/"
        && (parent == home || parent.starts_with(&format!("{}/", home)));
    let parent = if under_home {
        parent.replacen(&home, "~", 1)
    } else {
        parent
    };

    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| root.to_string_lossy().to_string());

    if parent.is_empty() {
        name
    } else {
        format!("{} ({})", name, parent)
    }
}

/// Metadata parsed from a package's `index.theme`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ThemeMetadata {
    pub name: Option<String>,
    pub comment: Option<String>,
    pub author: Option<String>,
}

/// Read the `[Icon Theme]` section of `<theme_root>/index.theme`.
///
/// Only the keys needed for display are extracted; localized keys
/// (`Name[de]=`) are ignored.
pub fn parse_theme_index(theme_root: &Path) -> Option<ThemeMetadata> {
    let content = fs::read_to_string(theme_root.join("index.theme")).ok()?;
    Some(parse_theme_index_str(&content))
}

pub fn parse_theme_index_str(content: &str) -> ThemeMetadata {
    let mut meta = ThemeMetadata::default();
    let mut section = String::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') {
            section = line.to_string();
            continue;
        }

        if !section.eq_ignore_ascii_case("[Icon Theme]") {
            continue;
        }

        if let Some((k, v)) = line.split_once('=') {
            let value = v.trim();
            if value.is_empty() {
                continue;
            }
            match k.trim() {
                "Name" => meta.name = Some(value.to_string()),
                "Comment" => meta.comment = Some(value.to_string()),
                "X-Author" | "Author" => meta.author = Some(value.to_string()),
                _ => {}
            }
        }
    }

    meta
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_theme_index() {
        let meta = parse_theme_index_str(
            "[Icon Theme]\nName=Papirus Dark\nName[de]=Papirus Dunkel\nComment=Flat icons\nInherits=hicolor\n\n[16x16/apps]\nSize=16\nComment=ignored\n",
        );
        assert_eq!(meta.name.as_deref(), Some("Papirus Dark"));
        assert_eq!(meta.comment.as_deref(), Some("Flat icons"));
        assert_eq!(meta.author, None);
    }

    #[test]
    fn test_parse_theme_index_other_section_only() {
        let meta = parse_theme_index_str("[Desktop Entry]\nName=Nope\n");
        assert_eq!(meta, ThemeMetadata::default());
    }

    #[test]
    fn test_default_roots_unique() {
        let roots = default_theme_roots(ThemeKind::Icons);
        let unique: std::collections::HashSet<_> = roots.iter().collect();
        assert_eq!(unique.len(), roots.len());
        assert!(roots.iter().all(|r| r.ends_with("icons") || r.ends_with(".icons")));
    }

    #[test]
    fn test_root_label() {
        assert_eq!(root_label(Path::new("/usr/share/icons")), "icons (/usr/share)");
    }
}
