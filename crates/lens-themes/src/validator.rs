//! Completeness check for candidate packages.
//!
//! Many installed packages only ship a few categories (or only symbolic
//! variants); those are filtered out before any resolution work is spent.

use crate::assets::dir_has_real_asset;
use crate::error::readable;
use crate::roles::REQUIRED_ICON_CATEGORIES;
use crate::types::{Category, ThemeKind, ThemePackage};
use log::debug;
use std::fs;
use walkdir::WalkDir;

/// Maximum depth explored below a package root.
pub const MAX_WALK_DEPTH: usize = 6;

/// True if `package` satisfies every required bucket of its kind.
pub fn is_complete(package: &ThemePackage) -> bool {
    let complete = match package.kind {
        ThemeKind::Icons => missing_icon_categories(package).is_empty(),
        ThemeKind::Cursors => has_real_cursor(package),
    };

    if !complete {
        debug!("Theme {} is incomplete, skipping", package.identity);
    }
    complete
}

/// Required icon buckets with no real asset anywhere in the tree.
pub fn missing_icon_categories(package: &ThemePackage) -> Vec<Category> {
    let mut missing: Vec<Category> = REQUIRED_ICON_CATEGORIES.to_vec();

    let walker = WalkDir::new(&package.root_path)
        .follow_links(false)
        .max_depth(MAX_WALK_DEPTH)
        .min_depth(1);

    for entry in walker.into_iter().filter_map(readable) {
        if missing.is_empty() {
            break;
        }
        if !entry.file_type().is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        let Some(pos) = missing.iter().position(|c| c.matches(&name)) else {
            continue;
        };

        if dir_has_real_asset(entry.path()) {
            missing.remove(pos);
        }
    }

    missing
}

fn has_real_cursor(package: &ThemePackage) -> bool {
    let Ok(entries) = fs::read_dir(package.root_path.join("cursors")) else {
        return false;
    };
    entries
        .filter_map(|e| e.ok())
        .any(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
}

/// Keep only the complete packages, preserving order.
pub fn filter_complete(packages: Vec<ThemePackage>) -> Vec<ThemePackage> {
    packages.into_iter().filter(is_complete).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"<svg/>").unwrap();
    }

    fn package(dir: &Path) -> ThemePackage {
        ThemePackage::new("T", dir, ThemeKind::Icons)
    }

    #[test]
    fn test_complete_package() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("scalable/places/folder.svg"));
        touch(&tmp.path().join("48x48/devices/computer.png"));
        touch(&tmp.path().join("mimes/64/text-x-generic.svg"));

        // the bucket directory itself must hold an asset
        assert!(!is_complete(&package(tmp.path())));

        touch(&tmp.path().join("mimes/text.svg"));
        assert!(is_complete(&package(tmp.path())));
    }

    #[test]
    fn test_missing_devices_is_incomplete() {
        let tmp = TempDir::new().unwrap();
        for i in 0..24 {
            touch(&tmp.path().join(format!("scalable/places/folder-{}.svg", i)));
            touch(&tmp.path().join(format!("scalable/mimetypes/type-{}.svg", i)));
            touch(&tmp.path().join(format!("scalable/apps/computer-{}.svg", i)));
        }
        fs::create_dir_all(tmp.path().join("scalable/devices")).unwrap();

        let pkg = package(tmp.path());
        assert!(!is_complete(&pkg));
        assert_eq!(missing_icon_categories(&pkg), vec![Category::Devices]);
    }

    #[test]
    fn test_symbolic_only_bucket_does_not_count() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("scalable/places/folder.svg"));
        touch(&tmp.path().join("scalable/devices/computer-symbolic.svg"));
        touch(&tmp.path().join("scalable/mimetypes/text-x-generic.svg"));

        assert!(!is_complete(&package(tmp.path())));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_only_bucket_does_not_count() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("scalable/places/folder.svg"));
        touch(&tmp.path().join("scalable/mimetypes/text-x-generic.svg"));
        fs::create_dir_all(tmp.path().join("scalable/devices")).unwrap();
        std::os::unix::fs::symlink(
            tmp.path().join("scalable/places/folder.svg"),
            tmp.path().join("scalable/devices/computer.svg"),
        )
        .unwrap();

        assert!(!is_complete(&package(tmp.path())));
    }

    #[test]
    fn test_too_deep_does_not_count() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("scalable/places/folder.svg"));
        touch(&tmp.path().join("scalable/mimetypes/text.svg"));
        touch(&tmp.path().join("a/b/c/d/e/f/devices/computer.svg"));

        assert!(!is_complete(&package(tmp.path())));
    }

    #[test]
    fn test_cursor_completeness() {
        let tmp = TempDir::new().unwrap();
        let pkg = ThemePackage::new("C", tmp.path(), ThemeKind::Cursors);
        fs::create_dir_all(tmp.path().join("cursors")).unwrap();
        assert!(!is_complete(&pkg));

        fs::write(tmp.path().join("cursors/left_ptr"), b"Xcur").unwrap();
        assert!(is_complete(&pkg));
    }
}
