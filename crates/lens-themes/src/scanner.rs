//! One-level scan of a theme root for candidate packages.

use crate::assets::{is_vector_dir_token, parse_size_band};
use crate::error::ThemeError;
use crate::paths::parse_theme_index;
use crate::types::{ThemeKind, ThemePackage};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Scan `root` for package directories of `kind`.
///
/// Entries are visited in file-name order. Hidden entries are skipped and
/// the first package seen for an identity wins. An unreadable root yields
/// an empty list.
pub fn scan_root(root: &Path, kind: ThemeKind) -> Vec<ThemePackage> {
    match try_scan_root(root, kind) {
        Ok(packages) => {
            info!(
                "Scanned {}: {} {} candidate(s)",
                root.display(),
                packages.len(),
                kind
            );
            packages
        }
        Err(e) => {
            warn!("Skipping theme root: {}", e);
            Vec::new()
        }
    }
}

pub fn try_scan_root(root: &Path, kind: ThemeKind) -> Result<Vec<ThemePackage>, ThemeError> {
    if !root.is_dir() {
        return Err(ThemeError::NotADirectory(root.to_path_buf()));
    }

    let read_dir = fs::read_dir(root).map_err(|source| ThemeError::ScanIo {
        path: root.to_path_buf(),
        source,
    })?;

    let mut entries: Vec<(String, PathBuf)> = read_dir
        .filter_map(|e| e.ok())
        .map(|e| (e.file_name().to_string_lossy().to_string(), e.path()))
        .filter(|(name, _)| !name.starts_with('.'))
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut seen = HashSet::new();
    let mut packages = Vec::new();

    for (name, path) in entries {
        // follows symlinks, so linked packages count too
        if !path.is_dir() || !has_package_marker(&path, kind) {
            continue;
        }

        let identity = package_identity(&path, &name);
        if !seen.insert(identity.clone()) {
            debug!("Duplicate theme identity {} at {}", identity, path.display());
            continue;
        }

        packages.push(load_package(identity, path, kind));
    }

    Ok(packages)
}

/// Identity of a package directory: the name of the directory it resolves to.
///
/// Aliases such as `default -> Adwaita` therefore share an identity with
/// their target and collapse to one package.
fn package_identity(path: &Path, entry_name: &str) -> String {
    fs::canonicalize(path)
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| entry_name.to_string())
}

/// True if `dir` carries the marker that defines a package of `kind`.
pub fn has_package_marker(dir: &Path, kind: ThemeKind) -> bool {
    match kind {
        ThemeKind::Cursors => dir.join("cursors").is_dir(),
        ThemeKind::Icons => {
            if dir.join("index.theme").is_file() {
                return true;
            }
            // Legacy packages without a manifest still use sized subtrees.
            fs::read_dir(dir)
                .map(|entries| {
                    entries.filter_map(|e| e.ok()).any(|e| {
                        let name = e.file_name().to_string_lossy().to_string();
                        e.path().is_dir()
                            && (is_vector_dir_token(&name) || parse_size_band(&name).is_some())
                    })
                })
                .unwrap_or(false)
        }
    }
}

fn load_package(identity: String, path: PathBuf, kind: ThemeKind) -> ThemePackage {
    let mut package = ThemePackage::new(identity, path, kind);
    if let Some(meta) = parse_theme_index(&package.root_path) {
        if let Some(name) = meta.name {
            package.display_name = name;
        }
        package.description = meta.comment;
        package.author = meta.author;
    }
    package
}
