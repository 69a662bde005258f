//! Error types for lens-themes

use log::debug;
use std::path::PathBuf;
use walkdir::DirEntry;

/// Failures while reading a theme root or package tree.
///
/// None of these are fatal: the scanner and validator log them and degrade
/// to an empty or negative result.
#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    #[error("cannot read directory {path}: {source}")]
    ScanIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("unknown theme kind '{0}', expected icons or cursors")]
    UnknownKind(String),
}

/// Entries a walk could not read are logged and skipped.
pub(crate) fn readable(entry: walkdir::Result<DirEntry>) -> Option<DirEntry> {
    entry.map_err(|e| debug!("{}", ThemeError::from(e))).ok()
}
