//! Error types for lens-engine

use std::path::PathBuf;

/// Settings store errors.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot replace settings file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("{0} is a built-in root and cannot be removed")]
    DefaultRoot(PathBuf),
}

/// Engine and generation errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no active directory")]
    NoActiveDirectory,

    #[error("theme {0} is not in the active directory")]
    UnknownTheme(String),

    #[error("theme directory vanished: {0}")]
    PackageGone(PathBuf),

    #[error("preview size {0} is out of range")]
    InvalidSize(lens_preview::PreviewSize),

    #[error("preview for {0} failed in this load; refresh to retry")]
    Failed(String),

    #[error("generation for {0} was dropped")]
    Dropped(String),

    #[error("preview worker panicked: {0}")]
    WorkerPanic(String),

    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("preview error: {0}")]
    Preview(#[from] lens_preview::PreviewError),
}
