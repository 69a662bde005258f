//! Error types for lens-preview

use std::path::PathBuf;

/// Preview pipeline errors.
///
/// A raster error only costs one tile; a cache error only costs
/// persistence. Neither aborts composition.
#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("cannot rasterize {path}: {reason}")]
    RasterDecode { path: PathBuf, reason: String },

    #[error("cannot write preview cache {path}: {source}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Xcursor error: {0}")]
    Xcursor(#[from] XcursorError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl PreviewError {
    pub fn raster(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PreviewError::RasterDecode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Malformed Xcursor data.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum XcursorError {
    #[error("not an Xcursor file")]
    BadMagic,

    #[error("truncated at byte {0}")]
    Truncated(usize),

    #[error("chunk at {position} does not match its table entry")]
    ChunkMismatch { position: usize },

    #[error("image {width}x{height} exceeds the format limit")]
    TooLarge { width: u32, height: u32 },

    #[error("no image chunks")]
    NoImages,
}
