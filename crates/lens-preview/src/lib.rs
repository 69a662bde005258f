//! lens-preview: turning resolved theme assets into cached preview images.
//!
//! Features:
//! - SVG/SVGZ rendering at target size (resvg), bitmap resampling (image)
//! - Pure-Rust Xcursor decoding for cursor themes
//! - Fixed-grid composition with supersampling for large previews
//! - Flat on-disk cache keyed by theme identity and size

pub mod cache;
pub mod compose;
pub mod error;
pub mod raster;
pub mod types;
pub mod xcursor;

pub use cache::{PreviewCache, cache_file_name, default_cache_dir};
pub use compose::{ComposeOptions, ComposedPreview, Compositor, GridLayout};
pub use error::{PreviewError, XcursorError};
pub use raster::{AssetRasterizer, DefaultRasterizer};
pub use types::{CachedPreview, PreviewRequest, PreviewSize, RenderBudget, ResampleQuality};
pub use xcursor::{Xcursor, XcursorFrame, export_frames};
