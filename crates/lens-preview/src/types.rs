//! Core types for lens-preview

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Requested preview dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreviewSize {
    pub width: u32,
    pub height: u32,
}

impl PreviewSize {
    /// Largest accepted edge. Bigger canvases cost gigabytes of memory.
    pub const MAX_EDGE: u32 = 4096;

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn square(edge: u32) -> Self {
        Self::new(edge, edge)
    }

    pub fn min_edge(&self) -> u32 {
        self.width.min(self.height)
    }

    /// Both edges non-zero and at most [`Self::MAX_EDGE`].
    pub fn is_valid(&self) -> bool {
        (1..=Self::MAX_EDGE).contains(&self.width) && (1..=Self::MAX_EDGE).contains(&self.height)
    }

    pub fn clamped(self) -> Self {
        Self::new(
            self.width.clamp(1, Self::MAX_EDGE),
            self.height.clamp(1, Self::MAX_EDGE),
        )
    }

    /// Parse `256`, `256x192` or `256X192`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let size = match s.split_once(['x', 'X']) {
            Some((w, h)) => Self::new(w.trim().parse().ok()?, h.trim().parse().ok()?),
            None => Self::square(s.parse().ok()?),
        };
        size.is_valid().then_some(size)
    }
}

impl Default for PreviewSize {
    fn default() -> Self {
        Self::square(256)
    }
}

impl fmt::Display for PreviewSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// What to render: one theme at one size. Also the cache key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PreviewRequest {
    pub identity: String,
    pub size: PreviewSize,
}

impl PreviewRequest {
    pub fn new(identity: impl Into<String>, size: PreviewSize) -> Self {
        Self {
            identity: identity.into(),
            size,
        }
    }
}

/// A preview file present in the cache directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedPreview {
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl CachedPreview {
    pub fn load(&self) -> Result<image::RgbaImage, crate::PreviewError> {
        Ok(image::open(&self.path)?.to_rgba8())
    }
}

/// Resampling quality for bitmap sources.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResampleQuality {
    Nearest,
    /// Box/area averaging; the default for bitmap tiles.
    #[default]
    Area,
    /// Lanczos, used for the final supersample reduction.
    High,
}

/// Time limit for one composition. Tiles not started before the deadline
/// are reported as raster errors.
#[derive(Clone, Copy, Debug, Default)]
pub struct RenderBudget {
    deadline: Option<Instant>,
}

impl RenderBudget {
    pub fn unlimited() -> Self {
        Self { deadline: None }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
        }
    }

    pub fn exceeded(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
