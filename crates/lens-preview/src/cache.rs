//! On-disk preview cache.
//!
//! A flat directory of PNG files named from `(identity, size)`. Entries are
//! never invalidated or evicted; a truncated write is caught by the size
//! floor on read and simply regenerated.

use crate::error::PreviewError;
use crate::types::{CachedPreview, PreviewRequest};
use image::RgbaImage;
use log::{debug, warn};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Files smaller than this are treated as corrupt.
pub const DEFAULT_MIN_BYTES: u64 = 128;

const SLUG_MAX_LEN: usize = 48;

/// Default cache location: `~/.cache/themelens/previews`.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("themelens")
        .join("previews")
}

/// File name for a request, e.g. `Papirus-Dark_256x256_1f3c9a0b2d4e.png`.
///
/// The readable slug may collide for exotic names, so a short identity
/// hash is appended.
pub fn cache_file_name(request: &PreviewRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(request.identity.as_bytes());
    let hash = hex::encode(hasher.finalize());

    let slug: String = request
        .identity
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .take(SLUG_MAX_LEN)
        .collect();

    format!(
        "{}_{}x{}_{}.png",
        slug,
        request.size.width,
        request.size.height,
        &hash[..12]
    )
}

#[derive(Clone, Debug)]
pub struct PreviewCache {
    dir: PathBuf,
    min_bytes: u64,
}

impl PreviewCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            min_bytes: DEFAULT_MIN_BYTES,
        }
    }

    pub fn with_min_bytes(mut self, min_bytes: u64) -> Self {
        self.min_bytes = min_bytes;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, request: &PreviewRequest) -> PathBuf {
        self.dir.join(cache_file_name(request))
    }

    /// A hit requires the file to exist and be at least the size floor.
    pub fn get(&self, request: &PreviewRequest) -> Option<CachedPreview> {
        let path = self.path_for(request);
        let meta = fs::metadata(&path).ok()?;
        if !meta.is_file() || meta.len() < self.min_bytes {
            debug!(
                "Cache entry {} rejected ({} bytes)",
                path.display(),
                meta.len()
            );
            return None;
        }
        Some(CachedPreview {
            path,
            size_bytes: meta.len(),
        })
    }

    /// Write the preview in place (no temp file).
    pub fn put(
        &self,
        request: &PreviewRequest,
        image: &RgbaImage,
    ) -> Result<CachedPreview, PreviewError> {
        fs::create_dir_all(&self.dir).map_err(|e| PreviewError::CacheWrite {
            path: self.dir.clone(),
            source: image::ImageError::IoError(e),
        })?;
        let path = self.path_for(request);

        image
            .save_with_format(&path, image::ImageFormat::Png)
            .map_err(|source| {
                warn!("Failed to cache preview {}: {}", path.display(), source);
                PreviewError::CacheWrite {
                    path: path.clone(),
                    source,
                }
            })?;

        let size_bytes = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        Ok(CachedPreview { path, size_bytes })
    }
}
