//! Asset file filters and directory token classification.

use crate::types::QualityTier;
use std::fs;
use std::path::Path;

/// Extensions accepted as renderable theme assets.
pub const ASSET_EXTENSIONS: &[&str] = &["svg", "svgz", "png"];

/// Extension order when the directory holds vector sources.
pub const VECTOR_FIRST: &[&str] = &["svg", "svgz", "png"];

/// Extension order when the directory holds fixed-size bitmaps.
pub const RASTER_FIRST: &[&str] = &["png", "svg", "svgz"];

/// Size bands at or below this edge length are never searched.
pub const MIN_BAND_PX: u32 = 32;

/// Directory names that mark vector sources.
const VECTOR_DIR_TOKENS: &[&str] = &["scalable", "svg"];

pub fn is_vector_extension(ext: &str) -> bool {
    ext.eq_ignore_ascii_case("svg") || ext.eq_ignore_ascii_case("svgz")
}

/// True for a file name that looks like a full-colour asset
/// (known extension, not a `-symbolic` variant).
pub fn is_asset_name(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    let Some((stem, ext)) = lower.rsplit_once('.') else {
        return false;
    };
    !stem.is_empty() && ASSET_EXTENSIONS.contains(&ext) && !stem.contains("symbolic")
}

/// True if `dir` directly contains at least one regular (non-symlink) asset file.
pub fn dir_has_real_asset(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };

    entries.filter_map(|e| e.ok()).any(|entry| {
        // DirEntry::file_type does not follow symlinks
        let is_regular = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        is_regular && is_asset_name(&entry.file_name().to_string_lossy())
    })
}

/// Parse a size band token: `48`, `48x48`, `48x48@2x`, `48@2x`.
/// Returns the effective edge length in pixels.
pub fn parse_size_band(token: &str) -> Option<u32> {
    let (base, scale) = match token.split_once('@') {
        Some((base, scale)) => {
            let factor = scale.strip_suffix('x').or_else(|| scale.strip_suffix('X'))?;
            (base, factor.parse::<u32>().ok()?)
        }
        None => (token, 1),
    };

    let edge = match base.split_once(['x', 'X']) {
        Some((w, h)) => {
            let w = w.parse::<u32>().ok()?;
            let h = h.parse::<u32>().ok()?;
            w.max(h)
        }
        None => base.parse::<u32>().ok()?,
    };

    if edge == 0 || scale == 0 {
        return None;
    }
    Some(edge.saturating_mul(scale))
}

/// True for a directory component naming a band too small to represent a theme.
pub fn is_blacklisted_band(token: &str) -> bool {
    parse_size_band(token).is_some_and(|px| px <= MIN_BAND_PX)
}

pub fn is_vector_dir_token(token: &str) -> bool {
    VECTOR_DIR_TOKENS
        .iter()
        .any(|t| t.eq_ignore_ascii_case(token))
}

/// Classify a directory from its path components relative to the package root.
///
/// Vector markers win over size bands; a directory without either counts as
/// `Direct` only when it sits at most `direct_depth` levels below the root.
pub fn classify_tier(components: &[&str], direct_depth: usize) -> Option<QualityTier> {
    if components.iter().any(|c| is_vector_dir_token(c)) {
        return Some(QualityTier::Vector);
    }

    let band = components
        .iter()
        .filter_map(|c| parse_size_band(c))
        .max();
    if let Some(px) = band {
        if px <= MIN_BAND_PX {
            return None;
        }
        return Some(QualityTier::Raster(px));
    }

    if components.len() <= direct_depth {
        Some(QualityTier::Direct)
    } else {
        None
    }
}
