//! The per-theme generation step: cache lookup, resolve, compose, store.
//!
//! Runs on whichever thread the engine hands it to, so it only touches
//! shared state through atomics.

use crate::error::EngineError;
use crate::task::Preview;
use lens_preview::{AssetRasterizer, Compositor, PreviewCache, PreviewSize, RenderBudget};
use lens_themes::{ThemePackage, ThemeResolver, roles_for};
use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Running counters, readable from any thread.
#[derive(Debug, Default)]
pub struct EngineStats {
    pub scans: AtomicU64,
    pub validations: AtomicU64,
    pub resolutions: AtomicU64,
    pub compositions: AtomicU64,
    pub cache_hits: AtomicU64,
    pub generation_runs: AtomicU64,
    pub failures: AtomicU64,
    pub superseded: AtomicU64,
}

/// Plain copy of [`EngineStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub scans: u64,
    pub validations: u64,
    pub resolutions: u64,
    pub compositions: u64,
    pub cache_hits: u64,
    pub generation_runs: u64,
    pub failures: u64,
    pub superseded: u64,
}

impl EngineStats {
    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            scans: get(&self.scans),
            validations: get(&self.validations),
            resolutions: get(&self.resolutions),
            compositions: get(&self.compositions),
            cache_hits: get(&self.cache_hits),
            generation_runs: get(&self.generation_runs),
            failures: get(&self.failures),
            superseded: get(&self.superseded),
        }
    }
}

pub struct PreviewPipeline {
    cache: PreviewCache,
    compositor: Compositor<Arc<dyn AssetRasterizer>>,
    stats: Arc<EngineStats>,
    render_timeout: Duration,
}

impl PreviewPipeline {
    pub fn new(
        cache: PreviewCache,
        rasterizer: Arc<dyn AssetRasterizer>,
        stats: Arc<EngineStats>,
        render_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            compositor: Compositor::new(rasterizer),
            stats,
            render_timeout,
        }
    }

    pub fn cache(&self) -> &PreviewCache {
        &self.cache
    }

    /// Produce the preview for one theme at one size.
    ///
    /// A usable cache file short-circuits everything else. A failed cache
    /// write still yields the in-memory image.
    pub fn generate(
        &self,
        package: &ThemePackage,
        size: PreviewSize,
    ) -> Result<Arc<Preview>, EngineError> {
        let request = lens_preview::PreviewRequest::new(package.identity.clone(), size);

        if let Some(hit) = self.cache.get(&request) {
            match hit.load() {
                Ok(image) => {
                    EngineStats::bump(&self.stats.cache_hits);
                    debug!("Cache hit for {} at {}", package.identity, size);
                    return Ok(Arc::new(Preview {
                        identity: package.identity.clone(),
                        size,
                        image,
                        filled: None,
                        cache_path: Some(hit.path),
                        from_cache: true,
                    }));
                }
                Err(e) => warn!("Unreadable cache entry {}: {}", hit.path.display(), e),
            }
        }

        if !package.root_path.is_dir() {
            return Err(EngineError::PackageGone(package.root_path.clone()));
        }

        let assets = ThemeResolver::new(package).resolve_all();
        EngineStats::bump(&self.stats.resolutions);

        let roles = roles_for(package.kind);
        let composed = self.compositor.compose(
            roles,
            &assets,
            size,
            &RenderBudget::with_timeout(self.render_timeout),
        );
        EngineStats::bump(&self.stats.compositions);
        debug!(
            "{}: {} of {} roles resolved, {} tiles drawn",
            package.identity,
            assets.len(),
            roles.len(),
            composed.filled
        );

        let cache_path = match self.cache.put(&request, &composed.image) {
            Ok(entry) => Some(entry.path),
            Err(e) => {
                warn!("Preview for {} not cached: {}", package.identity, e);
                None
            }
        };

        Ok(Arc::new(Preview {
            identity: package.identity.clone(),
            size,
            image: composed.image,
            filled: Some(composed.filled),
            cache_path,
            from_cache: false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use lens_preview::{DefaultRasterizer, PreviewError, ResampleQuality};
    use lens_themes::{ResolvedAsset, ThemeKind};
    use std::fs;
    use tempfile::TempDir;

    struct Flat;

    impl AssetRasterizer for Flat {
        fn rasterize(
            &self,
            _asset: &ResolvedAsset,
            edge: u32,
            _quality: ResampleQuality,
        ) -> Result<RgbaImage, PreviewError> {
            Ok(RgbaImage::from_pixel(edge, edge, Rgba([10, 20, 30, 255])))
        }
    }

    fn pipeline(cache_dir: &std::path::Path, stats: Arc<EngineStats>) -> PreviewPipeline {
        PreviewPipeline::new(
            // flat test images compress below the default floor
            PreviewCache::new(cache_dir).with_min_bytes(1),
            Arc::new(Flat),
            stats,
            Duration::from_secs(10),
        )
    }

    fn theme(root: &std::path::Path) -> ThemePackage {
        let dir = root.join("Mini");
        fs::create_dir_all(dir.join("scalable/places")).unwrap();
        fs::write(dir.join("scalable/places/folder.svg"), "<svg/>").unwrap();
        ThemePackage::new("Mini", dir, ThemeKind::Icons)
    }

    #[test]
    fn test_generate_then_cache_hit() {
        let tmp = TempDir::new().unwrap();
        let stats = Arc::new(EngineStats::default());
        let p = pipeline(&tmp.path().join("cache"), stats.clone());
        let pkg = theme(tmp.path());

        let first = p.generate(&pkg, PreviewSize::square(64)).unwrap();
        assert!(!first.from_cache);
        assert_eq!(first.filled, Some(1));
        assert!(first.cache_path.as_ref().unwrap().is_file());

        let second = p.generate(&pkg, PreviewSize::square(64)).unwrap();
        assert!(second.from_cache);
        assert_eq!(second.image.dimensions(), (64, 64));

        let snap = stats.snapshot();
        assert_eq!(snap.resolutions, 1);
        assert_eq!(snap.compositions, 1);
        assert_eq!(snap.cache_hits, 1);
    }

    #[test]
    fn test_vanished_package_fails() {
        let tmp = TempDir::new().unwrap();
        let p = pipeline(&tmp.path().join("cache"), Arc::new(EngineStats::default()));
        let pkg = ThemePackage::new("Gone", tmp.path().join("Gone"), ThemeKind::Icons);
        assert!(matches!(
            p.generate(&pkg, PreviewSize::square(32)),
            Err(EngineError::PackageGone(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_cache_write_failure_still_returns_image() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();
        let p = PreviewPipeline::new(
            PreviewCache::new(blocker.join("cache")),
            Arc::new(DefaultRasterizer),
            Arc::new(EngineStats::default()),
            Duration::from_secs(10),
        );
        let pkg = theme(tmp.path());

        let preview = p.generate(&pkg, PreviewSize::square(32)).unwrap();
        assert!(preview.cache_path.is_none());
        assert_eq!(preview.image.dimensions(), (32, 32));
    }
}
