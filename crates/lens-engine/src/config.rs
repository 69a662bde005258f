//! Engine configuration.

use crate::settings::Settings;
use lens_preview::{PreviewSize, cache::DEFAULT_MIN_BYTES, default_cache_dir};
use lens_themes::ThemeKind;
use std::path::PathBuf;
use std::time::Duration;

/// Repeated loads of the same directory within this window are ignored.
pub const LOAD_COOLDOWN: Duration = Duration::from_secs(3);

/// Upper bound on one composition.
pub const RENDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Where generation work runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Execution {
    /// On the caller's thread, at most one generation per `tick()`.
    #[default]
    Inline,
    /// On `max_concurrent` background worker threads.
    Threaded,
}

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub kind: ThemeKind,
    pub cache_dir: PathBuf,
    pub min_cache_bytes: u64,
    pub target_size: PreviewSize,
    pub execution: Execution,
    pub max_concurrent: usize,
    /// Placeholders surfaced per tick.
    pub batch_size: usize,
    pub load_cooldown: Duration,
    pub render_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: ThemeKind::default(),
            cache_dir: default_cache_dir(),
            min_cache_bytes: DEFAULT_MIN_BYTES,
            target_size: PreviewSize::default(),
            execution: Execution::default(),
            max_concurrent: 1,
            batch_size: 8,
            load_cooldown: LOAD_COOLDOWN,
            render_timeout: RENDER_TIMEOUT,
        }
    }
}

impl EngineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            kind: settings.kind,
            target_size: settings.target_size.clamped(),
            batch_size: settings.batch_size.max(1),
            ..Self::default()
        }
        .with_concurrency(settings.max_concurrent)
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_kind(mut self, kind: ThemeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Out-of-range sizes are clamped to [`PreviewSize::MAX_EDGE`].
    pub fn with_target_size(mut self, size: PreviewSize) -> Self {
        self.target_size = size.clamped();
        self
    }

    /// One job runs inline; more than one uses a worker pool of that size.
    pub fn with_concurrency(mut self, jobs: usize) -> Self {
        self.max_concurrent = jobs.max(1);
        self.execution = if jobs > 1 {
            Execution::Threaded
        } else {
            Execution::Inline
        };
        self
    }

    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_load_cooldown(mut self, cooldown: Duration) -> Self {
        self.load_cooldown = cooldown;
        self
    }

    /// In-flight limit as actually enforced.
    pub fn concurrency_limit(&self) -> usize {
        match self.execution {
            Execution::Inline => 1,
            Execution::Threaded => self.max_concurrent.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrency_selects_execution() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.execution, Execution::Inline);
        assert_eq!(cfg.concurrency_limit(), 1);

        let cfg = EngineConfig::default().with_concurrency(3);
        assert_eq!(cfg.execution, Execution::Threaded);
        assert_eq!(cfg.concurrency_limit(), 3);

        let cfg = EngineConfig::default().with_concurrency(0);
        assert_eq!(cfg.max_concurrent, 1);
        assert_eq!(cfg.execution, Execution::Inline);
    }

    #[test]
    fn test_from_settings() {
        let settings = Settings {
            target_size: PreviewSize::square(128),
            batch_size: 0,
            max_concurrent: 2,
            ..Settings::default()
        };
        let cfg = EngineConfig::from_settings(&settings);
        assert_eq!(cfg.target_size, PreviewSize::square(128));
        assert_eq!(cfg.batch_size, 1);
        assert_eq!(cfg.execution, Execution::Threaded);
        assert_eq!(cfg.load_cooldown, LOAD_COOLDOWN);
    }

    #[test]
    fn test_oversized_target_is_clamped() {
        let settings = Settings {
            target_size: PreviewSize::new(100_000, 64),
            ..Settings::default()
        };
        let cfg = EngineConfig::from_settings(&settings);
        assert_eq!(cfg.target_size, PreviewSize::new(PreviewSize::MAX_EDGE, 64));

        let cfg = EngineConfig::default().with_target_size(PreviewSize::square(u32::MAX));
        assert!(cfg.target_size.is_valid());
    }
}
