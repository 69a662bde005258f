//! Event plumbing between the engine and the presentation side.
//!
//! Design principles:
//! - One engine-owned crossbeam channel, drained by the adapter
//! - Single polling timer (minimal overhead)
//! - Batch processing (drain all events per tick, latest progress only)
//! - Type-safe event enums

use lens_engine::EngineEvent;
use std::time::Duration;

/// Tick interval for the engine loop, roughly one frame.
pub const TICK_INTERVAL: Duration = Duration::from_millis(16);

/// One display line per event.
pub fn describe(event: &EngineEvent) -> String {
    match event {
        EngineEvent::PlaceholderCreated { identity } => format!("  [ ] {}", identity),
        EngineEvent::ProgressUpdated { message, percent } => {
            format!("  {:>3}% {}", percent, message)
        }
        EngineEvent::PreviewReady { identity, preview } => {
            let origin = if preview.from_cache { "cached" } else { "rendered" };
            let tiles = preview
                .filled
                .map(|n| format!(", {} tiles", n))
                .unwrap_or_default();
            let location = preview
                .cache_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "not cached".to_string());
            format!(
                "  [x] {} {} ({}{}) -> {}",
                identity, preview.size, origin, tiles, location
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lens_engine::Preview;
    use lens_preview::PreviewSize;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[test]
    fn test_describe_preview() {
        let preview = Arc::new(Preview {
            identity: "Papirus".into(),
            size: PreviewSize::square(256),
            image: Default::default(),
            filled: Some(14),
            cache_path: Some(PathBuf::from("/tmp/p.png")),
            from_cache: false,
        });
        let line = describe(&EngineEvent::PreviewReady {
            identity: "Papirus".into(),
            preview,
        });
        assert_eq!(line, "  [x] Papirus 256x256 (rendered, 14 tiles) -> /tmp/p.png");
    }

    #[test]
    fn test_describe_progress() {
        let line = describe(&EngineEvent::ProgressUpdated {
            message: "Loading themes 1/4".into(),
            percent: 10,
        });
        assert_eq!(line, "   10% Loading themes 1/4");
    }
}
