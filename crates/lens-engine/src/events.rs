//! Engine events and commands.
//!
//! Events flow engine -> UI over a crossbeam channel; commands flow the other
//! way through [`ResolutionEngine::handle`](crate::ResolutionEngine::handle).
//! The UI side drains events once per frame.

use crate::task::Preview;
use crossbeam_channel::Receiver;
use lens_preview::PreviewSize;
use std::path::PathBuf;
use std::sync::Arc;

/// Everything the engine tells the UI. There are no other event kinds.
#[derive(Clone, Debug)]
pub enum EngineEvent {
    /// A theme passed validation; show an empty tile for it.
    PlaceholderCreated { identity: String },
    ProgressUpdated { message: String, percent: u8 },
    /// A preview is available for a placeholder of the current directory.
    PreviewReady {
        identity: String,
        preview: Arc<Preview>,
    },
}

impl EngineEvent {
    /// Get variant index for deduplication.
    #[inline]
    pub fn variant_index(&self) -> usize {
        match self {
            EngineEvent::PlaceholderCreated { .. } => 0,
            EngineEvent::ProgressUpdated { .. } => 1,
            EngineEvent::PreviewReady { .. } => 2,
        }
    }
}

/// UI -> engine requests.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineCommand {
    SetActiveDirectory(PathBuf),
    SetTargetSize(PreviewSize),
    AddRoot(PathBuf),
    RemoveRoot(PathBuf),
    /// Rescan the active root and re-enqueue its previews.
    RequestRefresh,
}

/// Drain all pending events, keeping every placeholder and preview but only
/// the latest progress update.
pub fn drain_events(rx: &Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let events: Vec<EngineEvent> = rx.try_iter().collect();
    if events.len() <= 1 {
        return events;
    }

    let mut seen_progress = false;
    let mut result = Vec::with_capacity(events.len());
    for event in events.into_iter().rev() {
        if event.variant_index() == 1 {
            if seen_progress {
                continue;
            }
            seen_progress = true;
        }
        result.push(event);
    }

    result.reverse();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn progress(percent: u8) -> EngineEvent {
        EngineEvent::ProgressUpdated {
            message: format!("{percent}%"),
            percent,
        }
    }

    #[test]
    fn test_drain_keeps_latest_progress_only() {
        let (tx, rx) = unbounded();
        tx.send(progress(10)).unwrap();
        tx.send(EngineEvent::PlaceholderCreated {
            identity: "A".into(),
        })
        .unwrap();
        tx.send(progress(20)).unwrap();
        tx.send(EngineEvent::PlaceholderCreated {
            identity: "B".into(),
        })
        .unwrap();
        tx.send(progress(40)).unwrap();

        let events = drain_events(&rx);
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], EngineEvent::PlaceholderCreated { identity } if identity == "A"));
        assert!(matches!(&events[1], EngineEvent::PlaceholderCreated { identity } if identity == "B"));
        assert!(matches!(events[2], EngineEvent::ProgressUpdated { percent: 40, .. }));
        assert!(drain_events(&rx).is_empty());
    }
}
