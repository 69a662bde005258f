//! lens-engine: scheduling preview generation for a theme browser.
//!
//! Features:
//! - Per-directory load contexts; stale results are dropped, never shown
//! - Coalescing of requests for the same theme and size
//! - Inline (one job per tick) or threaded execution with a fixed limit
//! - Batched placeholders, progress reporting and a reload cooldown
//! - Persisted settings with built-in roots that cannot be removed

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod pipeline;
pub mod progress;
pub mod settings;
pub mod task;
pub mod workers;

pub use config::{EngineConfig, Execution};
pub use engine::ResolutionEngine;
pub use error::{EngineError, SettingsError};
pub use events::{EngineCommand, EngineEvent, drain_events};
pub use pipeline::{EngineStats, PreviewPipeline, StatsSnapshot};
pub use progress::LoadProgress;
pub use settings::{RootEntry, Settings, SettingsStore};
pub use task::{ContextId, GenerationTask, Preview, TaskKey, TaskOutcome, TaskState};
