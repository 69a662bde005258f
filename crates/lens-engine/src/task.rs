//! Generation tasks and their lifecycle.

use crate::error::EngineError;
use crossbeam_channel::Sender;
use image::RgbaImage;
use lens_preview::{PreviewRequest, PreviewSize};
use lens_themes::ThemePackage;
use std::path::PathBuf;
use std::sync::Arc;

/// Identifies one directory load. Every load gets a fresh id; work started
/// under an older id is superseded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u64);

impl ContextId {
    pub fn next(self) -> Self {
        ContextId(self.0 + 1)
    }
}

/// Coalescing key: at most one task per key is generating at a time.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TaskKey {
    pub identity: String,
    pub size: PreviewSize,
}

impl TaskKey {
    pub fn new(identity: impl Into<String>, size: PreviewSize) -> Self {
        Self {
            identity: identity.into(),
            size,
        }
    }

    pub fn request(&self) -> PreviewRequest {
        PreviewRequest::new(self.identity.clone(), self.size)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    Queued,
    Generating,
    Completed,
    Failed,
    Superseded,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Superseded
        )
    }
}

/// A finished preview image, shared by every waiter of the task.
#[derive(Debug)]
pub struct Preview {
    pub identity: String,
    pub size: PreviewSize,
    pub image: RgbaImage,
    /// Cells that received a tile; `None` when loaded from the disk cache.
    pub filled: Option<usize>,
    /// Where the image was cached, if the write succeeded.
    pub cache_path: Option<PathBuf>,
    pub from_cache: bool,
}

/// Terminal result of a task.
#[derive(Debug)]
pub enum TaskOutcome {
    Completed(Arc<Preview>),
    Failed(EngineError),
    /// The task's context was replaced before it finished. Not an error.
    Superseded,
}

impl TaskOutcome {
    pub fn state(&self) -> TaskState {
        match self {
            TaskOutcome::Completed(_) => TaskState::Completed,
            TaskOutcome::Failed(_) => TaskState::Failed,
            TaskOutcome::Superseded => TaskState::Superseded,
        }
    }
}

/// One unit of scheduled work. Waiters that asked for the same key while
/// the task was pending are attached as extra sinks.
#[derive(Debug)]
pub struct GenerationTask {
    pub key: TaskKey,
    pub package: ThemePackage,
    pub context: ContextId,
    pub state: TaskState,
    sinks: Vec<Sender<Arc<Preview>>>,
}

impl GenerationTask {
    pub fn new(package: ThemePackage, size: PreviewSize, context: ContextId) -> Self {
        Self {
            key: TaskKey::new(package.identity.clone(), size),
            package,
            context,
            state: TaskState::Queued,
            sinks: Vec::new(),
        }
    }

    pub fn attach(&mut self, sink: Sender<Arc<Preview>>) {
        self.sinks.push(sink);
    }

    pub fn waiters(&self) -> usize {
        self.sinks.len()
    }

    /// Hand the result to every waiter. Dropped receivers are ignored.
    pub fn deliver(&mut self, preview: &Arc<Preview>) {
        for sink in self.sinks.drain(..) {
            let _ = sink.send(Arc::clone(preview));
        }
    }

    /// Drop all waiters without a result; their receivers disconnect.
    pub fn abandon(&mut self) {
        self.sinks.clear();
    }
}
