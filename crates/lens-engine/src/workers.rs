//! Background generation threads.
//!
//! Jobs go in over one channel and completions come back over another;
//! the engine drains completions on its own thread. Workers check the
//! shared context counter before starting, so a job queued for a directory
//! that is no longer shown is skipped without rendering.

use crate::error::EngineError;
use crate::pipeline::PreviewPipeline;
use crate::task::{ContextId, Preview, TaskKey};
use crossbeam_channel::{Receiver, Sender, unbounded};
use lens_themes::ThemePackage;
use log::{debug, error};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

pub struct Job {
    pub key: TaskKey,
    pub package: ThemePackage,
    pub context: ContextId,
}

pub struct Completion {
    pub key: TaskKey,
    pub context: ContextId,
    /// `None` when the worker skipped a stale job.
    pub result: Option<Result<Arc<Preview>, EngineError>>,
}

pub struct WorkerPool {
    job_tx: Option<Sender<Job>>,
    done_rx: Receiver<Completion>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(
        size: usize,
        pipeline: Arc<PreviewPipeline>,
        current_context: Arc<AtomicU64>,
    ) -> Self {
        let (job_tx, job_rx) = unbounded::<Job>();
        let (done_tx, done_rx) = unbounded::<Completion>();

        let handles = (0..size.max(1))
            .map(|i| {
                let job_rx = job_rx.clone();
                let done_tx = done_tx.clone();
                let pipeline = pipeline.clone();
                let current = current_context.clone();
                thread::Builder::new()
                    .name(format!("preview-worker-{i}"))
                    .spawn(move || worker_loop(job_rx, done_tx, pipeline, current))
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    error!("Failed to spawn preview worker: {}", e);
                    None
                }
            })
            .collect();

        Self {
            job_tx: Some(job_tx),
            done_rx,
            handles,
        }
    }

    pub fn threads(&self) -> usize {
        self.handles.len()
    }

    /// Returns false if no worker is alive to take the job.
    pub fn submit(&self, job: Job) -> bool {
        match &self.job_tx {
            Some(tx) if !self.handles.is_empty() => tx.send(job).is_ok(),
            _ => false,
        }
    }

    pub fn try_completion(&self) -> Option<Completion> {
        self.done_rx.try_recv().ok()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // closing the job channel ends each worker loop
        self.job_tx.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    jobs: Receiver<Job>,
    done: Sender<Completion>,
    pipeline: Arc<PreviewPipeline>,
    current: Arc<AtomicU64>,
) {
    for job in jobs.iter() {
        let result = if current.load(Ordering::SeqCst) != job.context.0 {
            debug!("Skipping stale job for {}", job.key.identity);
            None
        } else {
            Some(run_guarded(&pipeline, &job))
        };

        let completion = Completion {
            key: job.key,
            context: job.context,
            result,
        };
        if done.send(completion).is_err() {
            break;
        }
    }
}

/// Run one generation; a panic becomes a failed task instead of a dead worker.
pub(crate) fn run_guarded(
    pipeline: &PreviewPipeline,
    job: &Job,
) -> Result<Arc<Preview>, EngineError> {
    panic::catch_unwind(AssertUnwindSafe(|| {
        pipeline.generate(&job.package, job.key.size)
    }))
    .unwrap_or_else(|payload| {
        let msg = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(EngineError::WorkerPanic(msg))
    })
}
