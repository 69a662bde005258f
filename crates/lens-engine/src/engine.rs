//! The resolution engine: one owner for scanning, scheduling and results.
//!
//! The UI thread calls [`ResolutionEngine::tick`] on a timer. Each tick
//! drains finished work, surfaces one batch of placeholders and starts
//! queued generations up to the concurrency limit. Every directory load
//! opens a new context; results that come back for an older context are
//! dropped instead of being shown next to the wrong directory.

use crate::config::{EngineConfig, Execution};
use crate::error::EngineError;
use crate::events::{EngineCommand, EngineEvent};
use crate::pipeline::{EngineStats, PreviewPipeline, StatsSnapshot};
use crate::progress::LoadProgress;
use crate::settings::{RootEntry, Settings, SettingsStore};
use crate::task::{ContextId, GenerationTask, Preview, TaskKey, TaskOutcome, TaskState};
use crate::workers::{Job, WorkerPool, run_guarded};
use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded, unbounded};
use lens_preview::{AssetRasterizer, DefaultRasterizer, PreviewCache, PreviewSize};
use lens_themes::{ThemePackage, filter_complete, scan_root};
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Sleep between ticks when a blocking helper is waiting on workers.
const IDLE_POLL: Duration = Duration::from_millis(2);

struct ActiveDirectory {
    path: PathBuf,
    themes: Vec<ThemePackage>,
    /// Placeholders surfaced so far, as a prefix of `themes`.
    placeholders: usize,
    /// Identities whose preview reached a terminal state in this context.
    settled: HashSet<String>,
}

impl ActiveDirectory {
    fn progress(&self) -> LoadProgress {
        LoadProgress {
            total: self.themes.len(),
            placeholders: self.placeholders,
            settled: self.settled.len(),
        }
    }

    fn is_surfaced(&self, identity: &str) -> bool {
        self.themes[..self.placeholders]
            .iter()
            .any(|t| t.identity == identity)
    }
}

pub struct ResolutionEngine {
    config: EngineConfig,
    settings: Settings,
    store: Option<SettingsStore>,
    stats: Arc<EngineStats>,
    pipeline: Arc<PreviewPipeline>,
    pool: Option<WorkerPool>,

    context: ContextId,
    current_context: Arc<AtomicU64>,

    scan_memo: HashMap<PathBuf, Vec<ThemePackage>>,
    active: Option<ActiveDirectory>,
    last_load: Option<(PathBuf, Instant)>,

    queue: VecDeque<GenerationTask>,
    in_flight: HashMap<TaskKey, GenerationTask>,
    previews: HashMap<TaskKey, Arc<Preview>>,
    /// Keys that failed in the current context; not retried until the
    /// next load or refresh.
    failed: HashSet<TaskKey>,

    events_tx: Sender<EngineEvent>,
    events_rx: Receiver<EngineEvent>,
    last_progress: Option<(u8, String)>,
}

impl ResolutionEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_rasterizer(config, Arc::new(DefaultRasterizer))
    }

    pub fn with_rasterizer(config: EngineConfig, rasterizer: Arc<dyn AssetRasterizer>) -> Self {
        let stats = Arc::new(EngineStats::default());
        let cache = PreviewCache::new(&config.cache_dir).with_min_bytes(config.min_cache_bytes);
        let pipeline = Arc::new(PreviewPipeline::new(
            cache,
            rasterizer,
            stats.clone(),
            config.render_timeout,
        ));

        let current_context = Arc::new(AtomicU64::new(0));
        let pool = match config.execution {
            Execution::Inline => None,
            Execution::Threaded => Some(WorkerPool::spawn(
                config.max_concurrent,
                pipeline.clone(),
                current_context.clone(),
            )),
        };

        let settings = Settings {
            kind: config.kind,
            target_size: config.target_size,
            max_concurrent: config.max_concurrent,
            batch_size: config.batch_size,
            ..Settings::default()
        };

        let (events_tx, events_rx) = unbounded();
        info!(
            "Engine ready: {:?} x{}, cache {}",
            config.execution,
            config.concurrency_limit(),
            config.cache_dir.display()
        );

        Self {
            config,
            settings,
            store: None,
            stats,
            pipeline,
            pool,
            context: ContextId::default(),
            current_context,
            scan_memo: HashMap::new(),
            active: None,
            last_load: None,
            queue: VecDeque::new(),
            in_flight: HashMap::new(),
            previews: HashMap::new(),
            failed: HashSet::new(),
            events_tx,
            events_rx,
            last_progress: None,
        }
    }

    /// Use `settings` as the root list, persisting changes to `store`.
    /// The engine keeps its configured target size and concurrency.
    pub fn with_settings(mut self, settings: Settings, store: Option<SettingsStore>) -> Self {
        self.settings = settings;
        self.store = store;
        self
    }

    // ---- accessors ----

    pub fn events(&self) -> Receiver<EngineEvent> {
        self.events_rx.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &PreviewCache {
        self.pipeline.cache()
    }

    pub fn roots(&self) -> &[RootEntry] {
        &self.settings.roots
    }

    pub fn target_size(&self) -> PreviewSize {
        self.config.target_size
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn active_directory(&self) -> Option<&Path> {
        self.active.as_ref().map(|a| a.path.as_path())
    }

    /// Validated themes of the active directory, in scan order.
    pub fn themes(&self) -> &[ThemePackage] {
        match &self.active {
            Some(active) => &active.themes,
            None => &[],
        }
    }

    pub fn progress(&self) -> Option<LoadProgress> {
        self.active.as_ref().map(ActiveDirectory::progress)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Finished preview held in memory, if any.
    pub fn preview(&self, identity: &str, size: PreviewSize) -> Option<Arc<Preview>> {
        self.previews.get(&TaskKey::new(identity, size)).cloned()
    }

    /// Scheduling state of a key; `None` if nothing is known about it.
    pub fn task_state(&self, identity: &str, size: PreviewSize) -> Option<TaskState> {
        let key = TaskKey::new(identity, size);
        if let Some(task) = self.in_flight.get(&key) {
            return Some(task.state);
        }
        if let Some(task) = self.queue.iter().find(|t| t.key == key) {
            return Some(task.state);
        }
        if self.failed.contains(&key) {
            return Some(TaskState::Failed);
        }
        self.previews.contains_key(&key).then_some(TaskState::Completed)
    }

    pub fn is_idle(&self) -> bool {
        let placeholders_done = self
            .active
            .as_ref()
            .is_none_or(|a| a.placeholders >= a.themes.len());
        placeholders_done && self.queue.is_empty() && self.in_flight.is_empty()
    }

    // ---- commands ----

    pub fn handle(&mut self, command: EngineCommand) -> Result<(), EngineError> {
        debug!("Command: {:?}", command);
        match command {
            EngineCommand::SetActiveDirectory(path) => {
                self.set_active_directory(path);
                Ok(())
            }
            EngineCommand::SetTargetSize(size) => self.set_target_size(size),
            EngineCommand::AddRoot(path) => self.add_root(&path),
            EngineCommand::RemoveRoot(path) => self.remove_root(&path),
            EngineCommand::RequestRefresh => self.refresh(),
        }
    }

    /// Load a directory and start surfacing its themes. Returns false when
    /// the same directory was loaded within the cooldown window.
    pub fn set_active_directory(&mut self, path: impl Into<PathBuf>) -> bool {
        self.load_directory(path.into(), false)
    }

    pub fn set_target_size(&mut self, size: PreviewSize) -> Result<(), EngineError> {
        if !size.is_valid() {
            return Err(EngineError::InvalidSize(size));
        }
        if size == self.config.target_size {
            return Ok(());
        }
        info!("Target size {} -> {}", self.config.target_size, size);
        self.config.target_size = size;
        self.settings.target_size = size;

        if let Some(path) = self.active_directory().map(Path::to_path_buf) {
            self.load_directory(path, true);
        }
        self.persist()
    }

    pub fn add_root(&mut self, path: &Path) -> Result<(), EngineError> {
        self.scan_memo.remove(path);
        if self.settings.add_root(path) {
            info!("Added root {}", path.display());
            self.persist()?;
        }
        Ok(())
    }

    pub fn remove_root(&mut self, path: &Path) -> Result<(), EngineError> {
        if !self.settings.remove_root(path)? {
            return Ok(());
        }
        info!("Removed root {}", path.display());
        self.scan_memo.remove(path);

        if self.active_directory() == Some(path) {
            self.begin_context();
            self.active = None;
            self.last_load = None;
        }
        self.persist()
    }

    /// Rescan the active root. The disk cache is kept, so unchanged themes
    /// come back as cache hits.
    pub fn refresh(&mut self) -> Result<(), EngineError> {
        let Some(active) = self.active.as_ref() else {
            return Err(EngineError::NoActiveDirectory);
        };
        let path = active.path.clone();
        let identities: HashSet<&str> = active.themes.iter().map(|t| t.identity.as_str()).collect();
        self.previews
            .retain(|key, _| !identities.contains(key.identity.as_str()));
        self.scan_memo.remove(&path);

        info!("Refreshing {}", path.display());
        self.load_directory(path, true);
        Ok(())
    }

    // ---- requests ----

    /// Ask for one theme's preview. Requests for a key that is already
    /// queued or generating join that task, so every caller receives the
    /// same `Arc`. The receiver disconnects if the task fails or is
    /// superseded.
    pub fn request_preview(
        &mut self,
        identity: &str,
        size: PreviewSize,
    ) -> Result<Receiver<Arc<Preview>>, EngineError> {
        let package = self.find_theme(identity)?.clone();
        let (tx, rx) = bounded(1);
        self.enqueue(package, size, Some(tx));
        Ok(rx)
    }

    /// Generate (or fetch) one preview on the calling thread. A key that
    /// already failed in this context is not run again.
    pub fn generate_blocking(
        &mut self,
        identity: &str,
        size: PreviewSize,
    ) -> Result<Arc<Preview>, EngineError> {
        let package = self.find_theme(identity)?.clone();
        let key = TaskKey::new(identity, size);

        if let Some(result) = self.known_result(&key) {
            return result;
        }

        if self
            .in_flight
            .get(&key)
            .is_some_and(|t| t.context == self.context)
        {
            let rx = self.request_preview(identity, size)?;
            return self.wait_for(&rx, identity);
        }

        // a stale run of the same key must finish before a new one starts
        while self.in_flight.contains_key(&key) {
            if !self.tick() {
                std::thread::sleep(IDLE_POLL);
            }
        }
        // the current context may have finished this key meanwhile
        if let Some(result) = self.known_result(&key) {
            return result;
        }

        let task = match self.queue.iter().position(|t| t.key == key) {
            Some(pos) => self.queue.remove(pos),
            None => None,
        }
        .unwrap_or_else(|| GenerationTask::new(package, size, self.context));

        match self.run_inline(task) {
            TaskOutcome::Completed(preview) => Ok(preview),
            TaskOutcome::Failed(e) => Err(e),
            TaskOutcome::Superseded => Err(EngineError::Dropped(identity.to_string())),
        }
    }

    // ---- the loop ----

    /// Do one bounded slice of work. Returns true if anything happened.
    ///
    /// Inline execution does either one placeholder batch or one
    /// generation per call; threaded execution never blocks here.
    pub fn tick(&mut self) -> bool {
        let mut worked = self.drain_completions();

        match self.config.execution {
            Execution::Inline => {
                worked |= self.surface_placeholders() || self.dispatch();
            }
            Execution::Threaded => {
                worked |= self.surface_placeholders();
                worked |= self.dispatch();
            }
        }

        self.emit_progress();
        worked
    }

    /// Tick until idle. Returns false if `timeout` ran out first.
    pub fn run_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let worked = self.tick();
            if self.is_idle() {
                return true;
            }
            if Instant::now() >= deadline {
                warn!(
                    "Still busy after {:?}: {} queued, {} generating",
                    timeout,
                    self.queue.len(),
                    self.in_flight.len()
                );
                return false;
            }
            if !worked {
                std::thread::sleep(IDLE_POLL);
            }
        }
    }

    // ---- internals ----

    fn find_theme(&self, identity: &str) -> Result<&ThemePackage, EngineError> {
        let active = self.active.as_ref().ok_or(EngineError::NoActiveDirectory)?;
        active
            .themes
            .iter()
            .find(|t| t.identity == identity)
            .ok_or_else(|| EngineError::UnknownTheme(identity.to_string()))
    }

    fn known_result(&self, key: &TaskKey) -> Option<Result<Arc<Preview>, EngineError>> {
        if let Some(preview) = self.previews.get(key) {
            return Some(Ok(preview.clone()));
        }
        self.failed
            .contains(key)
            .then(|| Err(EngineError::Failed(key.identity.clone())))
    }

    fn wait_for(
        &mut self,
        rx: &Receiver<Arc<Preview>>,
        identity: &str,
    ) -> Result<Arc<Preview>, EngineError> {
        loop {
            match rx.try_recv() {
                Ok(preview) => return Ok(preview),
                Err(TryRecvError::Disconnected) => {
                    return Err(EngineError::Dropped(identity.to_string()));
                }
                Err(TryRecvError::Empty) => {
                    if !self.tick() {
                        std::thread::sleep(IDLE_POLL);
                    }
                }
            }
        }
    }

    fn load_directory(&mut self, path: PathBuf, force: bool) -> bool {
        if !force
            && let Some((last, at)) = &self.last_load
            && *last == path
            && at.elapsed() < self.config.load_cooldown
        {
            debug!("Ignoring repeated load of {}", path.display());
            return false;
        }

        self.begin_context();
        let themes = self.scan(&path);
        info!(
            "Loading {}: {} complete themes (context {})",
            path.display(),
            themes.len(),
            self.context.0
        );

        self.active = Some(ActiveDirectory {
            path: path.clone(),
            themes,
            placeholders: 0,
            settled: HashSet::new(),
        });
        self.last_load = Some((path, Instant::now()));
        self.emit_progress();
        true
    }

    /// Open a new context. Queued work of the old one is dropped here;
    /// running work is dropped when it completes.
    fn begin_context(&mut self) {
        self.context = self.context.next();
        self.current_context.store(self.context.0, Ordering::SeqCst);
        self.last_progress = None;
        self.failed.clear();

        for mut task in self.queue.drain(..) {
            task.state = TaskState::Superseded;
            task.abandon();
            EngineStats::bump(&self.stats.superseded);
        }
    }

    /// Validated packages of a root, memoized until the root is refreshed,
    /// added again or removed.
    fn scan(&mut self, root: &Path) -> Vec<ThemePackage> {
        if let Some(themes) = self.scan_memo.get(root) {
            return themes.clone();
        }

        let found = scan_root(root, self.config.kind);
        EngineStats::bump(&self.stats.scans);
        self.stats
            .validations
            .fetch_add(found.len() as u64, Ordering::Relaxed);

        let complete = filter_complete(found);
        self.scan_memo.insert(root.to_path_buf(), complete.clone());
        complete
    }

    fn surface_placeholders(&mut self) -> bool {
        let size = self.config.target_size;
        let batch_size = self.config.batch_size.max(1);
        let Some(active) = self.active.as_mut() else {
            return false;
        };

        let start = active.placeholders;
        if start >= active.themes.len() {
            return false;
        }
        let end = (start + batch_size).min(active.themes.len());
        let batch = active.themes[start..end].to_vec();
        active.placeholders = end;

        debug!("Placeholders {}..{} of {}", start, end, active.themes.len());
        for package in batch {
            let _ = self.events_tx.send(EngineEvent::PlaceholderCreated {
                identity: package.identity.clone(),
            });
            self.enqueue(package, size, None);
        }
        true
    }

    fn enqueue(&mut self, package: ThemePackage, size: PreviewSize, sink: Option<Sender<Arc<Preview>>>) {
        let key = TaskKey::new(package.identity.clone(), size);

        if let Some(preview) = self.previews.get(&key).cloned() {
            if let Some(sink) = sink {
                let _ = sink.send(preview.clone());
            }
            self.settle(&key, Some(&preview));
            return;
        }

        if self.failed.contains(&key) {
            // dropping the sink disconnects the caller
            debug!("Not retrying {} before a refresh", key.identity);
            self.settle(&key, None);
            return;
        }

        let context = self.context;
        if let Some(task) = self
            .in_flight
            .get_mut(&key)
            .filter(|t| t.context == context)
        {
            if let Some(sink) = sink {
                task.attach(sink);
            }
            return;
        }

        if let Some(task) = self.queue.iter_mut().find(|t| t.key == key) {
            if let Some(sink) = sink {
                task.attach(sink);
            }
            return;
        }

        let mut task = GenerationTask::new(package, size, context);
        if let Some(sink) = sink {
            task.attach(sink);
        }
        self.queue.push_back(task);
    }

    /// First queued task whose key is not already generating.
    fn next_ready(&mut self) -> Option<GenerationTask> {
        let pos = self
            .queue
            .iter()
            .position(|t| !self.in_flight.contains_key(&t.key))?;
        self.queue.remove(pos)
    }

    fn dispatch(&mut self) -> bool {
        match self.config.execution {
            Execution::Inline => match self.next_ready() {
                Some(task) => {
                    self.run_inline(task);
                    true
                }
                None => false,
            },
            Execution::Threaded => {
                let limit = self.config.concurrency_limit();
                let mut started = false;
                while self.in_flight.len() < limit {
                    let Some(mut task) = self.next_ready() else {
                        break;
                    };
                    started = true;
                    task.state = TaskState::Generating;
                    EngineStats::bump(&self.stats.generation_runs);

                    let job = Job {
                        key: task.key.clone(),
                        package: task.package.clone(),
                        context: task.context,
                    };
                    let submitted = self.pool.as_ref().is_some_and(|p| p.submit(job));
                    if submitted {
                        self.in_flight.insert(task.key.clone(), task);
                    } else {
                        let identity = task.key.identity.clone();
                        self.finish(task, Some(Err(EngineError::Dropped(identity))));
                    }
                }
                started
            }
        }
    }

    fn run_inline(&mut self, mut task: GenerationTask) -> TaskOutcome {
        task.state = TaskState::Generating;
        EngineStats::bump(&self.stats.generation_runs);
        let job = Job {
            key: task.key.clone(),
            package: task.package.clone(),
            context: task.context,
        };
        let result = run_guarded(&self.pipeline, &job);
        self.finish(task, Some(result))
    }

    fn drain_completions(&mut self) -> bool {
        let mut drained = false;
        while let Some(done) = self.pool.as_ref().and_then(WorkerPool::try_completion) {
            drained = true;
            let Some(task) = self.in_flight.remove(&done.key) else {
                continue;
            };
            self.finish(task, done.result);
        }
        drained
    }

    fn finish(
        &mut self,
        mut task: GenerationTask,
        result: Option<Result<Arc<Preview>, EngineError>>,
    ) -> TaskOutcome {
        let outcome = match result {
            _ if task.context != self.context => TaskOutcome::Superseded,
            None => TaskOutcome::Superseded,
            Some(Ok(preview)) => TaskOutcome::Completed(preview),
            Some(Err(e)) => TaskOutcome::Failed(e),
        };
        task.state = outcome.state();

        match &outcome {
            TaskOutcome::Completed(preview) => {
                self.previews.insert(task.key.clone(), preview.clone());
                task.deliver(preview);
                self.settle(&task.key, Some(preview));
            }
            TaskOutcome::Failed(e) => {
                EngineStats::bump(&self.stats.failures);
                warn!("Preview for {} failed: {}", task.key.identity, e);
                self.failed.insert(task.key.clone());
                task.abandon();
                self.settle(&task.key, None);
            }
            TaskOutcome::Superseded => {
                EngineStats::bump(&self.stats.superseded);
                debug!(
                    "Dropping result for {} from context {}",
                    task.key.identity, task.context.0
                );
                task.abandon();
            }
        }
        outcome
    }

    /// Record a terminal result for the active directory and tell the UI,
    /// once per identity and only after its placeholder exists.
    fn settle(&mut self, key: &TaskKey, preview: Option<&Arc<Preview>>) {
        if key.size != self.config.target_size {
            return;
        }
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if !active.is_surfaced(&key.identity) || !active.settled.insert(key.identity.clone()) {
            return;
        }

        if let Some(preview) = preview {
            let _ = self.events_tx.send(EngineEvent::PreviewReady {
                identity: key.identity.clone(),
                preview: preview.clone(),
            });
        }
    }

    fn emit_progress(&mut self) {
        let Some(progress) = self.progress() else {
            return;
        };
        let current = (progress.percent(), progress.message());
        if self.last_progress.as_ref() == Some(&current) {
            return;
        }
        let _ = self.events_tx.send(EngineEvent::ProgressUpdated {
            message: current.1.clone(),
            percent: current.0,
        });
        self.last_progress = Some(current);
    }

    fn persist(&self) -> Result<(), EngineError> {
        if let Some(store) = &self.store {
            store.save(&self.settings)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::drain_events;
    use image::{Rgba, RgbaImage};
    use lens_preview::{PreviewError, ResampleQuality};
    use lens_themes::ResolvedAsset;
    use std::fs;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    const SIZE: PreviewSize = PreviewSize::square(64);

    /// Counts calls; can be held closed to keep a worker busy.
    struct Gate {
        calls: AtomicUsize,
        open: Mutex<bool>,
    }

    impl Gate {
        fn new(open: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                open: Mutex::new(open),
            })
        }

        fn release(&self) {
            *self.open.lock().unwrap() = true;
        }
    }

    impl AssetRasterizer for Gate {
        fn rasterize(
            &self,
            _asset: &ResolvedAsset,
            edge: u32,
            _quality: ResampleQuality,
        ) -> Result<RgbaImage, PreviewError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            while !*self.open.lock().unwrap() {
                std::thread::sleep(Duration::from_millis(1));
            }
            Ok(RgbaImage::from_fn(edge, edge, |x, y| {
                Rgba([(x * 9) as u8, (y * 5) as u8, 77, 255])
            }))
        }
    }

    fn write_theme(root: &Path, name: &str, with_devices: bool) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("index.theme"), format!("[Icon Theme]\nName={name}\n")).unwrap();
        let mut files = vec!["places/folder.svg", "mimetypes/text-x-generic.svg"];
        if with_devices {
            files.push("devices/drive-harddisk.svg");
        }
        for file in files {
            let path = dir.join("scalable").join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "<svg/>").unwrap();
        }
    }

    fn setup(themes: &[&str]) -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("themes");
        for name in themes {
            write_theme(&root, name, true);
        }
        (tmp, root)
    }

    fn engine(tmp: &TempDir, jobs: usize, gate: Arc<Gate>) -> ResolutionEngine {
        let mut config = EngineConfig::default()
            .with_cache_dir(tmp.path().join("cache"))
            .with_target_size(SIZE)
            .with_concurrency(jobs)
            .with_batch_size(2);
        config.min_cache_bytes = 1;
        ResolutionEngine::with_rasterizer(config, gate)
    }

    #[test]
    fn test_placeholders_come_in_batches() {
        let (tmp, root) = setup(&["A", "B", "C"]);
        let mut engine = engine(&tmp, 1, Gate::new(true));
        let events = engine.events();

        assert!(engine.set_active_directory(&root));
        assert_eq!(engine.themes().len(), 3);

        // first tick: one batch of two placeholders, nothing generated yet
        engine.tick();
        let placeholders = drain_events(&events)
            .into_iter()
            .filter(|e| matches!(e, EngineEvent::PlaceholderCreated { .. }))
            .count();
        assert_eq!(placeholders, 2);
        assert_eq!(engine.stats().generation_runs, 0);

        assert!(engine.run_until_idle(Duration::from_secs(10)));
        let ready: Vec<String> = drain_events(&events)
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::PreviewReady { identity, .. } => Some(identity),
                _ => None,
            })
            .collect();
        assert_eq!(ready, vec!["A", "B", "C"]);
        assert_eq!(engine.progress().unwrap().percent(), 100);
    }

    #[test]
    fn test_incomplete_theme_gets_no_placeholder() {
        let (tmp, root) = setup(&["Good"]);
        write_theme(&root, "NoDevices", false);
        let mut engine = engine(&tmp, 1, Gate::new(true));

        engine.set_active_directory(&root);
        let names: Vec<_> = engine.themes().iter().map(|t| t.identity.as_str()).collect();
        assert_eq!(names, vec!["Good"]);
    }

    #[test]
    fn test_same_directory_within_cooldown_is_ignored() {
        let (tmp, root) = setup(&["A"]);
        let mut engine = engine(&tmp, 1, Gate::new(true));

        assert!(engine.set_active_directory(&root));
        let ctx = engine.context();
        assert!(!engine.set_active_directory(&root));
        assert_eq!(engine.context(), ctx);
        assert_eq!(engine.stats().scans, 1);
    }

    #[test]
    fn test_scan_is_memoized_per_root() {
        let (tmp, root) = setup(&["A"]);
        let other = tmp.path().join("other");
        write_theme(&other, "X", true);
        let mut engine = engine(&tmp, 1, Gate::new(true));

        engine.set_active_directory(&root);
        engine.set_active_directory(&other);
        engine.set_active_directory(&root);
        assert_eq!(engine.stats().scans, 2);

        engine.refresh().unwrap();
        assert_eq!(engine.stats().scans, 3);
    }

    #[test]
    fn test_concurrent_requests_coalesce() {
        let (tmp, root) = setup(&["A"]);
        let mut engine = engine(&tmp, 1, Gate::new(true));
        engine.set_active_directory(&root);

        let first = engine.request_preview("A", SIZE).unwrap();
        let second = engine.request_preview("A", SIZE).unwrap();
        assert_eq!(engine.task_state("A", SIZE), Some(TaskState::Queued));

        assert!(engine.run_until_idle(Duration::from_secs(10)));
        let a = first.try_recv().unwrap();
        let b = second.try_recv().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(engine.stats().generation_runs, 1);
        assert_eq!(engine.stats().resolutions, 1);
    }

    #[test]
    fn test_request_joins_running_task() {
        let (tmp, root) = setup(&["A"]);
        let gate = Gate::new(false);
        let mut engine = engine(&tmp, 2, gate.clone());
        engine.set_active_directory(&root);

        let first = engine.request_preview("A", SIZE).unwrap();
        engine.tick();
        assert_eq!(engine.task_state("A", SIZE), Some(TaskState::Generating));

        let second = engine.request_preview("A", SIZE).unwrap();
        gate.release();
        assert!(engine.run_until_idle(Duration::from_secs(10)));

        assert!(Arc::ptr_eq(&first.try_recv().unwrap(), &second.try_recv().unwrap()));
        assert_eq!(engine.stats().generation_runs, 1);
    }

    #[test]
    fn test_switching_directory_supersedes_running_work() {
        let (tmp, root) = setup(&["A"]);
        let other = tmp.path().join("other");
        write_theme(&other, "X", true);
        let gate = Gate::new(false);
        let mut engine = engine(&tmp, 2, gate.clone());
        let events = engine.events();

        engine.set_active_directory(&root);
        let waiter = engine.request_preview("A", SIZE).unwrap();
        engine.tick();
        assert_eq!(engine.task_state("A", SIZE), Some(TaskState::Generating));

        engine.set_active_directory(&other);
        gate.release();
        assert!(engine.run_until_idle(Duration::from_secs(10)));

        let ready: Vec<String> = drain_events(&events)
            .into_iter()
            .filter_map(|e| match e {
                EngineEvent::PreviewReady { identity, .. } => Some(identity),
                _ => None,
            })
            .collect();
        assert_eq!(ready, vec!["X"]);
        assert!(waiter.try_recv().unwrap_err().is_disconnected());
        assert!(engine.preview("A", SIZE).is_none());
        assert!(engine.stats().superseded >= 1);
    }

    #[test]
    fn test_size_change_starts_new_context() {
        let (tmp, root) = setup(&["A"]);
        let mut engine = engine(&tmp, 1, Gate::new(true));
        engine.set_active_directory(&root);
        assert!(engine.run_until_idle(Duration::from_secs(10)));
        let ctx = engine.context();

        let bigger = PreviewSize::square(96);
        engine.handle(EngineCommand::SetTargetSize(bigger)).unwrap();
        assert_ne!(engine.context(), ctx);
        assert!(engine.run_until_idle(Duration::from_secs(10)));
        assert_eq!(engine.preview("A", bigger).unwrap().image.dimensions(), (96, 96));
    }

    #[test]
    fn test_generate_blocking_uses_memory_then_disk() {
        let (tmp, root) = setup(&["A"]);
        let mut engine = engine(&tmp, 1, Gate::new(true));
        engine.set_active_directory(&root);

        let first = engine.generate_blocking("A", SIZE).unwrap();
        let again = engine.generate_blocking("A", SIZE).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(engine.stats().resolutions, 1);

        // a fresh engine on the same cache dir only reads the file
        let mut fresh = self::engine(&tmp, 1, Gate::new(true));
        fresh.set_active_directory(&root);
        let cached = fresh.generate_blocking("A", SIZE).unwrap();
        assert!(cached.from_cache);
        assert_eq!(fresh.stats().resolutions, 0);
        assert_eq!(fresh.stats().cache_hits, 1);
    }

    #[test]
    fn test_unknown_theme_is_rejected() {
        let (tmp, root) = setup(&["A"]);
        let mut engine = engine(&tmp, 1, Gate::new(true));
        assert!(matches!(
            engine.request_preview("A", SIZE),
            Err(EngineError::NoActiveDirectory)
        ));
        engine.set_active_directory(&root);
        assert!(matches!(
            engine.request_preview("Nope", SIZE),
            Err(EngineError::UnknownTheme(_))
        ));
    }

    #[test]
    fn test_vanished_theme_fails_without_preview() {
        let (tmp, root) = setup(&["A", "B"]);
        let mut engine = engine(&tmp, 1, Gate::new(true));
        let events = engine.events();
        engine.set_active_directory(&root);
        fs::remove_dir_all(root.join("A")).unwrap();

        assert!(engine.run_until_idle(Duration::from_secs(10)));
        let ready = drain_events(&events)
            .into_iter()
            .filter(|e| matches!(e, EngineEvent::PreviewReady { .. }))
            .count();
        assert_eq!(ready, 1);
        assert_eq!(engine.stats().failures, 1);
        // the failed theme still counts toward completion
        assert_eq!(engine.progress().unwrap().percent(), 100);
    }

    #[test]
    fn test_failed_theme_is_not_retried_until_refresh() {
        let (tmp, root) = setup(&["A", "B"]);
        let mut engine = engine(&tmp, 1, Gate::new(true));
        engine.set_active_directory(&root);
        fs::remove_dir_all(root.join("A")).unwrap();

        // fails before its placeholder exists
        assert!(matches!(
            engine.generate_blocking("A", SIZE),
            Err(EngineError::PackageGone(_))
        ));
        assert!(engine.run_until_idle(Duration::from_secs(10)));
        assert_eq!(engine.stats().generation_runs, 2);
        assert_eq!(engine.stats().failures, 1);
        assert_eq!(engine.task_state("A", SIZE), Some(TaskState::Failed));
        assert_eq!(engine.progress().unwrap().percent(), 100);

        let waiter = engine.request_preview("A", SIZE).unwrap();
        assert!(waiter.try_recv().unwrap_err().is_disconnected());
        assert!(matches!(
            engine.generate_blocking("A", SIZE),
            Err(EngineError::Failed(_))
        ));
        assert_eq!(engine.stats().generation_runs, 2);

        write_theme(&root, "A", true);
        engine.refresh().unwrap();
        assert!(engine.run_until_idle(Duration::from_secs(10)));
        assert!(engine.preview("A", SIZE).is_some());
    }

    #[test]
    fn test_blocking_request_reuses_result_finished_while_waiting() {
        let (tmp, root) = setup(&["A"]);
        let other = tmp.path().join("other");
        write_theme(&other, "X", true);
        let gate = Gate::new(false);
        let mut engine = engine(&tmp, 2, gate.clone());

        engine.set_active_directory(&root);
        engine.tick();
        assert_eq!(engine.task_state("A", SIZE), Some(TaskState::Generating));

        // back on the same root, the old run is stale but still going
        engine.set_active_directory(&other);
        engine.set_active_directory(&root);
        gate.release();

        let preview = engine.generate_blocking("A", SIZE).unwrap();
        assert!(Arc::ptr_eq(&preview, &engine.preview("A", SIZE).unwrap()));
        assert_eq!(engine.stats().generation_runs, 2);
    }

    #[test]
    fn test_refresh_serves_every_theme_from_disk() {
        let (tmp, root) = setup(&["A", "B"]);
        let mut engine = engine(&tmp, 1, Gate::new(true));
        let events = engine.events();
        engine.set_active_directory(&root);
        assert!(engine.run_until_idle(Duration::from_secs(10)));
        drain_events(&events);
        assert_eq!(engine.stats().resolutions, 2);

        engine.handle(EngineCommand::RequestRefresh).unwrap();
        assert!(engine.run_until_idle(Duration::from_secs(10)));

        let events = drain_events(&events);
        let placeholders = events
            .iter()
            .filter(|e| matches!(e, EngineEvent::PlaceholderCreated { .. }))
            .count();
        assert_eq!(placeholders, 2);
        let ready: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                EngineEvent::PreviewReady { identity, preview } => {
                    Some((identity.as_str(), preview.from_cache))
                }
                _ => None,
            })
            .collect();
        assert_eq!(ready, vec![("A", true), ("B", true)]);

        let stats = engine.stats();
        assert_eq!(stats.resolutions, 2);
        assert_eq!(stats.cache_hits, 2);
        assert_eq!(stats.scans, 2);
    }

    #[test]
    fn test_out_of_range_size_is_rejected() {
        let (tmp, root) = setup(&["A"]);
        let mut engine = engine(&tmp, 1, Gate::new(true));
        engine.set_active_directory(&root);
        let ctx = engine.context();

        let huge = PreviewSize::square(PreviewSize::MAX_EDGE + 1);
        assert!(matches!(
            engine.handle(EngineCommand::SetTargetSize(huge)),
            Err(EngineError::InvalidSize(_))
        ));
        assert_eq!(engine.target_size(), SIZE);
        assert_eq!(engine.context(), ctx);
    }

    #[test]
    fn test_root_commands() {
        let (tmp, root) = setup(&["A"]);
        let store = SettingsStore::new(tmp.path().join("settings.json"));
        let mut engine =
            engine(&tmp, 1, Gate::new(true)).with_settings(Settings::default(), Some(store.clone()));

        engine.handle(EngineCommand::AddRoot(root.clone())).unwrap();
        assert!(engine.roots().iter().any(|r| r.path == root));
        assert!(store.load().roots.iter().any(|r| r.path == root));

        let builtin = engine.roots()[0].path.clone();
        assert!(matches!(
            engine.handle(EngineCommand::RemoveRoot(builtin)),
            Err(EngineError::Settings(_))
        ));

        engine.set_active_directory(&root);
        engine.handle(EngineCommand::RemoveRoot(root.clone())).unwrap();
        assert!(engine.active_directory().is_none());
        assert!(!store.load().roots.iter().any(|r| r.path == root));
    }
}
