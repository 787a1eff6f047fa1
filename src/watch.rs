//! Watch mode for automatic rebuilds on file changes
//!
//! Debounced filesystem events arrive on a channel and are handled by one
//! synchronous [`Dispatcher`]: each changed path is classified against every
//! asset class's watch pattern, each matched class's task is re-run once in
//! fixed class order, and connected browsers are told to reload.

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEventKind};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::build::discovery::{expand_braces, glob_base, normalize};
use crate::build::{
    run_contained, run_transform, AssetClass, BuildContext, ParallelBuild, PatternSet, ReloadKind,
    SourceError, TaskError, TaskOutcome, TaskResult,
};

type TaskRunner = fn(&BuildContext, AssetClass) -> Result<TaskOutcome, TaskError>;

/// Error during watch mode
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WatchError {
    /// Failed to initialize file watcher
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(#[source] notify::Error),
    /// Failed to add watch path
    #[error("Failed to watch {}: {source}", .path.display())]
    WatchPath {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    /// Channel receive error
    #[error("Watch channel error: {0}")]
    Channel(String),
    /// None of the watch patterns point at an existing directory
    #[error("Nothing to watch: no source directory exists under {}", .0.display())]
    SourceNotFound(PathBuf),
}

/// Receiver of live-reload notifications.
pub trait ReloadSink: Send + Sync {
    fn notify(&self, kind: ReloadKind);
}

/// Watch patterns for every asset class, compiled once.
#[derive(Debug, Clone)]
pub struct WatchTargets {
    sets: Vec<(AssetClass, PatternSet)>,
}

impl WatchTargets {
    pub fn new(context: &BuildContext) -> Self {
        let sets = AssetClass::ALL
            .into_iter()
            .map(|class| {
                (class, PatternSet::new(context.project_root(), &context.paths(class).watch))
            })
            .collect();
        Self { sets }
    }

    /// Classes whose watch pattern matches at least one changed path, in
    /// [`AssetClass::ALL`] order and without duplicates.
    pub fn classify(&self, changed: &[PathBuf]) -> Vec<AssetClass> {
        self.sets
            .iter()
            .filter(|(_, set)| changed.iter().any(|path| set.matches(path)))
            .map(|(class, _)| *class)
            .collect()
    }
}

/// Directories to register with the watcher: the glob base of every watch
/// pattern that exists, with nested duplicates removed.
pub fn watch_roots(context: &BuildContext) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = AssetClass::ALL
        .into_iter()
        .flat_map(|class| expand_braces(&context.paths(class).watch))
        .map(|pattern| normalize(&context.resolve_path(&glob_base(&pattern))))
        .filter(|dir| dir.is_dir())
        .collect();
    candidates.sort();
    candidates.dedup();

    let mut roots: Vec<PathBuf> = Vec::new();
    for dir in candidates {
        if !roots.iter().any(|root| dir.starts_with(root)) {
            roots.push(dir);
        }
    }
    roots
}

/// Tracks files with errors across rebuilds for recovery detection
#[derive(Debug, Default)]
pub struct ErrorTracker {
    /// Files that had errors in the most recent run of each class
    files_with_errors: HashMap<AssetClass, HashSet<PathBuf>>,
}

impl ErrorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the errors of a class's latest run, returning the files that
    /// had errors before and no longer do.
    pub fn update(&mut self, class: AssetClass, errors: &[SourceError]) -> Vec<PathBuf> {
        let current: HashSet<PathBuf> = errors.iter().map(|e| e.file.clone()).collect();
        let previous = self.files_with_errors.insert(class, current.clone()).unwrap_or_default();

        let mut fixed: Vec<PathBuf> = previous.difference(&current).cloned().collect();
        fixed.sort();
        fixed
    }

    pub fn has_errors(&self) -> bool {
        self.files_with_errors.values().any(|files| !files.is_empty())
    }

    /// Number of files with errors across all classes
    pub fn error_count(&self) -> usize {
        self.files_with_errors.values().map(HashSet::len).sum()
    }
}

/// Re-runs the tasks a batch of file changes affects.
pub struct Dispatcher<'a> {
    context: &'a BuildContext,
    targets: WatchTargets,
    sink: &'a dyn ReloadSink,
    tracker: ErrorTracker,
    runner: TaskRunner,
}

impl<'a> Dispatcher<'a> {
    pub fn new(context: &'a BuildContext, sink: &'a dyn ReloadSink) -> Self {
        Self {
            context,
            targets: WatchTargets::new(context),
            sink,
            tracker: ErrorTracker::new(),
            runner: run_transform,
        }
    }

    #[cfg(test)]
    fn with_runner(mut self, runner: TaskRunner) -> Self {
        self.runner = runner;
        self
    }

    /// Handle one batch of changed paths.
    ///
    /// Returns one result per task that ran. Unrelated paths run nothing.
    pub fn dispatch(&mut self, changed: &[PathBuf]) -> Vec<TaskResult> {
        let classes = self.targets.classify(changed);
        if classes.is_empty() {
            debug!("Ignoring {} unrelated change(s)", changed.len());
            return Vec::new();
        }

        classes.into_iter().map(|class| self.rerun(class)).collect()
    }

    /// Re-run one class's task. A panic in the task is reported as a failed
    /// result and the dispatcher stays usable.
    fn rerun(&mut self, class: AssetClass) -> TaskResult {
        let start = Instant::now();
        let (context, runner) = (self.context, self.runner);
        let outcome = run_contained(class, move || runner(context, class));

        if let Ok(outcome) = &outcome {
            for fixed in self.tracker.update(class, outcome.errors()) {
                info!("Fixed: {}", fixed.display());
            }
            if outcome.is_clean() {
                if let Some(kind) = class.reload_kind() {
                    debug!("Notifying browsers: {}", kind.event_name());
                    self.sink.notify(kind);
                }
            }
        }

        TaskResult::from_outcome(class.name(), outcome, start.elapsed())
    }

    /// Handle one message from the debouncer channel.
    pub fn handle_events(&mut self, events: DebounceEventResult) -> Vec<TaskResult> {
        match events {
            Ok(events) => {
                let changed: Vec<PathBuf> = events
                    .into_iter()
                    .filter(|e| matches!(e.kind, DebouncedEventKind::Any))
                    .map(|e| e.path)
                    .collect();
                for path in &changed {
                    debug!("Changed: {}", path.display());
                }
                self.dispatch(&changed)
            }
            Err(error) => {
                warn!("Watch error: {:?}. Continuing to watch", error);
                Vec::new()
            }
        }
    }

    pub fn tracker(&self) -> &ErrorTracker {
        &self.tracker
    }
}

/// Run the startup build, then rebuild on changes until the process exits.
///
/// A failing startup build is reported and watching continues. Only watcher
/// setup and channel failures return an error.
pub fn watch(context: &BuildContext, sink: &dyn ReloadSink) -> Result<(), WatchError> {
    let roots = watch_roots(context);
    if roots.is_empty() {
        return Err(WatchError::SourceNotFound(context.project_root().to_path_buf()));
    }

    let (tx, rx) = channel();
    let debounce = Duration::from_millis(u64::from(context.config().watch.debounce_ms));
    let mut debouncer = new_debouncer(debounce, tx).map_err(WatchError::WatcherInit)?;
    for root in &roots {
        debouncer
            .watcher()
            .watch(root, RecursiveMode::Recursive)
            .map_err(|source| WatchError::WatchPath { path: root.clone(), source })?;
    }

    initial_build(context, sink);

    let mut dispatcher = Dispatcher::new(context, sink);
    info!("Watching {} for changes...", describe_roots(&roots, context.project_root()));

    loop {
        let events = rx.recv().map_err(|e| WatchError::Channel(e.to_string()))?;
        let results = dispatcher.handle_events(events);
        if !results.is_empty() {
            let failed = results.iter().filter(|r| !r.is_success()).count();
            info!("Rebuilt {} task(s), {} failed", results.len(), failed);
        }
        if dispatcher.tracker().has_errors() {
            warn!("{} file(s) still have errors", dispatcher.tracker().error_count());
        }
    }
}

fn initial_build(context: &BuildContext, sink: &dyn ReloadSink) {
    match ParallelBuild::new(context).run() {
        Ok(result) => {
            if result.is_success() {
                info!("{}", result.summary());
            } else {
                warn!("{}", result.summary());
            }
            sink.notify(ReloadKind::Page);
        }
        Err(e) => warn!("Build failed: {}. Watching for changes anyway", e),
    }
}

fn describe_roots(roots: &[PathBuf], project_root: &Path) -> String {
    roots
        .iter()
        .map(|root| root.strip_prefix(project_root).unwrap_or(root).display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
