//! Task identities and per-task outcomes.
//!
//! A transform task either finishes cleanly, finishes with source errors that
//! were caught and reported ([`TaskOutcome::Recovered`]), or fails outright
//! with a [`TaskError`]. Only the last kind aborts a composed build.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// The four classes of assets the pipeline compiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssetClass {
    Html,
    Css,
    Js,
    Images,
}

impl AssetClass {
    /// Every class, in the order results are reported.
    pub const ALL: [AssetClass; 4] =
        [AssetClass::Html, AssetClass::Css, AssetClass::Js, AssetClass::Images];

    /// Config and CLI name of the class.
    pub fn name(self) -> &'static str {
        match self {
            AssetClass::Html => "html",
            AssetClass::Css => "css",
            AssetClass::Js => "js",
            AssetClass::Images => "images",
        }
    }

    /// Browser notification sent after a successful rebuild of this class.
    ///
    /// Images are re-served on request but never pushed.
    pub fn reload_kind(self) -> Option<ReloadKind> {
        match self {
            AssetClass::Html | AssetClass::Js => Some(ReloadKind::Page),
            AssetClass::Css => Some(ReloadKind::Styles),
            AssetClass::Images => None,
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every task selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TaskName {
    Html,
    Css,
    Js,
    Images,
    Clean,
    Build,
    Watch,
}

/// What connected browsers should do after a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadKind {
    /// Reload the whole page
    Page,
    /// Re-fetch stylesheets without reloading
    Styles,
}

impl ReloadKind {
    /// Event name used on the live-reload stream.
    pub fn event_name(self) -> &'static str {
        match self {
            ReloadKind::Page => "reload",
            ReloadKind::Styles => "css",
        }
    }
}

/// An error in a source file that the task guard caught.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    /// File the error was reported against
    pub file: PathBuf,
    /// Error message from the compiler or template engine
    pub message: String,
}

impl SourceError {
    pub fn new(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self { file: file.into(), message: message.into() }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error in {}: {}", self.file.display(), self.message)
    }
}

/// Unguarded task failure. Aborts a one-shot build.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TaskError {
    /// Filesystem failure reading sources or writing outputs
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Image codec failure
    #[error("Failed to process image {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// Settings the external tools rejected
    #[error("Invalid configuration: {0}")]
    Config(String),
    /// Clean target that would remove the project itself or escape it
    #[error("Refusing to clean {}: not inside the project root", .0.display())]
    UnsafeClean(PathBuf),
    /// A task thread panicked
    #[error("Task '{0}' panicked")]
    Panicked(AssetClass),
}

impl TaskError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        TaskError::Io { path: path.to_path_buf(), source }
    }
}

/// Files a task read and wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub class: AssetClass,
    /// Number of source files matched
    pub inputs: usize,
    /// Files written
    pub outputs: Vec<PathBuf>,
    pub duration: Duration,
}

impl TaskReport {
    pub fn new(class: AssetClass, inputs: usize) -> Self {
        Self { class, inputs, outputs: Vec::new(), duration: Duration::ZERO }
    }
}

/// Result of a guarded transform task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Every matched source compiled
    Success(TaskReport),
    /// Some sources failed; their errors were caught and the rest was written
    Recovered { report: TaskReport, errors: Vec<SourceError> },
}

impl TaskOutcome {
    /// Build an outcome from a report and whatever source errors were collected.
    pub fn from_parts(report: TaskReport, errors: Vec<SourceError>) -> Self {
        if errors.is_empty() {
            TaskOutcome::Success(report)
        } else {
            TaskOutcome::Recovered { report, errors }
        }
    }

    pub fn report(&self) -> &TaskReport {
        match self {
            TaskOutcome::Success(report) | TaskOutcome::Recovered { report, .. } => report,
        }
    }

    pub fn errors(&self) -> &[SourceError] {
        match self {
            TaskOutcome::Success(_) => &[],
            TaskOutcome::Recovered { errors, .. } => errors,
        }
    }

    /// True when no source error was caught.
    pub fn is_clean(&self) -> bool {
        matches!(self, TaskOutcome::Success(_))
    }
}
