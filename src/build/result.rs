//! Build result types.
//!
//! Contains types for representing the outcome of build operations.

use std::path::PathBuf;
use std::time::Duration;

use crate::build::{SourceError, TaskError, TaskOutcome};

/// Status of a single task run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task succeeded
    Success,
    /// Task finished but caught source errors
    Recovered(Vec<SourceError>),
    /// Task failed with error
    Failed(String),
}

impl TaskStatus {
    /// Check if the status indicates the task completed.
    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Recovered(_))
    }

    /// Check if the status indicates failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskStatus::Failed(_))
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Success => write!(f, "success"),
            TaskStatus::Recovered(errors) => {
                write!(f, "{} error{}", errors.len(), if errors.len() == 1 { "" } else { "s" })
            }
            TaskStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

/// Result of running a single task.
#[derive(Debug, Clone)]
pub struct TaskResult {
    /// Task that ran
    pub task: String,
    /// Run status
    pub status: TaskStatus,
    /// Output files produced
    pub outputs: Vec<PathBuf>,
    /// Run duration
    pub duration: Duration,
}

impl TaskResult {
    /// Create a successful result.
    pub fn success(task: impl Into<String>, outputs: Vec<PathBuf>, duration: Duration) -> Self {
        Self { task: task.into(), status: TaskStatus::Success, outputs, duration }
    }

    /// Create a failed result.
    pub fn failed(task: impl Into<String>, error: String, duration: Duration) -> Self {
        Self { task: task.into(), status: TaskStatus::Failed(error), outputs: vec![], duration }
    }

    /// Convert a transform task's return value.
    pub fn from_outcome(
        task: impl Into<String>,
        outcome: Result<TaskOutcome, TaskError>,
        elapsed: Duration,
    ) -> Self {
        let task = task.into();
        match outcome {
            Ok(TaskOutcome::Success(report)) => {
                Self::success(task, report.outputs, report.duration)
            }
            Ok(TaskOutcome::Recovered { report, errors }) => Self {
                task,
                status: TaskStatus::Recovered(errors),
                outputs: report.outputs,
                duration: report.duration,
            },
            Err(e) => Self::failed(task, e.to_string(), elapsed),
        }
    }

    /// Check if this result is successful.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Source errors caught during the run.
    pub fn source_errors(&self) -> &[SourceError] {
        match &self.status {
            TaskStatus::Recovered(errors) => errors,
            _ => &[],
        }
    }
}

/// Result of a complete build run.
#[derive(Debug, Default)]
pub struct BuildResult {
    /// Results for each task, in the order tasks were listed
    pub tasks: Vec<TaskResult>,
    /// Total build duration
    pub total_duration: Duration,
}

impl BuildResult {
    /// Create a new empty build result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task result.
    pub fn add_result(&mut self, result: TaskResult) {
        self.tasks.push(result);
    }

    /// Set the total duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    /// Get the number of tasks that finished without caught errors.
    pub fn success_count(&self) -> usize {
        self.tasks.iter().filter(|r| matches!(r.status, TaskStatus::Success)).count()
    }

    /// Get the number of tasks that caught source errors.
    pub fn recovered_count(&self) -> usize {
        self.tasks.iter().filter(|r| matches!(r.status, TaskStatus::Recovered(_))).count()
    }

    /// Get the number of failed tasks.
    pub fn failed_count(&self) -> usize {
        self.tasks.iter().filter(|r| r.status.is_failure()).count()
    }

    /// Check if the overall build succeeded (no failures).
    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }

    /// Check success, counting caught source errors as failures when strict.
    pub fn is_success_with(&self, strict: bool) -> bool {
        self.is_success() && (!strict || self.recovered_count() == 0)
    }

    /// Get all outputs produced.
    pub fn all_outputs(&self) -> Vec<&PathBuf> {
        self.tasks.iter().flat_map(|r| r.outputs.iter()).collect()
    }

    /// Get all caught source errors.
    pub fn all_source_errors(&self) -> Vec<&SourceError> {
        self.tasks.iter().flat_map(|r| r.source_errors().iter()).collect()
    }

    /// Get failed task results.
    pub fn failures(&self) -> Vec<&TaskResult> {
        self.tasks.iter().filter(|r| r.status.is_failure()).collect()
    }

    /// Format a summary of the build result.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        let success = self.success_count();
        let recovered = self.recovered_count();
        let failed = self.failed_count();
        let total = self.tasks.len();

        if failed > 0 {
            lines.push(format!(
                "Build failed: {} succeeded, {} with errors, {} failed ({} total)",
                success, recovered, failed, total
            ));
            for task in self.failures() {
                lines.push(format!("  - {}: {}", task.task, task.status));
            }
        } else {
            lines.push(format!(
                "Build succeeded: {} tasks, {} files written in {:?}",
                total,
                self.all_outputs().len(),
                self.total_duration
            ));
        }

        let errors = self.all_source_errors();
        if !errors.is_empty() {
            lines.push(format!("Source errors ({}):", errors.len()));
            for error in errors.iter().take(5) {
                lines.push(format!("  - {}", error));
            }
            if errors.len() > 5 {
                lines.push(format!("  ... and {} more", errors.len() - 5));
            }
        }

        lines.join("\n")
    }
}
