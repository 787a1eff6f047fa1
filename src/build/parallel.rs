//! Parallel build execution.
//!
//! A full build is a two-level plan:
//!
//! 1. `clean` runs alone and must finish; its failure aborts the build
//! 2. the four transform tasks run concurrently on scoped threads
//!
//! Transforms write to disjoint output subtrees, so nothing is shared between
//! the workers except the read-only [`BuildContext`]. The build succeeds only
//! if every transform does.
//!
//! # Example
//!
//! ```ignore
//! use sitepipe::build::{BuildContext, ParallelBuild};
//!
//! let context = BuildContext::new(config, project_root);
//! let result = ParallelBuild::new(&context).run()?;
//! println!("{}", result.summary());
//! ```

use std::time::Instant;
use tracing::{debug, info, warn};

use crate::build::{
    clean, AssetClass, BuildContext, BuildResult, TaskError, TaskOutcome, TaskResult,
};
use crate::transform;

/// Run one transform task.
pub fn run_transform(context: &BuildContext, class: AssetClass) -> Result<TaskOutcome, TaskError> {
    let start = Instant::now();
    debug!("Starting '{}'", class);

    let outcome = match class {
        AssetClass::Html => transform::html::run(context),
        AssetClass::Css => transform::css::run(context),
        AssetClass::Js => transform::js::run(context),
        AssetClass::Images => transform::images::run(context),
    };

    match &outcome {
        Ok(TaskOutcome::Success(report)) => info!(
            "Finished '{}': {} files written in {:?}",
            class,
            report.outputs.len(),
            start.elapsed()
        ),
        Ok(TaskOutcome::Recovered { errors, .. }) => {
            for error in errors {
                warn!("{}", error);
            }
            warn!("Finished '{}' with {} error(s) in {:?}", class, errors.len(), start.elapsed());
        }
        Err(e) => warn!("'{}' failed after {:?}: {}", class, start.elapsed(), e),
    }

    outcome
}

/// Run a task body on its own scoped thread so a panic inside it becomes
/// [`TaskError::Panicked`] instead of unwinding into the caller.
pub fn run_contained<F>(class: AssetClass, task: F) -> Result<TaskOutcome, TaskError>
where
    F: FnOnce() -> Result<TaskOutcome, TaskError> + Send,
{
    std::thread::scope(|s| {
        s.spawn(task).join().unwrap_or_else(|_| {
            warn!("'{}' panicked", class);
            Err(TaskError::Panicked(class))
        })
    })
}

/// Parallel build executor.
pub struct ParallelBuild<'a> {
    /// Build context
    context: &'a BuildContext,
}

impl<'a> ParallelBuild<'a> {
    /// Create a new parallel build.
    pub fn new(context: &'a BuildContext) -> Self {
        Self { context }
    }

    /// Clean, then run every transform concurrently.
    ///
    /// A clean failure is returned as an error before any transform starts.
    pub fn run(&self) -> Result<BuildResult, TaskError> {
        let start = Instant::now();

        clean(self.context)?;

        let mut result = self.run_transforms();
        result.total_duration = start.elapsed();
        Ok(result)
    }

    /// Run the transform tasks concurrently, one scoped thread each.
    ///
    /// Results are reported in [`AssetClass::ALL`] order regardless of which
    /// task finishes first.
    pub fn run_transforms(&self) -> BuildResult {
        let start = Instant::now();
        let context = self.context;

        let outcomes: Vec<(AssetClass, Result<TaskOutcome, TaskError>)> =
            std::thread::scope(|s| {
                let handles: Vec<_> = AssetClass::ALL
                    .into_iter()
                    .map(|class| (class, s.spawn(move || run_transform(context, class))))
                    .collect();

                handles
                    .into_iter()
                    .map(|(class, handle)| {
                        let outcome =
                            handle.join().unwrap_or_else(|_| Err(TaskError::Panicked(class)));
                        (class, outcome)
                    })
                    .collect()
            });

        let elapsed = start.elapsed();
        let mut result = BuildResult::new();
        for (class, outcome) in outcomes {
            result.add_result(TaskResult::from_outcome(class.name(), outcome, elapsed));
        }
        result.with_duration(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn create_test_context() -> (TempDir, BuildContext) {
        let temp = TempDir::new().unwrap();
        let ctx = BuildContext::new(SiteConfig::default(), temp.path().to_path_buf());
        (temp, ctx)
    }

    #[test]
    fn test_parallel_build_empty_project() {
        let (_temp, ctx) = create_test_context();
        let result = ParallelBuild::new(&ctx).run().unwrap();

        assert_eq!(result.tasks.len(), 4);
        assert!(result.is_success());
        assert!(result.all_outputs().is_empty());
    }

    #[test]
    fn test_parallel_build_reports_in_class_order() {
        let (_temp, ctx) = create_test_context();
        let result = ParallelBuild::new(&ctx).run_transforms();
        let names: Vec<_> = result.tasks.iter().map(|t| t.task.as_str()).collect();
        assert_eq!(names, vec!["html", "css", "js", "images"]);
    }

    #[test]
    fn test_parallel_build_removes_stale_outputs() {
        let (temp, ctx) = create_test_context();
        write(temp.path(), "dist/assets/js/removed.js", "old");
        write(temp.path(), "src/assets/js/app.js", "var answer = 42;\n");

        let result = ParallelBuild::new(&ctx).run().unwrap();
        assert!(result.is_success());
        assert!(!temp.path().join("dist/assets/js/removed.js").exists());
        assert!(temp.path().join("dist/assets/js/app.js").exists());
        assert!(temp.path().join("dist/assets/js/app.min.js").exists());
    }

    #[test]
    fn test_parallel_build_clean_failure_aborts() {
        let temp = TempDir::new().unwrap();
        let mut config = SiteConfig::default();
        config.paths.clean = ".".into();
        write(temp.path(), "src/assets/js/app.js", "var a = 1;\n");
        let ctx = BuildContext::new(config, temp.path().to_path_buf());

        let result = ParallelBuild::new(&ctx).run();
        assert!(matches!(result, Err(TaskError::UnsafeClean(_))));
        assert!(!temp.path().join("dist").exists());
    }

    #[test]
    fn test_run_contained_maps_panic() {
        let outcome = run_contained(AssetClass::Css, || panic!("compiler blew up"));
        assert!(matches!(outcome, Err(TaskError::Panicked(AssetClass::Css))));
    }

    #[test]
    fn test_run_contained_passes_outcome_through() {
        let (_temp, ctx) = create_test_context();
        let outcome = run_contained(AssetClass::Js, || run_transform(&ctx, AssetClass::Js));
        assert!(matches!(outcome, Ok(TaskOutcome::Success(_))));
    }

    #[test]
    fn test_parallel_build_source_error_is_recovered() {
        let (temp, ctx) = create_test_context();
        write(temp.path(), "src/assets/sass/main.sass", "body\n  color: $missing\n");
        write(temp.path(), "src/assets/js/app.js", "var ok = true;\n");

        let result = ParallelBuild::new(&ctx).run().unwrap();
        assert!(result.is_success());
        assert_eq!(result.recovered_count(), 1);
        assert!(temp.path().join("dist/assets/js/app.min.js").exists());
    }
}
