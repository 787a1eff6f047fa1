//! Task command implementations (leaf tasks, clean, build, watch)

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use super::{Cli, EXIT_ERROR, EXIT_SUCCESS};
use crate::build::{
    clean, run_transform, AssetClass, BuildContext, BuildResult, ParallelBuild, TaskName,
    TaskResult,
};
use crate::config::loader::{
    find_config, load_config, merge_cli_overrides, project_root, CliOverrides,
};
use crate::config::{default_config, SiteConfig};
use crate::server::{self, LiveReload};
use crate::watch;

/// Load configuration and resolve the project root.
///
/// The root is the directory holding the config file, or the current
/// directory when none is found.
pub(super) fn load_context(cli: &Cli) -> Result<BuildContext, String> {
    let config_path = cli.config.clone().or_else(find_config);

    let (mut config, root) = match &config_path {
        Some(path) => {
            if cli.verbose {
                println!("Using config: {}", path.display());
            }
            let config = load_config(Some(path.as_path()))
                .map_err(|e| format!("Error loading {}: {}", path.display(), e))?;
            (config, config_root(path))
        }
        None => {
            if cli.verbose {
                println!("No sitepipe.toml found, using defaults");
            }
            (default_config(), current_dir())
        }
    };

    merge_cli_overrides(&mut config, &CliOverrides { port: cli.port });
    Ok(context_for(config, &root).with_strict(cli.strict).with_verbose(cli.verbose))
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_default()
}

fn config_root(config_path: &Path) -> PathBuf {
    match project_root(config_path) {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => current_dir(),
    }
}

/// Canonical roots keep watcher event paths and glob patterns comparable.
fn context_for(config: SiteConfig, root: &Path) -> BuildContext {
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    BuildContext::new(config, root)
}

/// Run one task from the task graph.
pub(super) fn run_task(task: TaskName, context: &BuildContext) -> ExitCode {
    ExitCode::from(task_exit_code(task, context))
}

fn task_exit_code(task: TaskName, context: &BuildContext) -> u8 {
    match task {
        TaskName::Clean => run_clean(context),
        TaskName::Build => run_build(context),
        TaskName::Watch => run_watch(context),
        TaskName::Html => run_leaf(context, AssetClass::Html),
        TaskName::Css => run_leaf(context, AssetClass::Css),
        TaskName::Js => run_leaf(context, AssetClass::Js),
        TaskName::Images => run_leaf(context, AssetClass::Images),
    }
}

fn report(result: &BuildResult, context: &BuildContext) -> u8 {
    if context.is_verbose() {
        for output in result.all_outputs() {
            println!("  {}", output.display());
        }
    }
    if result.is_success_with(context.is_strict()) {
        println!("{}", result.summary());
        EXIT_SUCCESS
    } else {
        eprintln!("{}", result.summary());
        EXIT_ERROR
    }
}

fn run_leaf(context: &BuildContext, class: AssetClass) -> u8 {
    let start = Instant::now();
    let outcome = run_transform(context, class);
    let elapsed = start.elapsed();

    let mut result = BuildResult::new();
    result.add_result(TaskResult::from_outcome(class.name(), outcome, elapsed));
    report(&result.with_duration(elapsed), context)
}

fn run_clean(context: &BuildContext) -> u8 {
    match clean(context) {
        Ok(true) => {
            println!("Cleaned {}", context.clean_dir().display());
            EXIT_SUCCESS
        }
        Ok(false) => {
            println!("Nothing to clean");
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Clean error: {}", e);
            EXIT_ERROR
        }
    }
}

fn run_build(context: &BuildContext) -> u8 {
    println!("Building {}", context.config().project.name);
    match ParallelBuild::new(context).run() {
        Ok(result) => report(&result, context),
        Err(e) => {
            eprintln!("Build error: {}", e);
            EXIT_ERROR
        }
    }
}

fn run_watch(context: &BuildContext) -> u8 {
    let reload = LiveReload::new();
    let spawned = server::spawn(&context.config().server, context.serve_dir(), reload.clone());
    let server = match spawned {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Server error: {}", e);
            return EXIT_ERROR;
        }
    };

    println!("Serving {} at http://{}", context.serve_dir().display(), server.addr);
    println!("Press Ctrl+C to stop");
    println!();

    match watch::watch(context, &reload) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Watch error: {}", e);
            EXIT_ERROR
        }
    }
}
