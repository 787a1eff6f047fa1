//! Command-line interface implementation
//!
//! `sitepipe [TASK]` runs one task from the task graph. With no task, the
//! site is built, served, and rebuilt on change.

mod build;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::build::TaskName;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;

/// Sitepipe - static-site asset pipeline
#[derive(Parser, Debug)]
#[command(name = "sitepipe")]
#[command(about = "Sitepipe - build a static site and serve it with live reload")]
#[command(version)]
pub struct Cli {
    /// Task to run
    #[arg(value_enum, default_value_t = TaskName::Watch)]
    pub task: TaskName,

    /// Config file (default: nearest sitepipe.toml above the current directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Dev server port (overrides server.port)
    #[arg(long)]
    pub port: Option<u16>,

    /// Treat caught source errors as failures
    #[arg(long)]
    pub strict: bool,

    /// Show debug output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parse arguments and run the selected task.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    crate::logging::init(cli.verbose);

    let context = match build::load_context(&cli) {
        Ok(context) => context,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    build::run_task(cli.task, &context)
}
