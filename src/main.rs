//! Sitepipe - command-line tool for building and serving a static site

use std::process::ExitCode;

use sitepipe::cli;

fn main() -> ExitCode {
    cli::run()
}
