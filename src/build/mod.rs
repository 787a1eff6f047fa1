//! Build orchestration for sitepipe
//!
//! Provides the task graph that turns a `src/` tree into a `dist/` tree.
//!
//! # Overview
//!
//! The build system consists of:
//! - **Discovery**: Find source files using glob patterns from the path table
//! - **Tasks**: Guarded transform tasks returning a [`TaskOutcome`]
//! - **Clean**: Remove the output tree before a full build
//! - **Execution**: Run the transforms concurrently and collect a [`BuildResult`]
//!
//! # Example
//!
//! ```ignore
//! use sitepipe::build::{BuildContext, ParallelBuild};
//! use sitepipe::config::load_config;
//!
//! let config = load_config(None)?;
//! let context = BuildContext::new(config, project_root);
//!
//! let result = ParallelBuild::new(&context).run()?;
//! println!("{}", result.summary());
//! ```

pub mod clean;
pub mod context;
pub mod discovery;
pub mod parallel;
pub mod result;
pub mod task;

pub use clean::clean;
pub use context::*;
pub use discovery::{discover_sources, PatternSet, SourceFile};
pub use parallel::*;
pub use result::*;
pub use task::*;
