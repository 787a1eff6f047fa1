//! Transform tasks, one module per asset class.
//!
//! Every task follows the same shape: discover sources from the path table,
//! run each through its chain of external tools, and write the results under
//! the class's build directory at the source's glob-relative path. Errors in
//! a source file are collected and returned in a
//! [`TaskOutcome::Recovered`](crate::build::TaskOutcome::Recovered); I/O
//! failures abort the task.

pub mod css;
pub mod helpers;
pub mod html;
pub mod images;
pub mod include;
pub mod js;

use std::fs;
use std::path::{Path, PathBuf};

use crate::build::TaskError;

/// Write an output file, creating parent directories as needed.
pub(crate) fn write_output(path: &Path, contents: &[u8]) -> Result<(), TaskError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| TaskError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| TaskError::io(path, e))
}

/// Read a UTF-8 source file.
pub(crate) fn read_source(path: &Path) -> Result<String, TaskError> {
    fs::read_to_string(path).map_err(|e| TaskError::io(path, e))
}

/// `dir/name.ext` → `dir/name.min.<ext>`.
pub fn min_path(path: &Path, ext: &str) -> PathBuf {
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!("{}.min.{}", stem, ext))
}
