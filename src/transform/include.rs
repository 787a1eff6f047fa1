//! Script include directives
//!
//! A line consisting only of `//= path` or `/*= path */` is replaced by the
//! contents of `path`, resolved relative to the directory of the file holding
//! the directive. Included files are processed recursively, and every spliced
//! line is prefixed with the directive's indentation.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

/// Error type for include resolution failures.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum IncludeError {
    /// Circular include detected
    #[error("Circular include detected: {}", .0.display())]
    CircularInclude(PathBuf),
    /// File not found
    #[error("Include file not found '{}' (included from {})", .0.display(), .1.display())]
    FileNotFound(PathBuf, PathBuf),
    /// IO error reading file
    #[error("Error reading include file '{}': {1}", .0.display())]
    IoError(PathBuf, String),
}

fn directive() -> &'static Regex {
    static DIRECTIVE: OnceLock<Regex> = OnceLock::new();
    DIRECTIVE.get_or_init(|| {
        Regex::new(concat!(
            r"^(?P<indent>[ \t]*)",
            r"(?://=[ \t]*(?P<line>\S.*?)|/\*=[ \t]*(?P<block>\S.*?)[ \t]*\*/)",
            r"[ \t]*$"
        ))
        .expect("include directive pattern is valid")
    })
}

/// Parse an include directive line into its indentation and target path.
///
/// Returns `None` if the line is ordinary code.
pub fn parse_directive(line: &str) -> Option<(&str, &str)> {
    let caps = directive().captures(line)?;
    let indent = caps.name("indent").map_or("", |m| m.as_str());
    let target = caps.name("line").or_else(|| caps.name("block"))?.as_str().trim();
    let target = target.trim_matches(|c| c == '"' || c == '\'');
    Some((indent, target))
}

/// Resolve every include directive in a script file.
pub fn resolve_includes(path: &Path) -> Result<String, IncludeError> {
    let mut stack = Vec::new();
    resolve_with_detection(path, &mut stack)
}

fn resolve_with_detection(path: &Path, stack: &mut Vec<PathBuf>) -> Result<String, IncludeError> {
    let canonical = fs::canonicalize(path)
        .map_err(|e| IncludeError::IoError(path.to_path_buf(), e.to_string()))?;

    if stack.contains(&canonical) {
        return Err(IncludeError::CircularInclude(path.to_path_buf()));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| IncludeError::IoError(path.to_path_buf(), e.to_string()))?;

    stack.push(canonical);

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let mut lines = Vec::new();

    for line in content.lines() {
        match parse_directive(line) {
            Some((indent, target)) => {
                let include_path = base.join(target);
                if !include_path.is_file() {
                    return Err(IncludeError::FileNotFound(include_path, path.to_path_buf()));
                }
                let included = resolve_with_detection(&include_path, stack)?;
                for included_line in included.lines() {
                    if included_line.is_empty() {
                        lines.push(String::new());
                    } else {
                        lines.push(format!("{}{}", indent, included_line));
                    }
                }
            }
            None => lines.push(line.to_string()),
        }
    }

    stack.pop();

    let mut output = lines.join("\n");
    if content.ends_with('\n') {
        output.push('\n');
    }
    Ok(output)
}
