//! Source file discovery for the build system.
//!
//! Patterns come straight from the path table and may use brace alternation
//! (`*.{jpg,png}`), which the `glob` crate does not understand, so they are
//! expanded first. Each file is paired with its path relative to the pattern's
//! glob base, which is where its output lands inside the build directory.
//!
//! A pattern that fails to compile matches nothing. It is logged, never
//! reported as an error.

use glob::{glob_with, MatchOptions, Pattern};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

/// A discovered source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute (root-joined) path of the file
    pub path: PathBuf,
    /// Path relative to the glob base; outputs mirror it
    pub relative: PathBuf,
}

fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

/// Expand brace alternation in a glob pattern.
///
/// `a/*.{jpg,png}` becomes `a/*.jpg` and `a/*.png`. Groups may nest. A pattern
/// with an unbalanced brace is returned unchanged.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };

    let mut depth = 0;
    let mut close = None;
    let mut splits = Vec::new();
    for (idx, ch) in pattern[open..].char_indices() {
        let idx = open + idx;
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(idx);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(idx),
            _ => {}
        }
    }

    let Some(close) = close else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];

    let mut alternatives = Vec::new();
    let mut start = open + 1;
    for split in splits.into_iter().chain(std::iter::once(close)) {
        alternatives.push(&pattern[start..split]);
        start = split + 1;
    }

    alternatives
        .into_iter()
        .flat_map(|alt| expand_braces(&format!("{}{}{}", prefix, alt, suffix)))
        .collect()
}

fn has_magic(component: &str) -> bool {
    component.contains(['*', '?', '[', '{'])
}

/// The leading run of path components that contain no glob syntax.
///
/// `src/assets/img/**/*.png` has base `src/assets/img`; a literal file path
/// has its parent directory as base.
pub fn glob_base(pattern: &str) -> PathBuf {
    let path = Path::new(pattern);
    let mut base = PathBuf::new();
    let mut literal = true;

    for component in path.components() {
        if has_magic(&component.as_os_str().to_string_lossy()) {
            literal = false;
            break;
        }
        base.push(component);
    }

    if literal {
        // No magic at all: the pattern names a single file
        base.pop();
    }
    base
}

/// Join a pattern onto the project root, escaping the root so glob syntax in
/// directory names is taken literally.
pub fn absolute_pattern(root: &Path, pattern: &str) -> String {
    if Path::new(pattern).is_absolute() {
        return pattern.to_string();
    }
    let root = Pattern::escape(&root.to_string_lossy());
    let root = root.trim_end_matches('/');
    let pattern = pattern.strip_prefix("./").unwrap_or(pattern);
    format!("{}/{}", root, pattern)
}

/// Find the files matching a path-table pattern.
///
/// Results are files only, de-duplicated, and sorted by path.
pub fn discover_sources(root: &Path, pattern: &str) -> Vec<SourceFile> {
    let mut found = BTreeMap::new();

    for expanded in expand_braces(pattern) {
        let base = root.join(glob_base(&expanded));
        let full = absolute_pattern(root, &expanded);

        let entries = match glob_with(&full, match_options()) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Ignoring malformed glob '{}': {}", pattern, e);
                continue;
            }
        };

        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => {
                    let relative = match path.strip_prefix(&base) {
                        Ok(relative) => relative.to_path_buf(),
                        Err(_) => path.file_name().map(PathBuf::from).unwrap_or_default(),
                    };
                    found.entry(path.clone()).or_insert(SourceFile { path, relative });
                }
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable path while matching '{}': {}", pattern, e),
            }
        }
    }

    found.into_values().collect()
}

/// A compiled set of patterns used to test changed paths in watch mode.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    /// Compile a path-table pattern rooted at `root`.
    ///
    /// Alternatives that fail to compile are dropped with a warning.
    pub fn new(root: &Path, pattern: &str) -> Self {
        let patterns = expand_braces(pattern)
            .into_iter()
            .filter_map(|expanded| {
                let full = absolute_pattern(root, &expanded);
                match Pattern::new(&full) {
                    Ok(p) => Some(p),
                    Err(e) => {
                        warn!("Ignoring malformed watch glob '{}': {}", pattern, e);
                        None
                    }
                }
            })
            .collect();
        Self { patterns }
    }

    /// Whether any pattern matches the path.
    pub fn matches(&self, path: &Path) -> bool {
        let path = normalize(path);
        self.patterns.iter().any(|p| p.matches_path_with(&path, match_options()))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Lexically resolve `.` and `..` components.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
