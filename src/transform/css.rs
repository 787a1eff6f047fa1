//! The css task: compile the entry stylesheet, prefix it for the configured
//! browsers, and write a readable and a minified copy.

use grass::{Options, OutputStyle};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use std::path::Path;
use std::time::Instant;
use tracing::debug;

use crate::build::{
    discover_sources, AssetClass, BuildContext, SourceError, TaskError, TaskOutcome, TaskReport,
};
use crate::transform::{min_path, write_output};

/// Readable and minified output for one stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssArtifacts {
    pub readable: String,
    pub minified: String,
}

/// Turn browserslist queries into lightningcss targets.
///
/// An empty query list disables prefixing.
pub fn resolve_targets(browsers: &[String]) -> Result<Targets, TaskError> {
    if browsers.is_empty() {
        return Ok(Targets::default());
    }
    let resolved = Browsers::from_browserslist(browsers.iter().map(String::as_str))
        .map_err(|e| TaskError::Config(format!("css.browsers: {}", e)))?;
    Ok(resolved.map(Targets::from).unwrap_or_default())
}

/// Compile a Sass or SCSS file to expanded CSS.
///
/// The syntax follows the file extension. Imports resolve against the file's
/// own directory.
pub fn compile_stylesheet(path: &Path) -> Result<String, SourceError> {
    let mut options = Options::default().style(OutputStyle::Expanded);
    if let Some(dir) = path.parent() {
        options = options.load_path(dir);
    }
    grass::from_path(path, &options).map_err(|e| SourceError::new(path, e.to_string()))
}

/// Prefix compiled CSS, then print it twice: pretty and minified.
pub fn process_css(css: &str, filename: &str, targets: &Targets) -> Result<CssArtifacts, String> {
    let mut sheet = StyleSheet::parse(
        css,
        ParserOptions { filename: filename.to_string(), ..ParserOptions::default() },
    )
    .map_err(|e| e.to_string())?;

    sheet
        .minify(MinifyOptions { targets: targets.clone(), ..MinifyOptions::default() })
        .map_err(|e| e.to_string())?;

    let print = |minify: bool| {
        sheet
            .to_css(PrinterOptions {
                minify,
                targets: targets.clone(),
                ..PrinterOptions::default()
            })
            .map(|result| result.code)
            .map_err(|e| e.to_string())
    };
    let readable = print(false)?;
    let minified = print(true)?;

    Ok(CssArtifacts { readable, minified: strip_css_comments(&minified) })
}

/// Remove every `/* ... */` comment, including `/*! ... */`, leaving string
/// literals untouched.
pub fn strip_css_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut chars = css.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' => {
                out.push(c);
                while let Some(inner) = chars.next() {
                    out.push(inner);
                    if inner == '\\' {
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                    } else if inner == c {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for inner in chars.by_ref() {
                    if prev == '*' && inner == '/' {
                        break;
                    }
                    prev = inner;
                }
            }
            _ => out.push(c),
        }
    }

    out.trim().to_string()
}

/// Run the css task.
pub fn run(context: &BuildContext) -> Result<TaskOutcome, TaskError> {
    let start = Instant::now();
    let targets = resolve_targets(&context.config().css.browsers)?;
    let paths = context.paths(AssetClass::Css);
    let sources = discover_sources(context.project_root(), &paths.src);
    let out_dir = context.out_dir(AssetClass::Css);

    let mut report = TaskReport::new(AssetClass::Css, sources.len());
    let mut errors = Vec::new();

    for source in &sources {
        let compiled = match compile_stylesheet(&source.path) {
            Ok(css) => css,
            Err(e) => {
                errors.push(e);
                continue;
            }
        };
        let filename = source.path.to_string_lossy();
        let artifacts = match process_css(&compiled, &filename, &targets) {
            Ok(artifacts) => artifacts,
            Err(message) => {
                errors.push(SourceError::new(&source.path, message));
                continue;
            }
        };

        let readable_path = out_dir.join(&source.relative).with_extension("css");
        let minified_path = min_path(&readable_path, "css");
        write_output(&readable_path, artifacts.readable.as_bytes())?;
        write_output(&minified_path, artifacts.minified.as_bytes())?;
        debug!("Compiled {} -> {}", source.path.display(), readable_path.display());
        report.outputs.push(readable_path);
        report.outputs.push(minified_path);
    }

    report.duration = start.elapsed();
    Ok(TaskOutcome::from_parts(report, errors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn context(root: &Path) -> BuildContext {
        BuildContext::new(SiteConfig::default(), root.to_path_buf())
    }

    #[test]
    fn test_strip_css_comments() {
        assert_eq!(strip_css_comments("/*! keep? */a{color:red}/* x */"), "a{color:red}");
        assert_eq!(strip_css_comments("a{b:1}/* multi\nline */c{d:2}"), "a{b:1}c{d:2}");
    }

    #[test]
    fn test_strip_css_comments_preserves_strings() {
        let css = r#"a::before{content:"/* not a comment */"}b{content:'x\'/*'}"#;
        assert_eq!(strip_css_comments(css), css);
    }

    #[test]
    fn test_strip_css_comments_unterminated() {
        assert_eq!(strip_css_comments("a{b:1}/* open"), "a{b:1}");
    }

    #[test]
    fn test_resolve_targets() {
        assert!(resolve_targets(&[]).unwrap().browsers.is_none());
        assert!(resolve_targets(&["last 8 versions".to_string()]).unwrap().browsers.is_some());
        assert!(matches!(
            resolve_targets(&["not a real query at all".to_string()]),
            Err(TaskError::Config(_))
        ));
    }

    #[test]
    fn test_compile_stylesheet_indented_syntax() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "main.sass", "$brand: #336699\n\nbody\n  color: $brand\n");
        let css = compile_stylesheet(&temp.path().join("main.sass")).unwrap();
        assert!(css.contains("color: #336699"));
    }

    #[test]
    fn test_compile_stylesheet_resolves_partials() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "_vars.scss", "$gap: 4px;\n");
        write(temp.path(), "main.scss", "@use 'vars';\n.a { margin: vars.$gap; }\n");
        let css = compile_stylesheet(&temp.path().join("main.scss")).unwrap();
        assert!(css.contains("margin: 4px"));
    }

    #[test]
    fn test_compile_stylesheet_error_names_file() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "main.sass", "body\n  color: $missing\n");
        let error = compile_stylesheet(&temp.path().join("main.sass")).unwrap_err();
        assert!(error.file.ends_with("main.sass"));
        assert!(!error.message.is_empty());
    }

    #[test]
    fn test_process_css_adds_prefixes() {
        let targets = resolve_targets(&["safari 8".to_string()]).unwrap();
        let artifacts = process_css(".a { user-select: none; }", "a.css", &targets).unwrap();
        assert!(artifacts.readable.contains("-webkit-user-select"));
        assert!(artifacts.minified.contains("-webkit-user-select"));
        assert!(artifacts.readable.contains('\n'));
        assert!(artifacts.minified.len() < artifacts.readable.len());
    }

    #[test]
    fn test_process_css_strips_license_comments() {
        let artifacts =
            process_css("/*! v1.0 */\n.a { color: red; }", "a.css", &Targets::default()).unwrap();
        assert!(!artifacts.minified.contains("/*"));
        assert!(artifacts.minified.contains(".a{color:red}"));
    }

    #[test]
    fn test_run_writes_dual_artifacts() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/assets/sass/main.sass", "body\n  margin: 0\n  display: flex\n");

        let outcome = run(&context(temp.path())).unwrap();
        assert!(outcome.is_clean());
        assert_eq!(outcome.report().outputs.len(), 2);

        let readable = fs::read_to_string(temp.path().join("dist/assets/css/main.css")).unwrap();
        let minified =
            fs::read_to_string(temp.path().join("dist/assets/css/main.min.css")).unwrap();
        assert!(!readable.trim().is_empty());
        assert!(!minified.trim().is_empty());
        assert!(readable.contains("margin: 0"));
        assert!(!minified.contains('\n'));
    }

    #[test]
    fn test_run_sass_error_is_recovered() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/assets/sass/main.sass", "body\n  @error \"broken\"\n");

        let outcome = run(&context(temp.path())).unwrap();
        assert_eq!(outcome.errors().len(), 1);
        assert!(!temp.path().join("dist/assets/css/main.css").exists());
    }

    #[test]
    fn test_run_missing_entry_is_empty_success() {
        let temp = TempDir::new().unwrap();
        let outcome = run(&context(temp.path())).unwrap();
        assert!(outcome.is_clean());
        assert_eq!(outcome.report().inputs, 0);
    }
}
