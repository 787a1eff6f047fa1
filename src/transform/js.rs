//! The js task: bundle include directives, then write a readable and a
//! minified copy of every entry script.

use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{CompressOptions, MangleOptions, Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::path::Path;
use std::time::Instant;
use tracing::debug;

use crate::build::{
    discover_sources, AssetClass, BuildContext, SourceError, TaskError, TaskOutcome, TaskReport,
};
use crate::transform::include::resolve_includes;
use crate::transform::{min_path, write_output};

/// Resolve every include directive in an entry script.
pub fn bundle_script(path: &Path) -> Result<String, SourceError> {
    resolve_includes(path).map_err(|e| SourceError::new(path, e.to_string()))
}

/// Minify a bundled script with top-level names left intact.
///
/// Scripts are parsed as classic (non-module) scripts, so top-level
/// declarations stay global and are neither renamed nor dropped.
pub fn minify_script(code: &str) -> Result<Vec<u8>, String> {
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, code, SourceType::cjs()).parse();
    if let Some(error) = parsed.errors.first() {
        return Err(error.to_string());
    }
    if parsed.panicked {
        return Err("parser gave up on the script".to_string());
    }

    let mut program = parsed.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions { top_level: false, ..MangleOptions::default() }),
        compress: Some(CompressOptions::default()),
    };
    let minified = Minifier::new(options).build(&allocator, &mut program);

    let code = Codegen::new()
        .with_options(CodegenOptions { minify: true, ..CodegenOptions::default() })
        .with_scoping(minified.scoping)
        .build(&program)
        .code;
    Ok(code.into_bytes())
}

/// Run the js task.
pub fn run(context: &BuildContext) -> Result<TaskOutcome, TaskError> {
    let start = Instant::now();
    let paths = context.paths(AssetClass::Js);
    let sources = discover_sources(context.project_root(), &paths.src);
    let out_dir = context.out_dir(AssetClass::Js);

    let mut report = TaskReport::new(AssetClass::Js, sources.len());
    let mut errors = Vec::new();

    for source in &sources {
        let bundled = match bundle_script(&source.path) {
            Ok(code) => code,
            Err(e) => {
                errors.push(e);
                continue;
            }
        };
        let minified = match minify_script(&bundled) {
            Ok(code) => code,
            Err(message) => {
                errors.push(SourceError::new(&source.path, message));
                continue;
            }
        };

        let readable_path = out_dir.join(&source.relative);
        let minified_path = min_path(&readable_path, "js");
        write_output(&readable_path, bundled.as_bytes())?;
        write_output(&minified_path, &minified)?;
        debug!("Bundled {} -> {}", source.path.display(), readable_path.display());
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
    fn test_minify_script_shrinks() {
        let code = "function add(first, second) {\n    return first + second;\n}\n";
        let out = minify_script(code).unwrap();
        assert!(!out.is_empty());
        assert!(out.len() < code.len());
        assert!(String::from_utf8(out).unwrap().contains("add"));
    }

    #[test]
    fn test_minify_script_keeps_accessors() {
        let code = concat!(
            "x = {get a() { return 1; }, set a(v) {}};\n",
            "class A { #x = 1; get x() { return this.#x; } }\n",
            "window.A = A;\n"
        );
        let out = String::from_utf8(minify_script(code).unwrap()).unwrap();
        assert!(out.contains("get a"));
        assert!(out.contains("set a"));
        assert!(out.contains("get x"));
    }

    #[test]
    fn test_minify_script_keeps_use_strict() {
        let code = "window.f = function () {\n  'use strict';\n  return arguments;\n};\n";
        let out = String::from_utf8(minify_script(code).unwrap()).unwrap();
        assert!(out.contains("use strict"));
        assert!(!out.contains('`'));
    }

    #[test]
    fn test_minify_script_keeps_global_names() {
        let code = "var counter = 0;\nfunction bump(step) {\n  counter += step;\n}\n";
        let out = String::from_utf8(minify_script(code).unwrap()).unwrap();
        assert!(out.contains("counter"));
        assert!(out.contains("bump"));
        assert!(!out.contains("step"));
    }

    #[test]
    fn test_minify_script_syntax_error() {
        assert!(minify_script("function (").is_err());
    }

    #[test]
    fn test_run_writes_dual_artifacts() {
        let temp = TempDir::new().unwrap();
        let greet = "function greet() {\n  return 'hi';\n}\n";
        write(temp.path(), "src/assets/js/partials/greet.js", greet);
        write(temp.path(), "src/assets/js/main.js", "//= partials/greet.js\ngreet();\n");

        let outcome = run(&context(temp.path())).unwrap();
        assert!(outcome.is_clean());
        assert_eq!(outcome.report().inputs, 1);

        let readable = fs::read_to_string(temp.path().join("dist/assets/js/main.js")).unwrap();
        assert!(readable.contains("return 'hi';"));
        assert!(!readable.contains("//="));
        let minified = fs::read(temp.path().join("dist/assets/js/main.min.js")).unwrap();
        assert!(!minified.is_empty());
        assert!(minified.len() < readable.len());
    }

    #[test]
    fn test_run_partials_directory_is_not_an_entry() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/assets/js/partials/greet.js", "var g = 1;\n");
        write(temp.path(), "src/assets/js/main.js", "var m = 1;\n");

        run(&context(temp.path())).unwrap();
        assert!(!temp.path().join("dist/assets/js/partials").exists());
    }

    #[test]
    fn test_run_missing_include_is_recovered() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/assets/js/broken.js", "//= nowhere.js\n");
        write(temp.path(), "src/assets/js/ok.js", "var ok = 1;\n");

        let outcome = run(&context(temp.path())).unwrap();
        assert_eq!(outcome.errors().len(), 1);
        assert!(outcome.errors()[0].file.ends_with("broken.js"));
        assert!(!temp.path().join("dist/assets/js/broken.js").exists());
        assert!(temp.path().join("dist/assets/js/ok.min.js").exists());
    }

    #[test]
    fn test_run_syntax_error_writes_nothing() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/assets/js/bad.js", "var = ;\n");

        let outcome = run(&context(temp.path())).unwrap();
        assert!(!outcome.is_clean());
        assert!(!temp.path().join("dist/assets/js/bad.js").exists());
        assert!(!temp.path().join("dist/assets/js/bad.min.js").exists());
    }
}
