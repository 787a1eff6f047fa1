//! The html task: render pages through layouts, partials, and data files.
//!
//! A page is an HTML file with optional YAML front matter:
//!
//! ```text
//! ---
//! title: About
//! layout: wide
//! ---
//! <h1>{{title}}</h1>
//! {{> footer}}
//! ```
//!
//! The page body is registered as the `body` partial and the chosen layout
//! (`<layouts>/<name>.html`) is rendered around it with `{{> body}}`. The
//! template registry is rebuilt from disk on every run so edits to layouts,
//! partials, and data are always picked up.

use handlebars::Handlebars;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::{Component, Path};
use std::time::Instant;
use tracing::debug;

use crate::build::{
    discover_sources, AssetClass, BuildContext, SourceError, SourceFile, TaskError, TaskOutcome,
    TaskReport,
};
use crate::transform::helpers::register_helpers;
use crate::transform::{read_source, write_output};

const LAYOUT_PREFIX: &str = "layout:";
const BODY_PARTIAL: &str = "body";

/// A page split into its front matter and template body.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a> {
    /// Front matter variables, empty when the page has none
    pub vars: Map<String, Value>,
    pub body: &'a str,
}

/// Split YAML front matter from a page.
///
/// Front matter starts with a `---` line at the very top and ends with the next
/// `---` line. Content without it is returned whole.
pub fn split_front_matter(content: &str) -> Result<Page<'_>, String> {
    let opening = content.strip_prefix("---\n").or_else(|| content.strip_prefix("---\r\n"));
    let Some(rest) = opening else {
        return Ok(Page { vars: Map::new(), body: content });
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Ok(Page { vars: parse_front_matter(yaml)?, body });
        }
        offset += line.len();
    }

    Err("front matter is not closed with '---'".to_string())
}

fn parse_front_matter(yaml: &str) -> Result<Map<String, Value>, String> {
    if yaml.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(_) => Err("front matter must be a mapping".to_string()),
        Err(e) => Err(format!("invalid front matter: {}", e)),
    }
}

/// Relative path from a page's output location back to the build root.
///
/// `index.html` gives `""`, `blog/post.html` gives `"../"`.
pub fn root_prefix(relative: &Path) -> String {
    let depth = relative
        .parent()
        .map(|p| p.components().filter(|c| matches!(c, Component::Normal(_))).count())
        .unwrap_or(0);
    "../".repeat(depth)
}

fn file_stem(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}

fn dir_pattern(dir: &Path, suffix: &str) -> String {
    format!("{}/{}", dir.to_string_lossy().trim_end_matches('/'), suffix)
}

/// Layouts, partials, data, and helpers loaded from disk.
pub struct TemplateEngine {
    registry: Handlebars<'static>,
    layouts: BTreeSet<String>,
    data: Map<String, Value>,
    default_layout: String,
}

impl TemplateEngine {
    /// Load every layout, partial, and data file for a project.
    ///
    /// Files that fail to parse are returned as source errors; the rest of the
    /// engine is still usable.
    pub fn load(context: &BuildContext) -> Result<(Self, Vec<SourceError>), TaskError> {
        let templates = &context.config().templates;
        let root = context.project_root();
        let mut errors = Vec::new();

        let mut registry = Handlebars::new();
        register_helpers(&mut registry);

        let partials = dir_pattern(&templates.partials, "**/*.{html,hbs,handlebars}");
        for partial in discover_sources(root, &partials) {
            let source = read_source(&partial.path)?;
            if let Err(e) = registry.register_partial(&file_stem(&partial.path), source) {
                errors.push(SourceError::new(&partial.path, e.to_string()));
            }
        }

        let mut layouts = BTreeSet::new();
        for layout in discover_sources(root, &dir_pattern(&templates.layouts, "*.html")) {
            let name = file_stem(&layout.path);
            let source = read_source(&layout.path)?;
            match registry.register_template_string(&format!("{}{}", LAYOUT_PREFIX, name), source) {
                Ok(()) => {
                    layouts.insert(name);
                }
                Err(e) => errors.push(SourceError::new(&layout.path, e.to_string())),
            }
        }

        let mut data = Map::new();
        for file in discover_sources(root, &dir_pattern(&templates.data, "**/*.{json,yml,yaml}")) {
            match load_data_file(&file) {
                Ok(value) => {
                    data.insert(file_stem(&file.path), value);
                }
                Err(e) => errors.push(e),
            }
        }

        debug!("Loaded {} layouts, {} data files", layouts.len(), data.len());

        let engine =
            Self { registry, layouts, data, default_layout: templates.default_layout.clone() };
        Ok((engine, errors))
    }

    /// Whether a layout with this name was loaded.
    pub fn has_layout(&self, name: &str) -> bool {
        self.layouts.contains(name)
    }

    /// Render one page through its layout.
    pub fn render_page(&mut self, content: &str, relative: &Path) -> Result<String, String> {
        let page = split_front_matter(content)?;

        let layout = match page.vars.get("layout") {
            Some(Value::String(name)) => name.clone(),
            Some(_) => return Err("'layout' must be a string".to_string()),
            None => self.default_layout.clone(),
        };
        if !self.has_layout(&layout) {
            return Err(format!("layout '{}' does not exist", layout));
        }

        let mut vars = self.data.clone();
        vars.extend(page.vars);
        vars.insert("page".to_string(), Value::String(file_stem(relative)));
        vars.insert("root".to_string(), Value::String(root_prefix(relative)));

        self.registry.register_partial(BODY_PARTIAL, page.body).map_err(|e| e.to_string())?;
        self.registry
            .render(&format!("{}{}", LAYOUT_PREFIX, layout), &Value::Object(vars))
            .map_err(|e| e.to_string())
    }
}

fn load_data_file(file: &SourceFile) -> Result<Value, SourceError> {
    let content = read_source(&file.path).map_err(|e| SourceError::new(&file.path, e.to_string()))?;
    let is_json = file.path.extension().is_some_and(|ext| ext == "json");
    let parsed = if is_json {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(&content).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| SourceError::new(&file.path, message))
}

/// Run the html task.
pub fn run(context: &BuildContext) -> Result<TaskOutcome, TaskError> {
    let start = Instant::now();
    let paths = context.paths(AssetClass::Html);
    let sources = discover_sources(context.project_root(), &paths.src);
    let out_dir = context.out_dir(AssetClass::Html);

    let mut report = TaskReport::new(AssetClass::Html, sources.len());
    if sources.is_empty() {
        report.duration = start.elapsed();
        return Ok(TaskOutcome::Success(report));
    }

    let (mut engine, mut errors) = TemplateEngine::load(context)?;

    for source in &sources {
        let content = read_source(&source.path)?;
        match engine.render_page(&content, &source.relative) {
            Ok(html) => {
                let out_path = out_dir.join(&source.relative);
                write_output(&out_path, html.as_bytes())?;
                report.outputs.push(out_path);
            }
            Err(message) => errors.push(SourceError::new(&source.path, message)),
        }
    }

    report.duration = start.elapsed();
    Ok(TaskOutcome::from_parts(report, errors))
}
