//! Configuration schema types for `sitepipe.toml`
//!
//! Defines the path table and the settings handed to each transform task.
//! Every field has a default matching the conventional `src/` → `dist/` layout,
//! so an empty file (or no file at all) is a valid configuration.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

use crate::build::AssetClass;

/// Project metadata section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name, used only for display
    ///
    /// Empty until the loader fills it in from the project directory.
    #[serde(default)]
    pub name: String,
}

/// Source, watch, and output locations for one asset class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPaths {
    /// Glob selecting the files the task compiles
    pub src: String,
    /// Glob whose changes re-run the task in watch mode
    pub watch: String,
    /// Directory the task writes into
    pub build: PathBuf,
}

impl AssetPaths {
    fn new(src: &str, watch: &str, build: &str) -> Self {
        Self { src: src.to_string(), watch: watch.to_string(), build: PathBuf::from(build) }
    }
}

fn default_html_paths() -> AssetPaths {
    AssetPaths::new("src/*.html", "src/**/*.html", "dist/")
}

fn default_css_paths() -> AssetPaths {
    AssetPaths::new("src/assets/sass/main.sass", "src/assets/sass/**/*.sass", "dist/assets/css/")
}

fn default_js_paths() -> AssetPaths {
    AssetPaths::new("src/assets/js/*.js", "src/assets/js/**/*.js", "dist/assets/js/")
}

fn default_images_paths() -> AssetPaths {
    AssetPaths::new(
        "src/assets/img/**/*.{jpg,png,svg,gif,ico}",
        "src/assets/img/**/*.{jpg,png,svg,gif,ico}",
        "dist/assets/img/",
    )
}

/// A `[paths.<class>]` table as written. Missing fields fall back to the
/// class's own defaults.
#[derive(Debug, Deserialize)]
struct AssetPathsTable {
    src: Option<String>,
    watch: Option<String>,
    build: Option<PathBuf>,
}

impl AssetPathsTable {
    fn over(self, defaults: AssetPaths) -> AssetPaths {
        AssetPaths {
            src: self.src.unwrap_or(defaults.src),
            watch: self.watch.unwrap_or(defaults.watch),
            build: self.build.unwrap_or(defaults.build),
        }
    }
}

fn html_paths<'de, D: Deserializer<'de>>(deserializer: D) -> Result<AssetPaths, D::Error> {
    AssetPathsTable::deserialize(deserializer).map(|table| table.over(default_html_paths()))
}

fn css_paths<'de, D: Deserializer<'de>>(deserializer: D) -> Result<AssetPaths, D::Error> {
    AssetPathsTable::deserialize(deserializer).map(|table| table.over(default_css_paths()))
}

fn js_paths<'de, D: Deserializer<'de>>(deserializer: D) -> Result<AssetPaths, D::Error> {
    AssetPathsTable::deserialize(deserializer).map(|table| table.over(default_js_paths()))
}

fn images_paths<'de, D: Deserializer<'de>>(deserializer: D) -> Result<AssetPaths, D::Error> {
    AssetPathsTable::deserialize(deserializer).map(|table| table.over(default_images_paths()))
}

fn default_clean() -> PathBuf {
    PathBuf::from("dist")
}

/// The path table: one [`AssetPaths`] per asset class plus the clean target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathTable {
    #[serde(default = "default_html_paths", deserialize_with = "html_paths")]
    pub html: AssetPaths,
    #[serde(default = "default_css_paths", deserialize_with = "css_paths")]
    pub css: AssetPaths,
    #[serde(default = "default_js_paths", deserialize_with = "js_paths")]
    pub js: AssetPaths,
    #[serde(default = "default_images_paths", deserialize_with = "images_paths")]
    pub images: AssetPaths,
    /// Directory removed by the clean task
    #[serde(default = "default_clean")]
    pub clean: PathBuf,
}

impl Default for PathTable {
    fn default() -> Self {
        Self {
            html: default_html_paths(),
            css: default_css_paths(),
            js: default_js_paths(),
            images: default_images_paths(),
            clean: default_clean(),
        }
    }
}

impl PathTable {
    /// Look up the paths for an asset class.
    pub fn get(&self, class: AssetClass) -> &AssetPaths {
        match class {
            AssetClass::Html => &self.html,
            AssetClass::Css => &self.css,
            AssetClass::Js => &self.js,
            AssetClass::Images => &self.images,
        }
    }
}

/// Template engine roots used by the html task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Directory holding `<name>.html` layouts
    #[serde(default = "default_layouts")]
    pub layouts: PathBuf,
    /// Directory of partials, registered by file stem
    #[serde(default = "default_partials")]
    pub partials: PathBuf,
    /// Directory of JSON/YAML data files, exposed by file stem
    #[serde(default = "default_data")]
    pub data: PathBuf,
    /// Layout used when a page does not name one
    #[serde(default = "default_layout")]
    pub default_layout: String,
}

fn default_layouts() -> PathBuf {
    PathBuf::from("src/templates/layouts")
}

fn default_partials() -> PathBuf {
    PathBuf::from("src/templates/partials")
}

fn default_data() -> PathBuf {
    PathBuf::from("src/templates/data")
}

fn default_layout() -> String {
    "default".to_string()
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            layouts: default_layouts(),
            partials: default_partials(),
            data: default_data(),
            default_layout: default_layout(),
        }
    }
}

/// Stylesheet settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CssConfig {
    /// Browserslist queries that decide which vendor prefixes are added
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,
    /// Accepted for compatibility; the printer always emits one declaration per line
    #[serde(default = "default_true")]
    pub cascade: bool,
}

fn default_browsers() -> Vec<String> {
    vec!["last 8 versions".to_string()]
}

fn default_true() -> bool {
    true
}

impl Default for CssConfig {
    fn default() -> Self {
        Self { browsers: default_browsers(), cascade: true }
    }
}

/// Dev server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

/// Watch mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
}

fn default_debounce_ms() -> u32 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms() }
    }
}

/// Complete sitepipe.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub paths: PathTable,
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub css: CssConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "paths.css.src")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sitepipe.toml: '{}' {}", self.field, self.message)
    }
}

impl SiteConfig {
    /// Validate the configuration and return any errors.
    ///
    /// Glob syntax is deliberately not checked here: a malformed pattern
    /// simply matches nothing at build time.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        for class in AssetClass::ALL {
            let paths = self.paths.get(class);
            if paths.src.trim().is_empty() {
                errors.push(ConfigValidationError {
                    field: format!("paths.{}.src", class),
                    message: "must be a non-empty glob pattern".to_string(),
                });
            }
            if paths.build.as_os_str().is_empty() {
                errors.push(ConfigValidationError {
                    field: format!("paths.{}.build", class),
                    message: "must be a non-empty directory".to_string(),
                });
            }
        }

        if self.paths.clean.as_os_str().is_empty() {
            errors.push(ConfigValidationError {
                field: "paths.clean".to_string(),
                message: "must be a non-empty directory".to_string(),
            });
        }

        if self.templates.default_layout.is_empty() {
            errors.push(ConfigValidationError {
                field: "templates.default_layout".to_string(),
                message: "must be a non-empty layout name".to_string(),
            });
        }

        if self.css.browsers.is_empty() {
            errors.push(ConfigValidationError {
                field: "css.browsers".to_string(),
                message: "must contain at least one browserslist query".to_string(),
            });
        }

        if self.server.port == 0 {
            errors.push(ConfigValidationError {
                field: "server.port".to_string(),
                message: "must be a positive port number".to_string(),
            });
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}
