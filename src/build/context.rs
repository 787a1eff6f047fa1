//! Build context containing configuration and state for a build.

use crate::build::AssetClass;
use crate::config::{AssetPaths, SiteConfig};
use std::path::{Path, PathBuf};

/// Build context containing configuration and paths for a build operation.
///
/// Constructed once at startup and passed by reference to every task; nothing
/// in it changes for the life of the process.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// The loaded configuration
    config: SiteConfig,
    /// Project root directory (where sitepipe.toml is located)
    project_root: PathBuf,
    /// Whether recovered source errors count as failures
    strict: bool,
    /// Whether to run in verbose mode
    verbose: bool,
}

impl BuildContext {
    /// Create a new build context.
    pub fn new(config: SiteConfig, project_root: PathBuf) -> Self {
        Self { config, project_root, strict: false, verbose: false }
    }

    /// Get the configuration.
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Path-table entry for an asset class.
    pub fn paths(&self, class: AssetClass) -> &AssetPaths {
        self.config.paths.get(class)
    }

    /// Output directory for an asset class (resolved to absolute path).
    pub fn out_dir(&self, class: AssetClass) -> PathBuf {
        self.resolve_path(&self.paths(class).build)
    }

    /// Directory removed by the clean task (resolved to absolute path).
    pub fn clean_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.paths.clean)
    }

    /// Directory served by the dev server.
    pub fn serve_dir(&self) -> PathBuf {
        self.clean_dir()
    }

    /// Whether strict mode is enabled.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Whether verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Set strict mode.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Resolve a path relative to the project root.
    ///
    /// If the path is absolute, returns it unchanged.
    /// If relative, joins it with the project root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> BuildContext {
        BuildContext::new(SiteConfig::default(), PathBuf::from("/project"))
    }

    #[test]
    fn test_build_context_new() {
        let ctx = context();
        assert_eq!(ctx.project_root(), Path::new("/project"));
        assert!(!ctx.is_strict());
        assert!(!ctx.is_verbose());
    }

    #[test]
    fn test_build_context_with_flags() {
        let ctx = context().with_strict(true).with_verbose(true);
        assert!(ctx.is_strict());
        assert!(ctx.is_verbose());
    }

    #[test]
    fn test_build_context_out_dirs() {
        let ctx = context();
        assert_eq!(ctx.out_dir(AssetClass::Html), PathBuf::from("/project/dist/"));
        assert_eq!(ctx.out_dir(AssetClass::Css), PathBuf::from("/project/dist/assets/css/"));
        assert_eq!(ctx.clean_dir(), PathBuf::from("/project/dist"));
        assert_eq!(ctx.serve_dir(), ctx.clean_dir());
    }

    #[test]
    fn test_build_context_resolve_path_absolute() {
        let ctx = context();
        assert_eq!(ctx.resolve_path(Path::new("/other/path")), PathBuf::from("/other/path"));
    }

    #[test]
    fn test_build_context_resolve_path_relative() {
        let ctx = context();
        assert_eq!(
            ctx.resolve_path(Path::new("src/templates")),
            PathBuf::from("/project/src/templates")
        );
    }
}
