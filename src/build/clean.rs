//! The clean task: remove the build output tree.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info};

use crate::build::discovery::normalize;
use crate::build::{BuildContext, TaskError};

/// Recursively delete the configured clean target.
///
/// Returns `true` if something was removed. An absent directory is not an
/// error. Targets that are not strictly inside the project root are refused.
pub fn clean(context: &BuildContext) -> Result<bool, TaskError> {
    let target = normalize(&context.clean_dir());
    let root = normalize(context.project_root());

    if !is_inside(&target, &root) {
        return Err(TaskError::UnsafeClean(target));
    }

    match fs::remove_dir_all(&target) {
        Ok(()) => {
            info!("Cleaned {}", target.display());
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Nothing to clean at {}", target.display());
            Ok(false)
        }
        Err(e) => Err(TaskError::io(&target, e)),
    }
}

fn is_inside(target: &Path, root: &Path) -> bool {
    target != root && target.starts_with(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn context_with_clean(root: &Path, clean: &str) -> BuildContext {
        let mut config = SiteConfig::default();
        config.paths.clean = PathBuf::from(clean);
        BuildContext::new(config, root.to_path_buf())
    }

    #[test]
    fn test_clean_removes_tree() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("dist/assets/css");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("main.css"), "body{}").unwrap();

        let ctx = context_with_clean(temp.path(), "dist");
        assert!(clean(&ctx).unwrap());
        assert!(!temp.path().join("dist").exists());
    }

    #[test]
    fn test_clean_absent_is_noop() {
        let temp = TempDir::new().unwrap();
        let ctx = context_with_clean(temp.path(), "dist");
        assert!(!clean(&ctx).unwrap());
        // Idempotent
        assert!(!clean(&ctx).unwrap());
    }

    #[test]
    fn test_clean_accepts_dot_prefix() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("dist")).unwrap();
        let ctx = context_with_clean(temp.path(), "./dist");
        assert!(clean(&ctx).unwrap());
    }

    #[test]
    fn test_clean_refuses_project_root() {
        let temp = TempDir::new().unwrap();
        let ctx = context_with_clean(temp.path(), ".");
        assert!(matches!(clean(&ctx), Err(TaskError::UnsafeClean(_))));
        assert!(temp.path().exists());
    }

    #[test]
    fn test_clean_refuses_escape() {
        let temp = TempDir::new().unwrap();
        let ctx = context_with_clean(&temp.path().join("site"), "dist/../..");
        assert!(matches!(clean(&ctx), Err(TaskError::UnsafeClean(_))));
    }
}
