//! CLI integration tests
//!
//! These tests run the binary against a scratch project and check exit codes
//! and the files it leaves behind.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Get the path to the sitepipe binary
fn sitepipe_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_sitepipe"))
}

fn run_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(sitepipe_binary())
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute sitepipe")
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn create_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "sitepipe.toml", "[project]\nname = \"cli-test\"\n");
    write(temp.path(), "src/templates/layouts/default.html", "<main>{{> body}}</main>\n");
    write(temp.path(), "src/index.html", "<h1>Hello</h1>\n");
    write(temp.path(), "src/assets/sass/main.sass", "body\n  margin: 0\n");
    write(temp.path(), "src/assets/js/main.js", "var greeting = 'hello';\n");
    temp
}

#[test]
fn test_build_writes_dist() {
    let project = create_project();
    let output = run_in(project.path(), &["build"]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Building cli-test"));
    let dist = project.path().join("dist");
    assert!(dist.join("index.html").is_file());
    assert!(dist.join("assets/css/main.css").is_file());
    assert!(dist.join("assets/css/main.min.css").is_file());
    assert!(dist.join("assets/js/main.js").is_file());
    assert!(dist.join("assets/js/main.min.js").is_file());
}

#[test]
fn test_build_from_subdirectory_finds_config() {
    let project = create_project();
    let nested = project.path().join("src/assets");
    let output = run_in(&nested, &["build"]);

    assert!(output.status.success());
    assert!(project.path().join("dist/index.html").is_file());
    assert!(!nested.join("dist").exists());
}

#[test]
fn test_leaf_task_runs_alone() {
    let project = create_project();
    let output = run_in(project.path(), &["js"]);

    assert!(output.status.success());
    assert!(project.path().join("dist/assets/js/main.min.js").is_file());
    assert!(!project.path().join("dist/index.html").exists());
    assert!(!project.path().join("dist/assets/css").exists());
}

#[test]
fn test_clean_removes_dist() {
    let project = create_project();
    write(project.path(), "dist/stale.html", "old");

    let output = run_in(project.path(), &["clean"]);
    assert!(output.status.success());
    assert!(!project.path().join("dist").exists());

    let again = run_in(project.path(), &["clean"]);
    assert!(again.status.success());
}

#[test]
fn test_unknown_task_exits_with_usage_error() {
    let project = create_project();
    let output = run_in(project.path(), &["deploy"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(!project.path().join("dist").exists());
}

#[test]
fn test_strict_turns_source_errors_into_failure() {
    let project = create_project();
    write(project.path(), "src/assets/sass/main.sass", "body\n  color: $nope\n");

    let lenient = run_in(project.path(), &["build"]);
    assert!(lenient.status.success());
    assert!(project.path().join("dist/index.html").is_file());

    let strict = run_in(project.path(), &["build", "--strict"]);
    assert_eq!(strict.status.code(), Some(1));
    assert!(!String::from_utf8_lossy(&strict.stderr).is_empty());
}

#[test]
fn test_invalid_config_exits_with_error() {
    let project = create_project();
    write(project.path(), "sitepipe.toml", "[server\n");

    let output = run_in(project.path(), &["build"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("sitepipe.toml"));
}

#[test]
fn test_explicit_config_sets_project_root() {
    let project = create_project();
    let elsewhere = TempDir::new().unwrap();
    let config = project.path().join("sitepipe.toml");

    let output = run_in(elsewhere.path(), &["build", "--config", config.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(project.path().join("dist/index.html").is_file());
    assert!(!elsewhere.path().join("dist").exists());
}
