//! Integration tests for CLI wiring.
//!
//! These tests validate that the CLI is a thin adapter over the library
//! pipeline with proper error reporting and exit codes, and that a
//! disk-backed run produces the same results as the in-memory one.

use std::path::Path;
use std::process::Command;

use carve::cache::DiskCache;
use carve::Pipeline;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().expect("file path has a parent"))
        .expect("mkdir should succeed");
    std::fs::write(path, content).expect("write should succeed");
}

/// A small two-package module with a config carving out both packages.
fn fixture(root: &Path) {
    write(root, "go.mod", "module example.com/repo\n");
    write(
        root,
        "app/app.go",
        "package app\n\nimport \"example.com/repo/lib\"\n\nfunc Run() { lib.Do() }\n",
    );
    write(root, "lib/lib.go", "package lib\n\nfunc Do() {}\n");
    write(
        root,
        "carve.json",
        r#"{
  "splits": {
    "app": {"module_path": "split.com/app", "includes": ["app"]},
    "lib": {"module_path": "split.com/lib", "includes": ["lib"]}
  }
}
"#,
    );
}

#[test]
fn test_cli_check_succeeds() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    fixture(dir.path());

    let output = Command::new(env!("CARGO_BIN_EXE_carve"))
        .args(["check", "--config"])
        .arg(dir.path().join("carve.json"))
        .output()
        .expect("binary should run");

    assert!(
        output.status.success(),
        "check failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("is valid"));
}

#[test]
fn test_cli_check_reports_violations() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    write(dir.path(), "go.mod", "module example.com/repo\n");
    write(
        dir.path(),
        "app/app.go",
        "package app\n\nimport \"example.com/repo/lib\"\n\nfunc Run(_ lib.Thing) {}\n",
    );
    write(dir.path(), "lib/lib.go", "package lib\n\ntype Thing struct{}\n");
    write(
        dir.path(),
        "carve.json",
        r#"{"splits": {"app": {"module_path": "split.com/app", "includes": ["app"]}}}"#,
    );

    let output = Command::new(env!("CARGO_BIN_EXE_carve"))
        .args(["check", "--config"])
        .arg(dir.path().join("carve.json"))
        .output()
        .expect("binary should run");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not part of any configured split"));
    assert!(stderr.contains("lib.Thing"));
}

#[test]
fn test_cli_split_writes_work_tree() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    fixture(dir.path());
    let tree = dir.path().join("out");

    let output = Command::new(env!("CARGO_BIN_EXE_carve"))
        .args(["split", "--config"])
        .arg(dir.path().join("carve.json"))
        .arg("--work-tree")
        .arg(&tree)
        .arg("--dry-run")
        .output()
        .expect("binary should run");

    assert!(
        output.status.success(),
        "split failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let app = std::fs::read_to_string(tree.join("app/app.go")).expect("app should be emitted");
    assert!(app.contains("\"split.com/lib\""));
    assert!(tree.join("lib/lib.go").is_file());
    assert!(tree.join("app/README.md").is_file());
}

#[test]
fn test_cli_rejects_missing_config() {
    let dir = tempfile::tempdir().expect("tempdir should be created");

    let output = Command::new(env!("CARGO_BIN_EXE_carve"))
        .args(["check", "--config"])
        .arg(dir.path().join("nonexistent.json"))
        .output()
        .expect("binary should run");

    assert!(!output.status.success());
}

#[test]
fn test_disk_cache_pipeline_matches_memory_semantics() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    fixture(dir.path());

    let cache = DiskCache::open(dir.path()).expect("module should open");
    let config = carve::config::load(&dir.path().join("carve.json")).expect("config should load");
    let mut pipeline = Pipeline::new(&cache, &config).expect("config is valid");
    pipeline.check().expect("check should pass");

    let app = &pipeline.world().splits["app"];
    assert_eq!(app.split_deps.iter().collect::<Vec<_>>(), ["lib"]);
    assert!(app.residuals.is_empty());
}
