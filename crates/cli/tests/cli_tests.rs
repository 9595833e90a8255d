//! CLI integration tests

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Run the binary with an isolated home directory and no inspect tool
fn clabtree(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_clabtree"))
        .args(args)
        .env("HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("CLAB_WORKSPACE")
        .env_remove("CLAB_BINARY")
        .env_remove("CLAB_RUNTIME")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let home = TempDir::new().unwrap();
    let output = clabtree(home.path(), &["--help"]);

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Browse containerlab labs"),
        "Should show app description"
    );
    assert!(stdout.contains("labs"), "Should show labs command");
    assert!(stdout.contains("tree"), "Should show tree command");
    assert!(stdout.contains("interfaces"), "Should show interfaces command");
    assert!(stdout.contains("watch"), "Should show watch command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let home = TempDir::new().unwrap();
    let output = clabtree(home.path(), &["--version"]);

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("clabtree"), "Should show binary name");
}

/// Test labs subcommand help
#[test]
fn test_labs_help() {
    let home = TempDir::new().unwrap();
    let output = clabtree(home.path(), &["labs", "--help"]);

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Labs help should succeed");
    assert!(
        stdout.contains("--deployed-only"),
        "Should show deployed-only option"
    );
}

/// Without an inspect tool the workspace files are still listed
#[test]
fn test_labs_fall_back_to_workspace_files() {
    let home = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    std::fs::create_dir_all(workspace.path().join("labs")).unwrap();
    std::fs::write(workspace.path().join("labs/demo.clab.yml"), "name: demo\n").unwrap();

    let output = clabtree(
        home.path(),
        &[
            "--workspace",
            workspace.path().to_str().unwrap(),
            "--binary",
            "/nonexistent/containerlab",
            "labs",
            "--format",
            "json",
        ],
    );

    assert!(output.status.success(), "Labs should succeed without the tool");

    let labs: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let labs = labs.as_array().unwrap();
    assert_eq!(labs.len(), 1);
    assert_eq!(labs[0]["label"], "demo.clab.yml");
    assert_eq!(labs[0]["deployed"], false);
    assert_eq!(labs[0]["lab_path"]["relative"], "labs/demo.clab.yml");
}

/// An empty workspace yields the placeholder record
#[test]
fn test_empty_workspace_placeholder() {
    let home = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();

    let output = clabtree(
        home.path(),
        &[
            "--workspace",
            workspace.path().to_str().unwrap(),
            "--binary",
            "/nonexistent/containerlab",
            "tree",
            "--format",
            "json",
        ],
    );

    assert!(output.status.success(), "Tree should succeed");

    let nodes: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(nodes[0]["label"], "No labs found");
    assert_eq!(nodes[0]["context_value"], "containerlabPlaceholder");
}

/// Deployed-only listing reports the tool failure
#[test]
fn test_deployed_only_fails_without_tool() {
    let home = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();

    let output = clabtree(
        home.path(),
        &[
            "--workspace",
            workspace.path().to_str().unwrap(),
            "--binary",
            "/nonexistent/containerlab",
            "labs",
            "--deployed-only",
        ],
    );

    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Deployed-only should fail");
    assert!(
        stderr.contains("Failed to list deployed labs"),
        "Should explain the failure"
    );
}

/// Format and tool settings are read from the config file
#[test]
fn test_config_file_default_format() {
    let home = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    std::fs::write(workspace.path().join("a.clab.yaml"), "name: a\n").unwrap();

    let config_dir = home.path().join(".config/clabtree");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.json"),
        r#"{"default_format": "json", "binary": "/nonexistent/containerlab"}"#,
    )
    .unwrap();

    let output = clabtree(
        home.path(),
        &["--workspace", workspace.path().to_str().unwrap(), "labs"],
    );

    assert!(output.status.success(), "Labs should succeed");

    let labs: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(labs[0]["label"], "a.clab.yaml");
}
