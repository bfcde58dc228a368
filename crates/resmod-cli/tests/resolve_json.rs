//! Integration tests for `resmod --json resolve|paths|which|version`.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::{tempdir, TempDir};

fn cargo_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO"));
    cmd.args(["run", "-p", "resmod-cli", "--bin", "resmod", "--"]);
    cmd
}

fn fixtures() -> TempDir {
    let dir = tempdir().unwrap();
    let plugin = dir.path().join("generate-node");
    fs::create_dir_all(&plugin).unwrap();
    fs::write(plugin.join("generate.js"), "module.exports = function() {};").unwrap();
    fs::write(plugin.join("package.json"), r#"{"name":"generate-node"}"#).unwrap();
    dir
}

fn run_json(cwd: &Path, args: &[&str]) -> (Output, serde_json::Value) {
    let output = cargo_bin()
        .arg("--json")
        .arg("--cwd")
        .arg(cwd)
        .args(args)
        .output()
        .expect("Failed to run resmod");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("stdout should be valid JSON ({e}): {stdout}"));
    (output, json)
}

#[test]
fn test_resolve_json() {
    let dir = fixtures();
    let (output, json) = run_json(
        dir.path(),
        &["resolve", "-m", "generate", "-f", "generate.js", "--no-global"],
    );

    assert!(output.status.success());
    assert_eq!(json["schema_version"].as_u64(), Some(1));

    let descriptors = json["descriptors"].as_array().unwrap();
    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0]["name"], "generate-node");
    assert_eq!(descriptors[0]["alias"], "node");
    assert!(descriptors[0]["path"]
        .as_str()
        .unwrap()
        .ends_with("generate.js"));
    assert!(json["failures"].as_array().unwrap().is_empty());
}

#[test]
fn test_resolve_required_companion_fails() {
    let dir = fixtures();
    let (output, json) = run_json(
        dir.path(),
        &[
            "resolve",
            "-m",
            "nonexistent-module-xyz",
            "-f",
            "generate.js",
            "--no-global",
            "--require-companion",
        ],
    );

    assert!(!output.status.success());
    let failures = json["failures"].as_array().unwrap();
    assert_eq!(failures.len(), 1);
    assert!(failures[0]["error"]
        .as_str()
        .unwrap()
        .contains("nonexistent-module-xyz"));
}

#[test]
fn test_resolve_with_options_file() {
    let dir = fixtures();
    let options = dir.path().join("resmod.json");
    fs::write(
        &options,
        r#"{"module":"generate","config_file":"generate.js","include_global_paths":false,"matcher":"verb-*"}"#,
    )
    .unwrap();

    let (output, json) = run_json(
        dir.path(),
        &["--options", options.to_str().unwrap(), "resolve"],
    );
    assert!(output.status.success());
    assert!(json["descriptors"].as_array().unwrap().is_empty());
}

#[test]
fn test_resolve_without_config_name_fails() {
    let dir = fixtures();
    let output = cargo_bin()
        .arg("--cwd")
        .arg(dir.path())
        .args(["resolve", "--no-global"])
        .output()
        .expect("Failed to run resmod");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config_name"), "stderr: {stderr}");
}

#[test]
fn test_paths_json_dedups() {
    let dir = fixtures();
    let cwd = dir.path().to_str().unwrap();
    let (output, json) = run_json(
        dir.path(),
        &["paths", "--path", cwd, "--path", cwd, "--no-global"],
    );

    assert!(output.status.success());
    let dirs = json["dirs"].as_array().unwrap();
    assert_eq!(dirs.len(), 1);
    assert_eq!(dirs[0]["exists"], true);
}

#[test]
fn test_which_json() {
    let dir = fixtures();
    let module = dir.path().join("node_modules").join("generate");
    fs::create_dir_all(&module).unwrap();
    fs::write(module.join("package.json"), r#"{"name":"generate","version":"0.14.0"}"#).unwrap();
    fs::write(module.join("index.js"), "").unwrap();

    let (output, json) = run_json(dir.path(), &["which", "generate", "--no-global"]);
    assert!(output.status.success());
    assert_eq!(json["found"], true);
    assert_eq!(json["version"], "0.14.0");

    let (_, json) = run_json(dir.path(), &["which", "nonexistent-module-xyz", "--no-global"]);
    assert_eq!(json["found"], false);
}

#[test]
fn test_version_json() {
    let dir = tempdir().unwrap();
    let (output, json) = run_json(dir.path(), &["version"]);
    assert!(output.status.success());
    assert!(json["version"].as_str().is_some_and(|v| !v.is_empty()));
}
