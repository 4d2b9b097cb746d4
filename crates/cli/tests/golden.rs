//! Golden tests for verifying JSON output format stability
//!
//! Run with: `cargo test -p rstore-cli --features golden`

#![cfg(feature = "golden")]

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Run the rstore binary with an isolated config directory
fn rstore(config_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rstore"))
        .args(args)
        .env("RSTORE_CONFIG_DIR", config_dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute rstore")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("Output should be valid JSON")
}

#[test]
fn test_validate_mixed_json() {
    let temp_dir = TempDir::new().unwrap();
    let output = rstore(
        temp_dir.path(),
        &["validate", "rsync:///data/{sample}.txt", "s3://bucket/key", "--json"],
    );

    assert_eq!(output.status.code(), Some(2));
    insta::assert_json_snapshot!("validate_mixed", stdout_json(&output));
}

#[test]
fn test_examples_json() {
    let temp_dir = TempDir::new().unwrap();
    let output = rstore(temp_dir.path(), &["examples", "--json"]);

    assert!(output.status.success());
    insta::assert_json_snapshot!("examples", stdout_json(&output));
}

#[test]
fn test_stat_json() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("data");
    std::fs::create_dir_all(&data).unwrap();
    std::fs::write(data.join("present.txt"), "hello").unwrap();

    let present = format!("rsync://{}/present.txt", data.display());
    let missing = format!("rsync://{}/missing.txt", data.display());
    let output = rstore(temp_dir.path(), &["stat", &present, &missing, "--json"]);

    assert!(output.status.success());
    let json = stdout_json(&output);
    let objects = json["objects"].as_array().unwrap();
    assert_eq!(objects.len(), 2);

    assert_eq!(objects[0]["query"], present.as_str());
    assert_eq!(objects[0]["exists"], true);
    assert_eq!(objects[0]["size_bytes"], 5);
    assert!(objects[0]["mtime"].is_string());

    assert_eq!(objects[1]["exists"], false);
    assert!(objects[1].get("size_bytes").is_none());
    assert!(objects[1].get("mtime").is_none());
}

#[test]
fn test_ls_json() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("samples");
    std::fs::create_dir_all(data.join("a")).unwrap();
    std::fs::write(data.join("a/reads.fq"), "@").unwrap();

    let query = format!("rsync://{}/{{sample}}/reads.fq", data.display());
    let output = rstore(temp_dir.path(), &["ls", &query, "--json"]);

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["wildcards"], true);
    assert_eq!(json["total_count"], 2);
    let candidates: Vec<String> = json["candidates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    let expected: Vec<String> = [data.join("a"), data.join("a/reads.fq")]
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    assert_eq!(candidates, expected);
}

#[test]
fn test_invalid_query_exit_code() {
    let temp_dir = TempDir::new().unwrap();
    let output = rstore(temp_dir.path(), &["stat", "http://example.com/x", "--json"]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("scheme must be rsync"), "{stderr}");
}
