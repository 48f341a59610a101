//! End-to-end tests for the `lbx` binary

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn lbx(data_file: &Path) -> Command {
    let mut cmd = Command::cargo_bin("lbx").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("LBX_DATA_FILE")
        .arg("--data-file")
        .arg(data_file);
    cmd
}

fn write_database(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("db.json");
    let database = json!({
        "Default": { "Settings": { "Switch": "true", "x": "1" }, "Configs": { "Base": "https://a" } },
        "Weather": { "Settings": { "x": "2", "Ids": "1,2" } }
    });
    fs::write(&path, database.to_string()).unwrap();
    path
}

fn resolve_json(cmd: &mut Command) -> Value {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "lbx failed: {}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).unwrap()
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_cli_version() {
    Command::cargo_bin("lbx")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_cli_help() {
    Command::cargo_bin("lbx")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("resolve"));
}

#[test]
fn test_resolve_requires_a_name() {
    let dir = TempDir::new().unwrap();
    let database = write_database(&dir);

    lbx(&dir.path().join("box.dat"))
        .args(["resolve", "--key", "BoxJs", "--database"])
        .arg(&database)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--name"));
}

// ============================================================================
// Resolve Tests
// ============================================================================

#[test]
fn test_resolve_merges_and_coerces() {
    let dir = TempDir::new().unwrap();
    let database = write_database(&dir);
    let data_file = dir.path().join("box.dat");

    let resolved = resolve_json(
        lbx(&data_file)
            .args(["-f", "json", "resolve", "-k", "BoxJs", "-n", "Weather", "-d"])
            .arg(&database),
    );

    assert_eq!(
        resolved,
        json!({
            "Settings": { "Switch": true, "x": 2, "Ids": [1, 2] },
            "Configs": { "Base": "https://a" },
            "Caches": {}
        })
    );
}

#[test]
fn test_resolve_precedence_policies() {
    let dir = TempDir::new().unwrap();
    let database = write_database(&dir);
    let data_file = dir.path().join("box.dat");

    lbx(&data_file)
        .args(["set", "@BoxJs.Weather.Settings.x", "3"])
        .assert()
        .success();

    let cases = [("overall", 4), ("before-persisted", 3), ("after-profiles", 4)];
    for (precedence, expected) in cases {
        let resolved = resolve_json(
            lbx(&data_file)
                .args(["resolve", "-k", "BoxJs", "-n", "Weather", "-a", "x=4", "-p", precedence])
                .arg("-d")
                .arg(&database),
        );
        assert_eq!(resolved["Settings"]["x"], json!(expected), "precedence {precedence}");
    }
}

#[test]
fn test_resolve_accepts_json_argument() {
    let dir = TempDir::new().unwrap();
    let database = write_database(&dir);

    let resolved = resolve_json(
        lbx(&dir.path().join("box.dat"))
            .args(["resolve", "-k", "BoxJs", "-n", "Weather", "-a", r#"{"Nested.Mode":"on"}"#])
            .arg("-d")
            .arg(&database),
    );
    assert_eq!(resolved["Settings"]["Nested"], json!({ "Mode": "on" }));
}

#[test]
fn test_resolve_missing_database_fails() {
    let dir = TempDir::new().unwrap();

    lbx(&dir.path().join("box.dat"))
        .args(["resolve", "-k", "BoxJs", "-n", "Weather", "-d"])
        .arg(dir.path().join("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read database file"));
}

#[test]
fn test_resolved_log_level_switches_logging() {
    let dir = TempDir::new().unwrap();
    let database = dir.path().join("db.json");
    fs::write(&database, json!({ "Default": { "Settings": { "LogLevel": "debug" } } }).to_string())
        .unwrap();
    let data_file = dir.path().join("box.dat");

    lbx(&data_file)
        .args(["resolve", "-k", "BoxJs", "-n", "Weather", "-d"])
        .arg(&database)
        .assert()
        .success()
        .stderr(predicate::str::contains("applied log level from resolved settings"));

    lbx(&data_file)
        .args(["-l", "warn", "resolve", "-k", "BoxJs", "-n", "Weather", "-d"])
        .arg(&database)
        .assert()
        .success()
        .stderr(predicate::str::contains("applied log level").not());
}

#[test]
fn test_record_log_level_is_used_when_settings_have_none() {
    let dir = TempDir::new().unwrap();
    let database = write_database(&dir);
    let data_file = dir.path().join("box.dat");

    lbx(&data_file)
        .args(["set", "@BoxJs.LogLevel", "debug"])
        .assert()
        .success();

    lbx(&data_file)
        .args(["resolve", "-k", "BoxJs", "-n", "Weather", "-d"])
        .arg(&database)
        .assert()
        .success()
        .stderr(predicate::str::contains("applied log level from resolved settings"));
}

// ============================================================================
// Store Tests
// ============================================================================

#[test]
fn test_set_get_remove_roundtrip() {
    let dir = TempDir::new().unwrap();
    let data_file = dir.path().join("box.dat");

    lbx(&data_file)
        .args(["set", "@BoxJs.Weather.Caches.Token", "abc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Success:"));

    lbx(&data_file)
        .args(["-f", "json", "get", "@BoxJs.Weather"])
        .assert()
        .success()
        .stdout(predicate::str::diff("{\"Caches\":{\"Token\":\"abc\"}}\n"));

    lbx(&data_file)
        .args(["remove", "@BoxJs.Weather.Caches.Token"])
        .assert()
        .success();

    lbx(&data_file)
        .args(["-f", "json", "get", "@BoxJs.Weather.Caches.Token"])
        .assert()
        .success()
        .stdout(predicate::str::diff("null\n"));
}

#[test]
fn test_clear_empties_data_file() {
    let dir = TempDir::new().unwrap();
    let data_file = dir.path().join("box.dat");

    lbx(&data_file).args(["set", "a", "1"]).assert().success();
    lbx(&data_file).arg("clear").assert().success();

    let on_disk: Value = serde_json::from_str(&fs::read_to_string(&data_file).unwrap()).unwrap();
    assert_eq!(on_disk, json!({}));
}

#[test]
fn test_data_file_from_environment() {
    let dir = TempDir::new().unwrap();
    let data_file = dir.path().join("env.dat");

    Command::cargo_bin("lbx")
        .unwrap()
        .env("LBX_DATA_FILE", &data_file)
        .args(["set", "k", "v"])
        .assert()
        .success();

    assert!(data_file.exists());
}
