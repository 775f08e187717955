//! Integration tests for the `chklog` binary and its config loading.
//!
//! Config tests exercise `ChklogConfig` with real TOML files; the end-to-end tests
//! run the built binary against temporary logs.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const LOG: &str = "\
== make # 2013-04-06T12:00:00+09:00
vm.c:2012:5: warning: foo
== test-all # 2013-04-06T12:10:00+09:00
1000 tests, 2000 assertions, 3 failures, 1 errors, 0 skips
";

fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("chklog.toml");
    fs::write(&path, body).expect("should write config");
    path
}

fn chklog(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_chklog"))
        .args(args)
        .current_dir(cwd)
        .env_remove("CHKLOG_CANON_PROJECT")
        .env_remove("CHKLOG_CANON_RULES_DIR")
        .output()
        .expect("should run chklog binary")
}

#[tokio::test]
async fn test_config_load_valid_toml() {
    // Given: A valid config file
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = write_config(
        &temp_dir,
        r#"
[general]
log_level = "debug"
log_format = "json"

[canon]
project = "ruby"
display_name = "ruby-trunk-m32"
"#,
    );

    // When: Loading the config
    let config = chklog_core::config::ChklogConfig::load(&config_path)
        .await
        .expect("valid config should load successfully");

    // Then: Values come from the file, defaults fill the rest
    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.canon.effective_display_name(), "ruby-trunk-m32");
    assert!(config.canon.builtin_rules);
    assert!(!config.mark.elide.is_empty());
}

#[tokio::test]
async fn test_config_load_malformed_toml() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = write_config(&temp_dir, "[general\nlog_level = \"info\"\n");

    let result = chklog_core::config::ChklogConfig::load(&config_path).await;

    assert!(result.is_err(), "malformed TOML should fail to load");
}

#[tokio::test]
async fn test_config_load_invalid_elide_pattern() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = write_config(&temp_dir, "[mark]\nelide = ['(unclosed']\n");

    let err = chklog_core::config::ChklogConfig::load(&config_path)
        .await
        .err()
        .expect("invalid regex should fail validation");

    assert!(err.to_string().contains("mark.elide[0]"));
}

#[test]
fn test_canon_command_prints_canonical_text() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = write_config(&temp_dir, "[canon]\nproject = \"ruby\"\n");
    let log_path = temp_dir.path().join("build.log");
    fs::write(&log_path, LOG).expect("should write log");

    let output = chklog(
        &[
            "-c",
            config_path.to_str().expect("utf-8 path"),
            "canon",
            log_path.to_str().expect("utf-8 path"),
        ],
        temp_dir.path(),
    );

    assert!(output.status.success(), "canon should succeed: {output:?}");
    let stdout = String::from_utf8(output.stdout).expect("valid UTF-8");
    assert!(stdout.starts_with("== make # <time>\n"));
    assert!(stdout.contains("vm.c:<line_a>:5: warning: foo\n"));
    assert!(stdout.contains("1000 tests, <num> assertions, 3 failures, 1 errors, 0 skips\n"));
}

#[test]
fn test_status_command_json_output() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = write_config(&temp_dir, "[canon]\nproject = \"ruby\"\n");
    let log_path = temp_dir.path().join("build.log");
    fs::write(&log_path, LOG).expect("should write log");

    let output = chklog(
        &[
            "-c",
            config_path.to_str().expect("utf-8 path"),
            "--output",
            "json",
            "status",
            log_path.to_str().expect("utf-8 path"),
        ],
        temp_dir.path(),
    );

    assert!(output.status.success(), "status should succeed: {output:?}");
    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(parsed["project"].as_str(), Some("ruby"));
    assert_eq!(parsed["title_line"].as_str(), Some("3F1E ruby"));
    assert_eq!(parsed["markers"][0]["section"].as_str(), Some("test-all"));
    assert_eq!(
        parsed["markers"][0]["outcome"]["status"].as_str(),
        Some("failed")
    );
    assert_eq!(
        parsed["markers"][0]["outcome"]["code"].as_str(),
        Some("3F1E")
    );
}

#[test]
fn test_missing_explicit_config_exits_with_config_code() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let missing = temp_dir.path().join("absent.toml");

    let output = chklog(
        &[
            "-c",
            missing.to_str().expect("utf-8 path"),
            "config",
            "validate",
        ],
        temp_dir.path(),
    );

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_missing_log_exits_with_io_code() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = write_config(&temp_dir, "");
    let missing = temp_dir.path().join("absent.log");

    let output = chklog(
        &[
            "-c",
            config_path.to_str().expect("utf-8 path"),
            "status",
            missing.to_str().expect("utf-8 path"),
        ],
        temp_dir.path(),
    );

    assert_eq!(output.status.code(), Some(10));
}
