//! CLI integration tests for kodb-util.
//!
//! These tests verify flag parsing, help output, action validation
//! and exit codes for configuration errors.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the kodb-util binary.
fn cmd() -> Command {
    Command::cargo_bin("kodb-util").unwrap()
}

fn config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    file
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_actions() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--clean"))
        .stdout(predicate::str::contains("--import"))
        .stdout(predicate::str::contains("--export-structure"))
        .stdout(predicate::str::contains("--export-data"))
        .stdout(predicate::str::contains("--export-views"))
        .stdout(predicate::str::contains("--export-procs"))
        .stdout(predicate::str::contains("--export-all"))
        .stdout(predicate::str::contains("--export-schema-document"));
}

#[test]
fn test_help_shows_overrides() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--db-user"))
        .stdout(predicate::str::contains("--db-pass"))
        .stdout(predicate::str::contains("--schema-dir"))
        .stdout(predicate::str::contains("--batch-size"))
        .stdout(predicate::str::contains("--create-manual-artifacts"))
        .stdout(predicate::str::contains("--skip-index-metadata"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("kodb-util"));
}

#[test]
fn test_config_default_path() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[default: kodb-util-config.yaml]"));
}

#[test]
fn test_logging_flag_defaults() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("[default: info]"));
}

// =============================================================================
// Action Validation Tests (Exit Code 2)
// =============================================================================

#[test]
fn test_no_action_prints_usage_and_fails() {
    cmd()
        .assert()
        .code(2)
        .stdout(predicate::str::contains("Usage:"))
        .stderr(predicate::str::contains("no actionable arguments provided"));
}

#[test]
fn test_clean_with_export_is_rejected() {
    cmd()
        .args(["--clean", "--export-data"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot perform both clean and export"));
}

#[test]
fn test_import_with_export_is_rejected() {
    cmd()
        .args(["--import", "--export-schema-document"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("redundant"));
}

#[test]
fn test_validation_happens_before_config_load() {
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "--clean", "--export-all"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("IO error").not());
}

// =============================================================================
// Config Error Tests
// =============================================================================

#[test]
fn test_missing_config_is_io_error() {
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "--clean"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("IO error"));
}

#[test]
fn test_invalid_yaml_exits_with_code_2() {
    let file = config_file("invalid: yaml: content: [\n");

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "--clean"])
        .assert()
        .code(2);
}

#[test]
fn test_missing_sections_exits_with_code_2() {
    let file = config_file("databaseConfig:\n  host: localhost\n");

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "--clean"])
        .assert()
        .code(2);
}

#[test]
fn test_no_databases_exits_with_code_2() {
    let file = config_file(
        "databaseConfig:\n  host: localhost\n  user: sa\ngenConfig:\n  schemaDir: ./OpenKO-db\n",
    );

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "--clean"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("at least one database"));
}

#[test]
fn test_unknown_log_format_is_rejected() {
    cmd()
        .args(["--clean", "--log-format", "xml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown log format"));
}

// =============================================================================
// Run Tests
// =============================================================================

#[test]
fn test_missing_schema_dir_is_rejected() {
    let file = config_file(
        "databaseConfig:\n  host: 127.0.0.1\n  port: 1\n  user: sa\n  password: x\n\
         genConfig:\n  schemaDir: ./no-such-OpenKO-db\n  databases:\n    - name: KN_online\n",
    );

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "--clean"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("schema directory"));
}

#[test]
fn test_unreachable_server_fails_the_database() {
    let schema_dir = tempfile::TempDir::new().unwrap();
    let file = config_file(&format!(
        "databaseConfig:\n  host: 127.0.0.1\n  port: 1\n  user: sa\n  password: x\n\
         genConfig:\n  schemaDir: '{}'\n  databases:\n    - name: KN_online\n",
        schema_dir.path().display()
    ));

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "--clean"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("1 of 1 databases failed"));
}
