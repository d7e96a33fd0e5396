//! Tests for the org-registry binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("org-registry")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("migrate"))
        .stdout(predicate::str::contains("pending-count"));
}

#[test]
fn test_config_prints_effective_toml() {
    let dir = TempDir::new().unwrap();

    Command::cargo_bin("org-registry")
        .unwrap()
        .current_dir(dir.path())
        .env("ORG_REGISTRY__SERVER__BIND_ADDR", "0.0.0.0:9000")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[database]"))
        .stdout(predicate::str::contains("0.0.0.0:9000"));
}

#[test]
fn test_pending_count_on_fresh_database() {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}", dir.path().join("registry.db").display());

    Command::cargo_bin("org-registry")
        .unwrap()
        .current_dir(dir.path())
        .env("ORG_REGISTRY__DATABASE__URL", url)
        .env("RUST_LOG", "info")
        .arg("pending-count")
        .assert()
        .success()
        .stdout("0\n")
        .stderr(predicate::str::contains("Registry telemetry initialized"));
}
