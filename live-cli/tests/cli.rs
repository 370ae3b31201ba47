//! End-to-end checks of the livewatch binary that need no running API.

use assert_cmd::Command;
use predicates::prelude::*;

/// Base URL on a port nothing listens on.
fn dead_api() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/api", addr)
}

#[test]
fn help_lists_commands() {
    Command::cargo_bin("livewatch")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("fetch"))
        .stdout(predicate::str::contains("health"));
}

#[test]
fn health_fails_when_unreachable() {
    Command::cargo_bin("livewatch")
        .unwrap()
        .args(["--api", &dead_api(), "health"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("unreachable"));
}

#[test]
fn fetch_rejects_bad_since() {
    Command::cargo_bin("livewatch")
        .unwrap()
        .args(["--api", &dead_api(), "fetch", "--since", "yesterday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("RFC 3339"));
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = tempfile::TempDir::new().unwrap();
    Command::cargo_bin("livewatch")
        .unwrap()
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("health")
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.toml"));
}
