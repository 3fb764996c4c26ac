//! Integration tests for the `dvsportal` CLI binary.
//!
//! Argument parsing, help output, completions and config handling run
//! without a portal; the permit and setup tests talk to a wiremock server.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `dvsportal` binary with env isolation.
///
/// Clears all `DVSPORTAL_*` env vars and points the config directory at
/// `home` so tests never touch the user's real configuration.
fn dvsportal_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("dvsportal");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG")
        .env_remove("DVSPORTAL_PROFILE")
        .env_remove("DVSPORTAL_DEFAULT_PROFILE")
        .env_remove("DVSPORTAL_API_HOST")
        .env_remove("DVSPORTAL_IDENTIFIER")
        .env_remove("DVSPORTAL_PASSWORD")
        .env_remove("DVSPORTAL_OUTPUT")
        .env_remove("DVSPORTAL_TIMEOUT");
    cmd
}

fn config_file(home: &Path) -> PathBuf {
    home.join(".config").join("dvsportal").join("config.toml")
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

async fn portal() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/DVSWebAPI/api/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "Token": "abc123", "ErrorMessage": null })),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/DVSWebAPI/api/login/getbase"))
        .and(header("Authorization", "Token YWJjMTIz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Permits": [{
                "ZoneCode": "CENTRUM",
                "PermitMedias": [
                    {
                        "TypeID": 4,
                        "Code": "PV-1",
                        "LicensePlates": [ { "Value": "AB-123-C", "Name": "Grandma" } ],
                        "ActiveReservations": [{
                            "ReservationID": "res-1",
                            "ValidFrom": "2024-06-01T09:00:00",
                            "ValidUntil": "2024-06-01T17:30:00",
                            "LicensePlate": { "Value": "AB-123-C", "Name": "Grandma" }
                        }]
                    },
                    {
                        "TypeID": 1,
                        "Code": "PV-2",
                        "LicensePlates": [],
                        "ActiveReservations": []
                    }
                ]
            }]
        })))
        .mount(&server)
        .await;

    server
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = dvsportal_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = tempfile::tempdir().unwrap();
    dvsportal_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("setup")
            .and(predicate::str::contains("permits"))
            .and(predicate::str::contains("watch")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    dvsportal_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dvsportal"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    dvsportal_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    let home = tempfile::tempdir().unwrap();
    dvsportal_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_output_format() {
    let home = tempfile::tempdir().unwrap();
    let output = dvsportal_cmd(home.path())
        .args(["--output", "invalid", "permits"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("invalid"));
}

#[test]
fn test_permits_without_profile() {
    let home = tempfile::tempdir().unwrap();
    dvsportal_cmd(home.path())
        .arg("permits")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No profile configured"));
}

#[test]
fn test_unknown_profile() {
    let home = tempfile::tempdir().unwrap();
    dvsportal_cmd(home.path())
        .args(["--profile", "nope", "permits"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_setup_without_terminal_needs_flags() {
    let home = tempfile::tempdir().unwrap();
    dvsportal_cmd(home.path())
        .arg("setup")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--api-host"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_no_config() {
    let home = tempfile::tempdir().unwrap();
    dvsportal_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[defaults]"));
}

#[test]
fn test_config_path() {
    let home = tempfile::tempdir().unwrap();
    dvsportal_cmd(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_remove_requires_yes_without_terminal() {
    let home = tempfile::tempdir().unwrap();
    let path = config_file(home.path());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(
        &path,
        "default_profile = \"home\"\n\n[profiles.home]\napi_host = \"p.example\"\nidentifier = \"1\"\n",
    )
    .unwrap();

    dvsportal_cmd(home.path())
        .args(["config", "remove", "home"])
        .assert()
        .code(2);

    dvsportal_cmd(home.path())
        .args(["--yes", "config", "remove", "home"])
        .assert()
        .success();
    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(!raw.contains("[profiles.home]"));
}

// ── Against a portal ────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_permits_json_from_flags() {
    let server = portal().await;
    let home = tempfile::tempdir().unwrap();

    let output = dvsportal_cmd(home.path())
        .args([
            "--api-host",
            &server.uri(),
            "--identifier",
            "12345",
            "--password",
            "0000",
            "--output",
            "json",
            "permits",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", combined_output(&output));

    let sensors: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(sensors[0]["unique_id"], "dvsportal_PV-1_CENTRUM");
    assert_eq!(sensors[0]["name"], "Parking Permit PV-1 (CENTRUM)");
    assert_eq!(sensors[0]["state"], "AB-123-C");
    assert_eq!(sensors[0]["available"], true);
    assert_eq!(sensors[0]["attributes"]["reservation_valid_from"], "2024-06-01T09:00:00");
    assert_eq!(sensors[0]["attributes"]["reservation_license_plate_name"], "Grandma");
    assert_eq!(sensors[1]["state"], serde_json::Value::Null);
    assert!(sensors[1]["attributes"].get("reservation_id").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_permits_with_rejected_login_exits_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/DVSWebAPI/api/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "Token": null, "ErrorMessage": "Onjuiste pincode" })),
        )
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    dvsportal_cmd(home.path())
        .args([
            "--api-host",
            &server.uri(),
            "--identifier",
            "12345",
            "--password",
            "bad",
            "permits",
        ])
        .assert()
        .code(3);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_setup_then_permits_from_profile() {
    let server = portal().await;
    let home = tempfile::tempdir().unwrap();

    dvsportal_cmd(home.path())
        .args([
            "--api-host",
            &server.uri(),
            "--identifier",
            "12345",
            "--password",
            "0000",
            "setup",
            "--name",
            "home",
            "--plaintext",
        ])
        .assert()
        .success();

    let raw = std::fs::read_to_string(config_file(home.path())).unwrap();
    assert!(raw.contains("[profiles.home]"));
    assert!(raw.contains("identifier = \"12345\""));
    assert!(raw.contains("default_profile = \"home\""));

    dvsportal_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("password = \"****\"").and(predicate::str::contains("0000").not()));

    dvsportal_cmd(home.path())
        .args(["--password", "0000", "--output", "plain", "permits"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("dvsportal_PV-1_CENTRUM\tAB-123-C")
                .and(predicate::str::contains("dvsportal_PV-2_CENTRUM\tnone")),
        );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_config_default_output_is_used_without_flag() {
    let server = portal().await;
    let home = tempfile::tempdir().unwrap();
    let path = config_file(home.path());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(
        &path,
        format!(
            "default_profile = \"home\"\n\n[defaults]\noutput = \"plain\"\n\n[profiles.home]\napi_host = \"{}\"\nidentifier = \"12345\"\npassword = \"0000\"\n",
            server.uri()
        ),
    )
    .unwrap();

    dvsportal_cmd(home.path())
        .arg("permits")
        .assert()
        .success()
        .stdout(predicate::str::contains("dvsportal_PV-1_CENTRUM\tAB-123-C"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_setup_with_rejected_login_saves_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/DVSWebAPI/api/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let home = tempfile::tempdir().unwrap();

    dvsportal_cmd(home.path())
        .args([
            "--api-host",
            &server.uri(),
            "--identifier",
            "12345",
            "--password",
            "bad",
            "setup",
            "--plaintext",
        ])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Authentication failed"));

    assert!(!config_file(home.path()).exists());
}
