//! Integration tests for the `dayzero` CLI binary.
//!
//! These tests cover argument parsing, help output, shell completions, the
//! offline manifest commands and error exit codes, all without a live
//! controller.
#![allow(clippy::unwrap_used)]

use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

const MANIFEST: &str = r#"
[topology]
supernet = "10.0.0.0/8"
zones = 8
zone_prefix = 11
sites_per_zone = 256
site_prefix = 22

[[subnets]]
name = "mgmt"
hosts = 50

[[subnets]]
name = "client"
hosts = 500

[[sites]]
name = "hq"
zone = 0
site = 0

[[sites]]
name = "branch"
zone = 1
site = 4
"#;

/// Build a [`Command`] for the `dayzero` binary with env isolation.
///
/// Clears all `DAYZERO_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn dayzero_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("dayzero");
    cmd.env("HOME", "/tmp/dayzero-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/dayzero-cli-test-nonexistent")
        .env_remove("RUST_LOG")
        .env_remove("DAYZERO_PROFILE")
        .env_remove("DAYZERO_HOST")
        .env_remove("DAYZERO_ORG")
        .env_remove("DAYZERO_API_KEY")
        .env_remove("DAYZERO_OUTPUT")
        .env_remove("DAYZERO_TIMEOUT");
    cmd
}

fn write_manifest(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("estate.toml");
    std::fs::write(&path, contents).unwrap();
    path
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = dayzero_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    dayzero_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("plan")
            .and(predicate::str::contains("zones"))
            .and(predicate::str::contains("verify"))
            .and(predicate::str::contains("provision")),
    );
}

#[test]
fn test_version_flag() {
    dayzero_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dayzero"));
}

#[test]
fn test_unknown_subcommand() {
    dayzero_cmd().arg("frobnicate").assert().code(2);
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    dayzero_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    dayzero_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dayzero"));
}

// ── Offline manifest commands ───────────────────────────────────────

#[test]
fn test_plan_table() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(&dir, MANIFEST);

    dayzero_cmd()
        .arg("plan")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("hq")
                .and(predicate::str::contains("10.0.0.0/22"))
                .and(predicate::str::contains("10.0.2.0/23"))
                .and(predicate::str::contains("10.32.16.0/22")),
        );
}

#[test]
fn test_plan_plain() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(&dir, MANIFEST);

    dayzero_cmd()
        .args(["plan", "-o", "plain"])
        .arg(&manifest)
        .assert()
        .success()
        .stdout("hq\t10.0.0.0/22\nbranch\t10.32.16.0/22\n");
}

#[test]
fn test_plan_json_reports_gateways() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(&dir, MANIFEST);

    let output = dayzero_cmd()
        .args(["plan", "-o", "json"])
        .arg(&manifest)
        .output()
        .unwrap();
    assert!(output.status.success());

    let sites: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let client = &sites[0]["plan"]["subnets"][1];
    assert_eq!(client["name"], "client");
    assert_eq!(client["block"], "10.0.2.0/23");
    assert_eq!(client["gateway"], "10.0.2.1");
    assert_eq!(client["usable_hosts"], 510);
}

#[test]
fn test_plan_overflow_fails_with_report() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(
        &dir,
        &format!("{MANIFEST}\n[[sites]]\nname = \"faraway\"\nzone = 9\nsite = 0\n"),
    );

    let output = dayzero_cmd()
        .args(["plan", "-o", "json"])
        .arg(&manifest)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let sites: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(sites[2]["name"], "faraway");
    assert_eq!(sites[2]["overflow"]["level"], "zone");
    assert_eq!(sites[2]["overflow"]["kind"], "exhausted");
    assert!(sites[2].get("plan").is_none());
    assert!(combined_output(&output).contains("cannot be allocated"));
}

#[test]
fn test_plan_missing_manifest() {
    let dir = tempfile::tempdir().unwrap();
    dayzero_cmd()
        .arg("plan")
        .arg(dir.path().join("missing.toml"))
        .assert()
        .failure();
}

#[test]
fn test_plan_rejects_duplicate_slots() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(
        &dir,
        &format!("{MANIFEST}\n[[sites]]\nname = \"twin\"\nzone = 0\nsite = 0\n"),
    );

    dayzero_cmd()
        .arg("plan")
        .arg(&manifest)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("twin"));
}

#[test]
fn test_zones_plain() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(&dir, MANIFEST);

    let output = dayzero_cmd()
        .args(["zones", "-o", "plain"])
        .arg(&manifest)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let blocks: Vec<_> = stdout.lines().collect();
    assert_eq!(blocks.len(), 8);
    assert_eq!(blocks[0], "10.0.0.0/11");
    assert_eq!(blocks[7], "10.224.0.0/11");
}

// ── Controller commands without a controller ────────────────────────

#[test]
fn test_verify_without_credentials() {
    let output = dayzero_cmd().arg("verify").output().unwrap();
    assert_eq!(output.status.code(), Some(3), "Expected auth exit code 3");
    let text = combined_output(&output);
    assert!(
        text.contains("No credentials"),
        "Expected credential error:\n{text}"
    );
}

#[test]
fn test_verify_rejects_malformed_org() {
    dayzero_cmd()
        .args(["verify", "--api-key", "token", "--org", "not-a-uuid"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not a UUID"));
}

#[test]
fn test_unknown_profile() {
    dayzero_cmd()
        .args(["verify", "--profile", "nope"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_provision_requires_yes_when_not_interactive() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(&dir, MANIFEST);

    dayzero_cmd()
        .args(["provision", "--api-key", "token"])
        .arg(&manifest)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--yes"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path() {
    dayzero_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_use_unknown_profile() {
    dayzero_cmd()
        .args(["config", "use", "ghost"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("ghost"));
}
