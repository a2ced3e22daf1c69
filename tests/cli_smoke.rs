//! Behavioural smoke tests for the CLI entrypoint.

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

#[test]
fn cli_without_arguments_prints_usage_and_fails() {
    let mut cmd = Command::cargo_bin("flotilla").expect("binary built");
    cmd.assert().failure().stderr(contains("Usage"));
}

#[test]
fn up_without_configuration_reports_a_configuration_error() {
    let workdir = TempDir::new().expect("temp dir");
    let mut cmd = Command::cargo_bin("flotilla").expect("binary built");
    cmd.current_dir(workdir.path())
        .env_remove("FLOTILLA_PROJECT")
        .env_remove("FLOTILLA_ZONE")
        .env_remove("FLOTILLA_IMAGE")
        .env_remove("FLOTILLA_AUTH_TOKEN")
        .arg("up")
        .arg("1");
    cmd.assert()
        .failure()
        .stderr(contains("configuration error"));
}

#[test]
fn unknown_subcommands_are_rejected() {
    let mut cmd = Command::cargo_bin("flotilla").expect("binary built");
    cmd.arg("teleport");
    cmd.assert().failure().stderr(contains("unrecognized"));
}
