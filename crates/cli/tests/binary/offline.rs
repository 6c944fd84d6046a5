use predicates::prelude::*;

use crate::harness::vigil_cmd;

#[test]
fn no_args_shows_help() {
    vigil_cmd().assert().failure().code(2).stderr(predicate::str::contains("Usage"));
}

#[test]
fn version_flag() {
    vigil_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn help_lists_commands() {
    vigil_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("cluster"))
        .stdout(predicate::str::contains("partition"))
        .stdout(predicate::str::contains("load"));
}

#[test]
fn unknown_subcommand() {
    vigil_cmd().arg("bogus").assert().failure().code(2);
}

#[test]
fn partition_requires_a_peer() {
    vigil_cmd().args(["partition", "--host", "10.0.0.1"]).assert().failure().code(2);
}

#[test]
fn missing_manager_is_a_usage_error() {
    vigil_cmd()
        .arg("status")
        .assert()
        .failure()
        .code(64)
        .stderr(predicate::str::contains("--manager"));
}

#[test]
fn invalid_timeout_env_is_a_usage_error() {
    vigil_cmd()
        .env("VIGIL_HEALTH_TIMEOUT_MS", "soon")
        .args(["--manager", "http://127.0.0.1:1", "status"])
        .assert()
        .failure()
        .code(64)
        .stderr(predicate::str::contains("VIGIL_HEALTH_TIMEOUT_MS"));
}

#[test]
fn status_connection_refused() {
    vigil_cmd()
        .args(["--manager", "http://127.0.0.1:1", "status"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("connection refused"));
}

#[test]
fn wait_active_times_out_against_dead_endpoint() {
    vigil_cmd()
        .args(["cluster", "wait-active", "--expect", "3", "--timeout-ms", "200"])
        .args(["--endpoint", "http://127.0.0.1:1"])
        .assert()
        .failure()
        .code(5)
        .stderr(predicate::str::contains("timed out"));
}

#[test]
fn manager_address_from_env() {
    vigil_cmd()
        .env("VIGIL_MANAGER", "http://127.0.0.1:1")
        .arg("status")
        .assert()
        .failure()
        .code(2);
}
