use std::process::Stdio;
use std::time::Duration;

use predicates::prelude::*;
use vigil_config::SnapshotStatus;
use vigil_support::{FakeManager, TestCluster};

use crate::harness::{stdout_json, vigil_for, vigil_json, vigil_process};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn status_human_and_json() {
    let fake = FakeManager::start().await;

    vigil_for(&fake)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("MANAGER:"))
        .stdout(predicate::str::contains("healthy"));

    let assert = vigil_for(&fake).args(["--json", "status"]).assert().success();
    let json = stdout_json(assert.get_output());
    assert_eq!(json["status"]["status"], "OK");
    assert!(json.get("version").is_some(), "missing 'version' key: {json}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn wrong_password_exits_with_api_error() {
    let fake = FakeManager::start().await;

    vigil_for(&fake)
        .args(["--password", "nope", "status"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("HTTP 401"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cluster_nodes_and_leader() {
    let cluster = TestCluster::start(3).await;

    let assert = vigil_json(&cluster).args(["cluster", "nodes"]).assert().success();
    let json = stdout_json(assert.get_output());
    assert_eq!(json.as_array().map(Vec::len), Some(3));

    vigil_for(&cluster.managers[1])
        .args(["cluster", "leader"])
        .assert()
        .success()
        .stdout(predicate::str::contains("manager-1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn wait_active_polls_every_endpoint() {
    let mut cluster = TestCluster::start(3).await;
    cluster.take_down(0);

    let mut cmd = vigil_json(&cluster);
    cmd.args(["cluster", "wait-active", "--expect", "2"]);
    for fake in &cluster.managers {
        cmd.args(["--endpoint", &fake.url()]);
    }
    let json = stdout_json(cmd.assert().success().get_output());
    assert_eq!(json["active"], 2);
    assert_eq!(json["endpoint"], cluster.managers[1].url());

    vigil_json(&cluster)
        .args(["cluster", "wait-active", "--expect", "3", "--timeout-ms", "200"])
        .args(["--endpoint", &cluster.managers[1].url()])
        .assert()
        .failure()
        .code(5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn snapshot_create_wait_then_list() {
    let fake = FakeManager::start().await;

    vigil_for(&fake)
        .args(["snapshot", "create", "snap-1", "--wait"])
        .assert()
        .success()
        .stdout(predicate::str::contains("snapshot snap-1 created"));

    let assert = vigil_for(&fake).args(["--json", "snapshot", "list"]).assert().success();
    let json = stdout_json(assert.get_output());
    assert_eq!(json[0]["id"], "snap-1");
    assert_eq!(json[0]["status"], "created");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_snapshot_exits_with_harness_error() {
    let fake = FakeManager::start().await;
    fake.script_snapshots(vec![SnapshotStatus::Creating, SnapshotStatus::Failed], "disk full");

    vigil_for(&fake)
        .args(["snapshot", "create", "snap-1", "--wait"])
        .assert()
        .failure()
        .code(5)
        .stderr(predicate::str::contains("disk full"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn restoring_missing_snapshot_is_not_found() {
    let fake = FakeManager::start().await;

    vigil_for(&fake)
        .args(["snapshot", "restore", "ghost"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("HTTP 404"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn standby_rejects_snapshot_creation() {
    let cluster = TestCluster::start(2).await;

    vigil_for(&cluster.managers[1])
        .args(["snapshot", "create", "snap-1"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("not the active manager"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn load_runs_until_stop_file_appears() {
    let fake = FakeManager::start().await;
    let dir = tempfile::tempdir().unwrap();
    let stop = dir.path().join("stop");

    let mut cmd = vigil_process(&fake);
    cmd.args(["--json", "load", "--deployment", "dep-1", "--workflow", "install"])
        .arg("--stop-file")
        .arg(&stop)
        .args(["--interval-ms", "10"])
        .stdout(Stdio::piped());
    let child = cmd.spawn().unwrap();

    let started = tokio::time::Instant::now();
    while fake.execution_count() < 2 && started.elapsed() < Duration::from_secs(10) {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    std::fs::write(&stop, b"stop").unwrap();

    let output = tokio::task::spawn_blocking(move || child.wait_with_output()).await.unwrap();
    let output = output.unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert!(json["iterations"].as_u64().unwrap() >= 2, "{json}");
    assert_eq!(json["failures"], 0);
}
