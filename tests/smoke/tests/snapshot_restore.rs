//! Smoke test: snapshot round trip
//!
//!   1. Create a snapshot on the leader and wait for `created`
//!   2. Download its archive and upload it under a new id
//!   3. Restore the uploaded snapshot and wait for the restore execution
//!   4. The cluster settles back to full strength
//!
//! Both snapshots are registered for deletion before they are created.

use smoke::{PollOptions, environment, require_harness};
use vigil_config::{SnapshotCreateRequest, SnapshotRestoreRequest, SnapshotStatus};
use vigil_harness::ClusterProbe;
use vigil_harness::snapshot::{
    create_snapshot, delete_snapshot, download_snapshot, restore_snapshot, upload_snapshot,
};

#[tokio::test]
async fn snapshot_download_upload_restore() {
    require_harness!();
    let mut env = environment();
    let settings = env.settings().clone();
    let settings = &settings;
    let apis = env.apis();
    let probe = ClusterProbe::new(&apis);
    let size = env.managers().len();

    let leader = probe.current_leader(PollOptions::health(settings)).await.unwrap();
    let api = env.manager(&leader.name).unwrap().api().clone();
    let id = format!("smoke-{}", std::process::id());
    let uploaded_id = format!("{id}-uploaded");
    for snapshot in [&id, &uploaded_id] {
        let (api, snapshot) = (api.clone(), snapshot.clone());
        env.cleanup().register(&format!("delete snapshot {snapshot}"), move || async move {
            delete_snapshot(&api, &snapshot).await
        });
    }
    let api = &api;

    let request = SnapshotCreateRequest { include_credentials: true, ..Default::default() };
    let opts = PollOptions::snapshot(settings);
    let created = create_snapshot(api, &id, &request, opts).await.unwrap();
    assert_eq!(created.status, SnapshotStatus::Created);

    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join(format!("{id}.zip"));
    let bytes = download_snapshot(api, &id, &archive).await.unwrap();
    assert!(bytes > 0, "empty snapshot archive");

    let uploaded = upload_snapshot(api, &uploaded_id, &archive, opts).await.unwrap();
    assert_eq!(uploaded.status, SnapshotStatus::Uploaded);

    let restore = SnapshotRestoreRequest { force: true, ..Default::default() };
    restore_snapshot(api, &uploaded_id, &restore, PollOptions::execution(settings)).await.unwrap();

    probe.wait_for_active(size, PollOptions::leader_election(settings)).await.unwrap();
    assert_eq!(env.teardown().await, 0, "snapshot cleanup failed");
}
