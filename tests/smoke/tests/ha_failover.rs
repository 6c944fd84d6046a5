//! Smoke test: manager failover
//!
//!   1. All managers report the full cluster active
//!   2. Standbys refuse writes
//!   3. Kill the leader's VM (stop the REST service, then power off)
//!   4. The survivors elect a new leader and report one fewer active member
//!
//! The killed VM stays down; reprovision it before the next run.

use smoke::{PollOptions, environment, has_managers, require_harness};
use vigil_config::SnapshotCreateRequest;
use vigil_harness::expect::{NOT_ACTIVE_MANAGER, expect_error};
use vigil_harness::{Api, ClusterProbe};

#[tokio::test]
async fn standby_managers_reject_writes() {
    require_harness!();
    let env = environment();
    if !has_managers(&env, 2) {
        return;
    }
    let apis = env.apis();
    let health = PollOptions::health(env.settings());
    let leader = ClusterProbe::new(&apis).current_leader(health).await.unwrap();

    for standby in env.managers().iter().filter(|m| m.name != leader.name) {
        let result = standby
            .api()
            .snapshots_create("smoke-standby-write", &SnapshotCreateRequest::default())
            .await
            .map_err(Into::into);
        expect_error("snapshot on standby", result, &NOT_ACTIVE_MANAGER).unwrap();
    }
}

#[tokio::test]
async fn killing_the_leader_elects_a_new_one() {
    require_harness!();
    let env = environment();
    if !has_managers(&env, 3) {
        return;
    }
    let settings = env.settings().clone();
    let size = env.managers().len();
    let apis = env.apis();

    let probe = ClusterProbe::new(&apis);
    probe.wait_for_active(size, PollOptions::health(&settings)).await.unwrap();
    let old = probe.current_leader(PollOptions::health(&settings)).await.unwrap();

    let victim = env.manager(&old.name).expect("leader is a configured manager");
    victim.faults().kill(&settings.services.manager).await.unwrap();

    let survivors: Vec<Api> =
        env.managers().iter().filter(|m| m.name != old.name).map(|m| m.api().clone()).collect();
    let probe = ClusterProbe::new(&survivors);
    let election = PollOptions::leader_election(&settings);
    let new = probe.wait_for_leader(Some(&old.name), election).await.unwrap();
    assert_ne!(new.name, old.name);

    let hit = probe.wait_for_active(size - 1, election).await.unwrap();
    eprintln!("{} settled after {} round(s)", survivors[hit.index].base_url(), hit.rounds);
}
