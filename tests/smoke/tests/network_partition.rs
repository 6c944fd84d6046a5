//! Smoke test: network partition
//!
//!   1. Isolate one standby from every other manager with iptables
//!   2. The rest of the cluster reports it inactive
//!   3. Heal the partition
//!   4. The full cluster is active again and every manager agrees on it
//!
//! Healing is registered as cleanup first, so a failed assertion does not
//! leave the firewall rules behind (unless CLOUDIFY_TEST_NO_CLEANUP is set).

use smoke::{PollOptions, environment, has_managers, require_harness};
use vigil_harness::{Api, ClusterProbe, HarnessError};
use vigil_net::FaultInjector;

#[tokio::test]
async fn isolated_standby_drops_out_and_rejoins() {
    require_harness!();
    let mut env = environment();
    if !has_managers(&env, 3) {
        return;
    }
    let settings = env.settings().clone();
    let size = env.managers().len();
    let apis = env.apis();
    let health = PollOptions::health(&settings);
    let election = PollOptions::leader_election(&settings);

    let leader = ClusterProbe::new(&apis).current_leader(health).await.unwrap();
    let target = env.managers().iter().find(|m| m.name != leader.name).unwrap().name.clone();
    let partition = env.isolate(&target).unwrap();

    let remote = env.manager(&target).unwrap().shared_remote();
    let rules = partition.clone();
    env.cleanup().register(&format!("heal {target}"), move || async move {
        FaultInjector::new(remote.as_ref()).heal(&rules).await?;
        Ok::<_, HarnessError>(())
    });

    env.manager(&target).unwrap().faults().partition(&partition).await.unwrap();

    let others: Vec<Api> =
        env.managers().iter().filter(|m| m.name != target).map(|m| m.api().clone()).collect();
    ClusterProbe::new(&others).wait_for_active(size - 1, election).await.unwrap();

    assert_eq!(env.teardown().await, 0, "heal failed");

    let probe = ClusterProbe::new(&apis);
    probe.wait_for_active(size, election).await.unwrap();
    probe.wait_for_agreement(size, election).await.unwrap();
}
