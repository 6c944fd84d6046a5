//! Smoke test: database replication
//!
//! One database node (the primary) lists every other node as a replica,
//! exactly one of them synchronous. Stopping the database on the primary
//! must leave a new primary with one fewer replica.

use smoke::{PollOptions, environment, has_managers, require_harness};
use vigil_harness::HarnessError;
use vigil_harness::replication::wait_for_topology;
use vigil_net::FaultInjector;

#[tokio::test]
async fn primary_lists_one_sync_replica() {
    require_harness!();
    let env = environment();
    if !has_managers(&env, 2) {
        return;
    }
    let settings = env.settings();
    let nodes = env.manager_remotes();

    let health = PollOptions::health(settings);
    let hit = wait_for_topology(&nodes, &settings.database, nodes.len() - 1, health).await.unwrap();
    eprintln!("primary is {}: {:?}", nodes[hit.index].host(), hit.value);
}

#[tokio::test]
async fn stopping_the_primary_promotes_a_replica() {
    require_harness!();
    let mut env = environment();
    if !has_managers(&env, 3) {
        return;
    }
    let settings = env.settings().clone();
    let nodes = env.manager_remotes();
    let unit = settings.services.database.clone();

    let health = PollOptions::health(&settings);
    let before =
        wait_for_topology(&nodes, &settings.database, nodes.len() - 1, health).await.unwrap();
    let primary = nodes[before.index].clone();

    let remote = primary.clone();
    let restart = unit.clone();
    env.cleanup().register(&format!("start {unit} on {}", primary.host()), move || async move {
        FaultInjector::new(remote.as_ref()).start_service(&restart).await?;
        Ok::<_, HarnessError>(())
    });
    FaultInjector::new(primary.as_ref()).stop_service(&unit).await.unwrap();

    let survivors: Vec<_> = nodes.iter().filter(|n| n.host() != primary.host()).cloned().collect();
    let election = PollOptions::leader_election(&settings);
    let replicas = survivors.len() - 1;
    let after =
        wait_for_topology(&survivors, &settings.database, replicas, election).await.unwrap();
    assert_ne!(survivors[after.index].host(), primary.host());

    assert_eq!(env.teardown().await, 0, "database restart failed");
}
