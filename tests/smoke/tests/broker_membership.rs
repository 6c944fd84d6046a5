//! Smoke test: message broker cluster membership
//!
//! Every configured broker is running, and re-adding a member is refused
//! with the manager's "already in the cluster" message.

use smoke::{PollOptions, environment, require_harness};
use vigil_harness::brokers::{expect_join_rejected, list_brokers, wait_for_broker_count};

#[tokio::test]
async fn brokers_are_clustered_and_rejoin_is_refused() {
    require_harness!();
    let env = environment();
    if env.brokers().len() < 2 {
        eprintln!("skipping: scenario needs 2 brokers");
        return;
    }
    let settings = env.settings();
    let expected = env.brokers().len();

    let running =
        wait_for_broker_count(&env.broker_remotes(), expected, PollOptions::health(settings))
            .await
            .unwrap();
    eprintln!("running brokers: {running:?}");

    let listed = list_brokers(env.managers()[0].remote()).await.unwrap();
    assert_eq!(listed.len(), expected, "manager lists {listed:?}");

    let first = &env.brokers()[0];
    expect_join_rejected(env.brokers()[1].remote(), &first.name).await.unwrap();
}
