use std::sync::Arc;
use std::time::Duration;

use vigil_harness::{Api, Environment, ManagerHandle, PollOptions};
use vigil_support::TestCluster;

/// Environment whose managers are the cluster's fakes and in-memory shells.
pub fn environment(cluster: &TestCluster) -> Environment {
    let managers = cluster
        .hosts()
        .iter()
        .zip(&cluster.managers)
        .zip(&cluster.remotes)
        .map(|((host, fake), remote)| {
            let api = Api::new(&fake.url(), fake.credentials());
            ManagerHandle::new(host, api, remote.clone() as Arc<dyn vigil_net::Remote>)
        })
        .collect();
    Environment::with_hosts(cluster.settings(), managers, Vec::new())
}

pub fn quick() -> PollOptions {
    PollOptions::new(Duration::from_secs(5), Duration::from_millis(20))
}

pub fn short() -> PollOptions {
    PollOptions::new(Duration::from_millis(300), Duration::from_millis(20))
}
