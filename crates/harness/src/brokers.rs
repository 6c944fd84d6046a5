//! Message-broker cluster membership, driven through the manager and broker
//! command-line tools over a remote shell.

use std::sync::Arc;

use serde::Deserialize;
use vigil_config::Broker;
use vigil_net::Remote;

use crate::error::{HarnessError, Result};
use crate::expect::{BROKER_ALREADY_JOINED, expect_error};
use crate::poll::{PollOptions, poll_endpoints};

/// Brokers registered with the manager, via `cfy cluster brokers list`.
pub async fn list_brokers(manager: &dyn Remote) -> Result<Vec<Broker>> {
    let output = manager.run("cfy cluster brokers list --json").await?;
    parse_broker_list(&output)
}

pub fn parse_broker_list(output: &str) -> Result<Vec<Broker>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Listing {
        Bare(Vec<Broker>),
        Wrapped { items: Vec<Broker> },
    }
    match serde_json::from_str(output) {
        Ok(Listing::Bare(brokers) | Listing::Wrapped { items: brokers }) => Ok(brokers),
        Err(e) => Err(HarnessError::Parse(format!("broker list: {e}"))),
    }
}

/// Join the broker on `remote` to the cluster through `join_node`.
pub async fn add_broker(remote: &dyn Remote, join_node: &str) -> Result<String> {
    tracing::info!(host = %remote.host(), join_node, "adding broker");
    Ok(remote.run(&format!("sudo cfy_manager brokers-add -j {join_node}")).await?)
}

/// Remove broker `name` from the cluster, running on any remaining member.
pub async fn remove_broker(remote: &dyn Remote, name: &str) -> Result<String> {
    tracing::info!(host = %remote.host(), broker = name, "removing broker");
    Ok(remote.run(&format!("sudo cfy_manager brokers-remove -r {name}")).await?)
}

/// Nodes the broker on `remote` sees as running cluster members.
pub async fn running_nodes(remote: &dyn Remote) -> Result<Vec<String>> {
    let output = remote.run("sudo rabbitmqctl cluster_status --formatter json").await?;
    parse_running_nodes(&output)
}

pub fn parse_running_nodes(output: &str) -> Result<Vec<String>> {
    #[derive(Deserialize)]
    struct ClusterStatus {
        running_nodes: Vec<String>,
    }
    serde_json::from_str::<ClusterStatus>(output)
        .map(|s| s.running_nodes)
        .map_err(|e| HarnessError::Parse(format!("rabbitmq cluster status: {e}")))
}

/// Wait until some broker reports exactly `expected` running members.
pub async fn wait_for_broker_count(
    brokers: &[Arc<dyn Remote>],
    expected: usize,
    opts: PollOptions,
) -> Result<Vec<String>> {
    let hit = poll_endpoints(
        &format!("{expected} running brokers"),
        brokers,
        |remote| running_nodes(remote.as_ref()),
        |nodes| nodes.len() == expected,
        opts,
    )
    .await?;
    Ok(hit.value)
}

/// Joining a broker that is already a member must be refused.
pub async fn expect_join_rejected(remote: &dyn Remote, join_node: &str) -> Result<()> {
    let result = add_broker(remote, join_node).await;
    expect_error("re-join broker", result, &BROKER_ALREADY_JOINED)
}
