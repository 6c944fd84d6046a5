//! Fault injection against a single node: network partitions, service stops
//! and hard kills.
//!
//! All operations are best-effort remote commands with no retry. Whatever the
//! outcome, the remote's cached connection is reset afterwards: blocking or
//! unblocking traffic can leave a multiplexed session half-dead.

use crate::error::NetError;
use crate::firewall::Partition;
use crate::remote::Remote;

pub struct FaultInjector<'a> {
    remote: &'a dyn Remote,
}

impl<'a> FaultInjector<'a> {
    pub fn new(remote: &'a dyn Remote) -> Self {
        Self { remote }
    }

    /// Install DROP rules for every peer in `partition`, both directions.
    pub async fn partition(&self, partition: &Partition) -> Result<(), NetError> {
        let peers = partition.peers().count();
        tracing::info!(target_host = %partition.target, peers, "partitioning");
        let commands = partition.rules.iter().map(|r| r.add_command()).collect();
        self.apply(commands).await
    }

    /// Remove exactly the rules `partition` installed, in reverse order.
    pub async fn heal(&self, partition: &Partition) -> Result<(), NetError> {
        tracing::info!(target_host = %partition.target, "healing partition");
        let commands = partition.rules.iter().rev().map(|r| r.delete_command()).collect();
        self.apply(commands).await
    }

    /// Stop `unit`, then power the node off immediately.
    ///
    /// The session usually drops while `shutdown` runs; that disconnect is
    /// the expected outcome and is not reported as an error.
    pub async fn kill(&self, unit: &str) -> Result<(), NetError> {
        tracing::info!(host = %self.remote.host(), unit, "killing node");
        let result = self.kill_inner(unit).await;
        self.remote.reset().await;
        result
    }

    /// Shutdown is attempted even when stopping the unit failed; the first
    /// error is reported.
    async fn kill_inner(&self, unit: &str) -> Result<(), NetError> {
        let stopped = self.remote.run(&format!("sudo systemctl stop {unit}")).await;
        if let Err(e) = &stopped {
            tracing::warn!(host = %self.remote.host(), unit, "stop before kill failed: {e}");
        }
        let shutdown = match self.remote.run("sudo shutdown -h now").await {
            Err(e) if e.is_disconnect() => Ok(()),
            other => other.map(drop),
        };
        stopped.map(drop).and(shutdown)
    }

    pub async fn stop_service(&self, unit: &str) -> Result<(), NetError> {
        self.apply(vec![format!("sudo systemctl stop {unit}")]).await
    }

    pub async fn start_service(&self, unit: &str) -> Result<(), NetError> {
        self.apply(vec![format!("sudo systemctl start {unit}")]).await
    }

    /// Run every command, remembering the first failure, then reset the
    /// connection.
    async fn apply(&self, commands: Vec<String>) -> Result<(), NetError> {
        let mut first_err = None;
        for cmd in &commands {
            match self.remote.run(cmd).await {
                Ok(_) => tracing::info!(host = %self.remote.host(), "applied: {cmd}"),
                Err(e) => {
                    tracing::warn!(host = %self.remote.host(), "fault command failed: {cmd}: {e}");
                    if first_err.is_none() {
                        first_err = Some(e);
                    }
                }
            }
        }
        self.remote.reset().await;
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
