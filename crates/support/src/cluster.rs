use std::net::IpAddr;
use std::sync::Arc;

use vigil_config::{ClusterNode, HostSpec, Settings};

use crate::manager::FakeManager;
use crate::remote::TestRemote;

/// N fake managers that agree on one membership listing, each with an
/// in-memory shell.
///
/// The listing is republished to every manager whenever the leader or a
/// member's liveness changes, so cluster probes see a consistent view.
pub struct TestCluster {
    pub managers: Vec<FakeManager>,
    pub remotes: Vec<Arc<TestRemote>>,
    hosts: Vec<HostSpec>,
    leader: usize,
    down: Vec<bool>,
}

impl TestCluster {
    pub async fn start(size: usize) -> Self {
        assert!(size >= 1, "need at least 1 manager");
        let mut managers = Vec::with_capacity(size);
        let mut remotes = Vec::with_capacity(size);
        let mut hosts = Vec::with_capacity(size);
        for i in 1..=size {
            let public_ip: IpAddr = format!("10.0.0.{i}").parse().unwrap();
            let private_ip: IpAddr = format!("192.168.0.{i}").parse().unwrap();
            hosts.push(HostSpec { name: format!("manager-{i}"), public_ip, private_ip });
            remotes.push(Arc::new(TestRemote::new(public_ip)));
            managers.push(FakeManager::start().await);
        }
        let cluster = Self { managers, remotes, hosts, leader: 0, down: vec![false; size] };
        cluster.publish();
        cluster
    }

    pub fn hosts(&self) -> &[HostSpec] {
        &self.hosts
    }

    /// Settings naming every manager, with test-sized poll budgets.
    pub fn settings(&self) -> Settings {
        let mut settings = Settings { managers: self.hosts.clone(), ..Settings::default() };
        settings.timeouts.poll_interval = std::time::Duration::from_millis(20);
        settings.timeouts.leader_election = std::time::Duration::from_secs(5);
        settings.timeouts.health = std::time::Duration::from_secs(2);
        settings.timeouts.execution = std::time::Duration::from_secs(5);
        settings.timeouts.snapshot = std::time::Duration::from_secs(5);
        settings
    }

    pub fn leader(&self) -> usize {
        self.leader
    }

    /// Current membership as every live manager reports it.
    pub fn nodes(&self) -> Vec<ClusterNode> {
        self.hosts
            .iter()
            .enumerate()
            .map(|(i, host)| {
                let online = !self.down[i];
                ClusterNode {
                    name: host.name.clone(),
                    host_ip: host.private_ip.to_string(),
                    master: online && i == self.leader,
                    online,
                    status: Some(if online { "Active" } else { "Offline" }.to_owned()),
                }
            })
            .collect()
    }

    /// Make manager `index` the leader. The rest reject writes.
    pub fn elect(&mut self, index: usize) {
        self.leader = index;
        self.publish();
    }

    /// Take manager `index` off the network: its API answers 503 and peers
    /// list it offline.
    pub fn take_down(&mut self, index: usize) {
        self.down[index] = true;
        self.publish();
    }

    pub fn bring_up(&mut self, index: usize) {
        self.down[index] = false;
        self.remotes[index].power_on();
        self.publish();
    }

    fn publish(&self) {
        let nodes = self.nodes();
        for (i, manager) in self.managers.iter().enumerate() {
            manager.set_unavailable(self.down[i]);
            manager.set_standby(i != self.leader);
            manager.set_cluster_nodes(nodes.clone());
        }
    }
}
