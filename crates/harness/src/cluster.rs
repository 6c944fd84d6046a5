//! Cluster membership checks.
//!
//! `count_active` reads the manager's cluster status. Structured JSON is
//! preferred; for bodies that are not recognisable JSON it falls back to
//! counting `Active` markers in the raw text, which older managers emitted.

use std::collections::BTreeSet;

use serde_json::Value;
use vigil_config::ClusterNode;

use crate::client::Api;
use crate::error::{HarnessError, Result};
use crate::poll::{Hit, PollOptions, poll_endpoints, poll_until};

/// Marker counted, case-sensitively, when the status body is not structured.
/// Lowercase `inactive` must not count.
pub const ACTIVE_MARKER: &str = "Active";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountSource {
    Structured,
    TextScan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveCount {
    pub count: usize,
    pub source: CountSource,
}

/// Number of active members reported by a cluster status body.
///
/// Accepts a JSON array of members, an `{"items": [...]}` list, or a
/// `{"nodes": {name: member}}` map. A member is active when its `status` is
/// `active` (any case), or, lacking a status, when `online` is true.
pub fn count_active(raw: &str) -> ActiveCount {
    if let Ok(value) = serde_json::from_str::<Value>(raw)
        && let Some(members) = members(&value)
    {
        let count = members.into_iter().filter(|m| is_active(m)).count();
        return ActiveCount { count, source: CountSource::Structured };
    }
    tracing::debug!("cluster status is not structured, scanning for {ACTIVE_MARKER:?}");
    ActiveCount { count: raw.matches(ACTIVE_MARKER).count(), source: CountSource::TextScan }
}

fn members(value: &Value) -> Option<Vec<&Value>> {
    match value {
        Value::Array(items) => Some(items.iter().collect()),
        Value::Object(map) => match (map.get("items"), map.get("nodes")) {
            (Some(Value::Array(items)), _) => Some(items.iter().collect()),
            (_, Some(Value::Object(nodes))) => Some(nodes.values().collect()),
            _ => None,
        },
        _ => None,
    }
}

fn is_active(member: &Value) -> bool {
    match member.get("status").and_then(Value::as_str) {
        Some(status) => status.eq_ignore_ascii_case("active"),
        None => member.get("online").and_then(Value::as_bool).unwrap_or(false),
    }
}

/// True iff the status body reports exactly `expected` active members.
pub fn expect_active(raw: &str, expected: usize) -> bool {
    count_active(raw).count == expected
}

/// The single master in a listing. `None` when there is no master or more
/// than one.
pub fn leader(nodes: &[ClusterNode]) -> Option<&ClusterNode> {
    let mut masters = nodes.iter().filter(|n| n.master);
    match (masters.next(), masters.next()) {
        (Some(m), None) => Some(m),
        _ => None,
    }
}

/// True when every listing names the same set of members.
pub fn all_agree(listings: &[Vec<ClusterNode>]) -> bool {
    let names = |nodes: &Vec<ClusterNode>| -> BTreeSet<String> {
        nodes.iter().map(|n| n.name.clone()).collect()
    };
    let mut iter = listings.iter().map(names);
    match iter.next() {
        Some(first) => iter.all(|other| other == first),
        None => true,
    }
}

/// Cluster-level waits over a set of manager endpoints.
pub struct ClusterProbe<'a> {
    managers: &'a [Api],
}

impl<'a> ClusterProbe<'a> {
    pub fn new(managers: &'a [Api]) -> Self {
        Self { managers }
    }

    /// Wait until some manager reports exactly `expected` active members.
    pub async fn wait_for_active(&self, expected: usize, opts: PollOptions) -> Result<Hit<String>> {
        poll_endpoints(
            &format!("{expected} active cluster members"),
            self.managers,
            |api| api.cluster_status(),
            |raw| expect_active(raw, expected),
            opts,
        )
        .await
    }

    /// Wait for a single online master, optionally one other than `exclude`
    /// (the name of a node that was just killed).
    pub async fn wait_for_leader(
        &self,
        exclude: Option<&str>,
        opts: PollOptions,
    ) -> Result<ClusterNode> {
        let what = match exclude {
            Some(name) => format!("a leader other than {name}"),
            None => "a leader".to_owned(),
        };
        let hit = poll_endpoints(
            &what,
            self.managers,
            |api| api.cluster_nodes(),
            |nodes| {
                leader(nodes).is_some_and(|m| m.online && exclude.is_none_or(|ex| m.name != ex))
            },
            opts,
        )
        .await?;
        leader(&hit.value)
            .cloned()
            .ok_or_else(|| HarnessError::Topology("leader vanished from listing".to_owned()))
    }

    pub async fn current_leader(&self, opts: PollOptions) -> Result<ClusterNode> {
        self.wait_for_leader(None, opts).await
    }

    /// Wait until some manager lists exactly `size` members.
    pub async fn wait_for_size(&self, size: usize, opts: PollOptions) -> Result<Vec<ClusterNode>> {
        let hit = poll_endpoints(
            &format!("a cluster of {size}"),
            self.managers,
            |api| api.cluster_nodes(),
            |nodes| nodes.len() == size,
            opts,
        )
        .await?;
        Ok(hit.value)
    }

    /// Wait until every reachable manager lists the same `size` members.
    /// Unreachable managers are skipped; at least one must answer.
    pub async fn wait_for_agreement(
        &self,
        size: usize,
        opts: PollOptions,
    ) -> Result<Vec<ClusterNode>> {
        let hit = poll_until(
            &format!("all managers to agree on {size} members"),
            || self.listings(),
            |listings| {
                !listings.is_empty()
                    && all_agree(listings)
                    && listings.iter().all(|l| l.len() == size)
            },
            opts,
        )
        .await?;
        Ok(hit.value.into_iter().next().unwrap_or_default())
    }

    async fn listings(&self) -> Result<Vec<Vec<ClusterNode>>> {
        let mut listings = Vec::new();
        for api in self.managers {
            match api.cluster_nodes().await {
                Ok(nodes) => listings.push(nodes),
                Err(e) => tracing::debug!(manager = api.base_url(), "skipping: {e}"),
            }
        }
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use yare::parameterized;

    use super::*;

    fn node(name: &str, master: bool, online: bool) -> ClusterNode {
        ClusterNode {
            name: name.to_owned(),
            host_ip: "10.0.0.1".to_owned(),
            master,
            online,
            status: None,
        }
    }

    #[parameterized(
        array = { r#"[{"status": "Active"}, {"status": "active"}, {"status": "Offline"}]"#, 2 },
        items = { r#"{"items": [{"status": "Active"}], "metadata": {}}"#, 1 },
        nodes_map = { r#"{"nodes": {"m1": {"online": true}, "m2": {"online": false}}}"#, 1 },
        status_wins_over_online = { r#"[{"status": "Offline", "online": true}]"#, 0 },
        empty = { "[]", 0 },
    )]
    fn structured_bodies(raw: &str, expected: usize) {
        let counted = count_active(raw);
        assert_eq!(counted, ActiveCount { count: expected, source: CountSource::Structured });
    }

    #[test]
    fn unstructured_body_falls_back_to_marker_scan() {
        let raw = "manager-1: Active\nmanager-2: Active\nmanager-3: Offline\n";
        assert_eq!(count_active(raw), ActiveCount { count: 2, source: CountSource::TextScan });
        // JSON that is not a member list is scanned as text too.
        let raw = r#"{"leader": "Active"}"#;
        assert_eq!(count_active(raw).source, CountSource::TextScan);
    }

    #[test]
    fn marker_scan_is_case_sensitive() {
        let raw = "manager-1: Active\nmanager-2: inactive\nmanager-3: ACTIVE?\n";
        assert_eq!(count_active(raw), ActiveCount { count: 1, source: CountSource::TextScan });
    }

    #[test]
    fn expect_active_is_exact() {
        let raw = r#"[{"status": "Active"}, {"status": "Active"}]"#;
        assert!(expect_active(raw, 2));
        assert!(!expect_active(raw, 3));
        assert!(!expect_active(raw, 1));
    }

    #[test]
    fn leader_requires_exactly_one_master() {
        assert_eq!(leader(&[node("a", false, true), node("b", true, true)]).unwrap().name, "b");
        assert!(leader(&[node("a", true, true), node("b", true, true)]).is_none());
        assert!(leader(&[node("a", false, true)]).is_none());
    }

    #[test]
    fn agreement_ignores_order() {
        let one = vec![node("a", true, true), node("b", false, true)];
        let two = vec![node("b", true, true), node("a", false, true)];
        assert!(all_agree(&[one.clone(), two]));
        assert!(!all_agree(&[one, vec![node("a", true, true)]]));
        assert!(all_agree(&[]));
    }
}
