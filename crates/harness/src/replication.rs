//! Database replication view.
//!
//! The primary's `pg_stat_replication` lists one row per connected replica.
//! A healthy cluster of `n` database nodes has `n - 1` replicas, exactly one
//! of them synchronous.

use std::collections::BTreeMap;
use std::sync::Arc;

use vigil_config::{DatabaseSettings, SyncState};
use vigil_net::Remote;

use crate::error::{HarnessError, Result};
use crate::poll::{Hit, PollOptions, poll_endpoints};

pub const REPLICATION_QUERY: &str = "SELECT client_addr, sync_state FROM pg_stat_replication";

/// Replica address to sync state.
pub type ReplicationState = BTreeMap<String, SyncState>;

/// psql invocation printing one `addr,state` line per replica.
pub fn replication_command(db: &DatabaseSettings) -> String {
    let password = match &db.password {
        Some(p) => format!("PGPASSWORD={} ", shell_quote(p)),
        None => String::new(),
    };
    format!(
        "{password}psql -h {} -U {} -d {} -t -A -F, -c \"{REPLICATION_QUERY}\"",
        db.host, db.user, db.database
    )
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Parse unaligned psql output. Blank lines are ignored.
pub fn parse_replication(output: &str) -> Result<ReplicationState> {
    let mut state = ReplicationState::new();
    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (addr, sync) = line
            .split_once(',')
            .ok_or_else(|| HarnessError::Parse(format!("replication row without state: {line}")))?;
        let sync: SyncState = sync.parse().map_err(HarnessError::Parse)?;
        state.insert(addr.trim().to_owned(), sync);
    }
    Ok(state)
}

/// Query the replication view through `remote`.
pub async fn replication_state(
    remote: &dyn Remote,
    db: &DatabaseSettings,
) -> Result<ReplicationState> {
    let output = remote.run(&replication_command(db)).await?;
    parse_replication(&output)
}

/// Exactly `replicas` replicas, one `sync`, the rest `async` or `potential`.
pub fn check_topology(state: &ReplicationState, replicas: usize) -> Result<()> {
    if state.len() != replicas {
        return Err(HarnessError::Topology(format!(
            "expected {replicas} replicas, found {}: {state:?}",
            state.len()
        )));
    }
    if replicas == 0 {
        return Ok(());
    }
    let sync = state.values().filter(|s| **s == SyncState::Sync).count();
    if sync != 1 {
        return Err(HarnessError::Topology(format!(
            "expected exactly one sync replica, found {sync}: {state:?}"
        )));
    }
    let standby = |s: &SyncState| matches!(s, SyncState::Async | SyncState::Potential);
    if let Some((addr, other)) =
        state.iter().find(|(_, s)| **s != SyncState::Sync && !standby(s))
    {
        return Err(HarnessError::Topology(format!("replica {addr} is {other}")));
    }
    Ok(())
}

/// Poll the database nodes until one of them (the primary) reports a valid
/// topology with `replicas` replicas.
pub async fn wait_for_topology(
    nodes: &[Arc<dyn Remote>],
    db: &DatabaseSettings,
    replicas: usize,
    opts: PollOptions,
) -> Result<Hit<ReplicationState>> {
    poll_endpoints(
        &format!("replication with {replicas} replicas"),
        nodes,
        |remote| replication_state(remote.as_ref(), db),
        |state| check_topology(state, replicas).is_ok(),
        opts,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(rows: &[(&str, SyncState)]) -> ReplicationState {
        rows.iter().map(|(a, s)| ((*a).to_owned(), *s)).collect()
    }

    #[test]
    fn parses_unaligned_rows() {
        let parsed = parse_replication("10.0.0.2,sync\n\n 10.0.0.3,async \n").unwrap();
        assert_eq!(
            parsed,
            state(&[("10.0.0.2", SyncState::Sync), ("10.0.0.3", SyncState::Async)])
        );
        assert!(parse_replication("").unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_rows() {
        assert!(matches!(parse_replication("10.0.0.2"), Err(HarnessError::Parse(_))));
        assert!(matches!(parse_replication("10.0.0.2,bogus"), Err(HarnessError::Parse(_))));
    }

    #[test]
    fn one_sync_and_the_rest_async_is_healthy() {
        let s = state(&[("a", SyncState::Sync), ("b", SyncState::Async)]);
        check_topology(&s, 2).unwrap();
        let s = state(&[("a", SyncState::Potential), ("b", SyncState::Sync)]);
        check_topology(&s, 2).unwrap();
        check_topology(&ReplicationState::new(), 0).unwrap();
    }

    #[test]
    fn wrong_shape_is_topology_error() {
        let two_sync = state(&[("a", SyncState::Sync), ("b", SyncState::Sync)]);
        assert!(matches!(check_topology(&two_sync, 2), Err(HarnessError::Topology(_))));

        let no_sync = state(&[("a", SyncState::Async), ("b", SyncState::Async)]);
        assert!(check_topology(&no_sync, 2).is_err());

        let missing = state(&[("a", SyncState::Sync)]);
        assert!(check_topology(&missing, 2).is_err());

        let quorum = state(&[("a", SyncState::Sync), ("b", SyncState::Quorum)]);
        assert!(check_topology(&quorum, 2).is_err());
    }

    #[test]
    fn command_quotes_password() {
        let db = DatabaseSettings {
            user: "cloudify".to_owned(),
            password: Some("it's".to_owned()),
            database: "cloudify_db".to_owned(),
            host: "localhost".to_owned(),
        };
        let cmd = replication_command(&db);
        assert!(cmd.starts_with(r"PGPASSWORD='it'\''s' psql -h localhost -U cloudify"), "{cmd}");
        assert!(cmd.ends_with(&format!("-t -A -F, -c \"{REPLICATION_QUERY}\"")));
    }
}
