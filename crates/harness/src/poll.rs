//! Poll-until-predicate over a list of endpoints.
//!
//! Every wait in the harness goes through here. A round queries each
//! endpoint in order; a fetch error is logged and the next endpoint is tried.
//! The first result satisfying the predicate wins. Between rounds the poller
//! sleeps for the configured interval, and once the deadline has passed it
//! returns `HarnessError::Timeout` after the round in progress.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use vigil_config::Settings;

use crate::error::{HarnessError, Result};

/// Overall deadline and sleep between rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollOptions {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Long budget for a new leader to be elected after a failure.
    pub fn leader_election(settings: &Settings) -> Self {
        Self::new(settings.timeouts.leader_election, settings.timeouts.poll_interval)
    }

    /// Short budget for status checks on a healthy cluster.
    pub fn health(settings: &Settings) -> Self {
        Self::new(settings.timeouts.health, settings.timeouts.poll_interval)
    }

    pub fn execution(settings: &Settings) -> Self {
        Self::new(settings.timeouts.execution, settings.timeouts.poll_interval)
    }

    pub fn snapshot(settings: &Settings) -> Self {
        Self::new(settings.timeouts.snapshot, settings.timeouts.poll_interval)
    }
}

/// A result that satisfied the predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit<T> {
    /// Position of the endpoint that produced `value`.
    pub index: usize,
    pub value: T,
    /// 1-based round in which the predicate held.
    pub rounds: usize,
}

/// Query `endpoints` round-robin until `predicate` accepts a result.
///
/// Fetch errors never abort the wait: they are logged and the next endpoint
/// is tried. If no endpoint satisfies the predicate before `opts.timeout`
/// elapses, returns `HarnessError::Timeout` naming `what`. With fetches that
/// return promptly, that happens no later than `timeout + interval` after
/// the call.
pub async fn poll_endpoints<'a, E, T, Err, F, Fut, P>(
    what: &str,
    endpoints: &'a [E],
    mut fetch: F,
    mut predicate: P,
    opts: PollOptions,
) -> Result<Hit<T>>
where
    F: FnMut(&'a E) -> Fut,
    Fut: Future<Output = std::result::Result<T, Err>>,
    Err: Display,
    P: FnMut(&T) -> bool,
{
    let start = Instant::now();
    let deadline = start + opts.timeout;
    let mut rounds = 0;
    loop {
        rounds += 1;
        for (index, endpoint) in endpoints.iter().enumerate() {
            match fetch(endpoint).await {
                Ok(value) if predicate(&value) => {
                    tracing::debug!(what, index, rounds, "condition met");
                    return Ok(Hit { index, value, rounds });
                }
                Ok(_) => tracing::debug!(what, index, rounds, "condition not met"),
                Err(e) => tracing::warn!(what, index, "endpoint query failed: {e}"),
            }
        }
        if Instant::now() >= deadline {
            return Err(HarnessError::Timeout { what: what.to_owned(), elapsed: start.elapsed() });
        }
        tokio::time::sleep(opts.interval).await;
    }
}

/// Single-endpoint form of `poll_endpoints`.
pub async fn poll_until<T, Err, F, Fut, P>(
    what: &str,
    mut fetch: F,
    predicate: P,
    opts: PollOptions,
) -> Result<Hit<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, Err>>,
    Err: Display,
    P: FnMut(&T) -> bool,
{
    poll_endpoints(what, &[()], |_| fetch(), predicate, opts).await
}
