//! Verification harness for highly-available manager clusters.
//!
//! The manager under test owns leader election, replication and broker
//! clustering. This crate only observes them: it polls status endpoints until
//! a predicate holds, injects faults over remote shells, and turns what it
//! sees into typed results.
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod brokers;
pub mod bulk;
pub mod capabilities;
pub mod client;
pub mod cluster;
pub mod env;
mod error;
pub mod execution;
pub mod expect;
pub mod load;
pub mod poll;
pub mod replication;
pub mod snapshot;

pub use client::Api;
pub use cluster::{ActiveCount, ClusterProbe, CountSource, count_active, expect_active};
pub use env::{BrokerHandle, Cleanup, Environment, ManagerHandle};
pub use error::{ApiError, HarnessError, Result};
pub use poll::{Hit, PollOptions, poll_endpoints, poll_until};
