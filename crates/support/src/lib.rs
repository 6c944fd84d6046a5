// Test support crate: unwrap/panic are appropriate in test harness code.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::new_without_default)]

pub mod cluster;
pub mod manager;
pub mod remote;

pub use cluster::TestCluster;
pub use manager::{FakeManager, NOT_ACTIVE_MESSAGE};
pub use remote::TestRemote;
