#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod cmd;
mod error;
pub mod fault;
pub mod firewall;
mod remote;

pub use error::{NetError, Result};
pub use fault::FaultInjector;
pub use firewall::{Direction, FirewallCommand, FirewallRule, Partition, RuleOp};
pub use remote::{BoxFuture, CommandOutput, LocalRemote, Remote, SshRemote};
