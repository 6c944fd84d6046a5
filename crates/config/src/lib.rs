#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod error;
pub mod inventory;
mod types;

#[cfg(feature = "support")]
pub mod support;
#[cfg(feature = "support")]
pub use support::{Timeout, poll, poll_async};

pub use error::{ConfigError, Result};
pub use types::*;

/// Parse a YAML settings document into raw (unresolved) settings.
pub fn parse_raw(input: &str) -> Result<RawSettings> {
    if input.trim().is_empty() {
        return Ok(RawSettings::default());
    }
    serde_yaml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))
}
