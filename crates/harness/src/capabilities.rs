//! Capability checks: CLI installation on a host and product edition.

use vigil_config::VersionInfo;
use vigil_net::Remote;

use crate::client::Api;
use crate::error::{HarnessError, Result};

/// Install the CLI package from `package_url` and return `cfy --version`.
pub async fn install_cli(remote: &dyn Remote, package_url: &str) -> Result<String> {
    tracing::info!(host = %remote.host(), package_url, "installing cli");
    remote.run(&format!("sudo yum install -y {package_url}")).await?;
    Ok(remote.run("cfy --version").await?)
}

/// Fail unless the manager reports `expected` as its edition.
pub async fn verify_edition(api: &Api, expected: &str) -> Result<VersionInfo> {
    let version = api.version().await?;
    if !version.edition.eq_ignore_ascii_case(expected) {
        return Err(HarnessError::Mismatch {
            what: format!("edition of {}", api.base_url()),
            expected: expected.to_owned(),
            actual: version.edition,
        });
    }
    Ok(version)
}
