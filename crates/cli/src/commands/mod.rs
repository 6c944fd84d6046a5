mod cluster;
mod execution;
mod load;
mod network;
mod snapshot;
mod status;

use std::net::IpAddr;
use std::sync::Arc;

use vigil_config::Settings;
use vigil_harness::Api;
use vigil_net::{Remote, SshRemote};

use crate::args::Command;
use crate::error::CliError;
use crate::output::OutputMode;

/// Everything a command needs besides its own arguments.
pub struct Context {
    pub settings: Settings,
    pub mode: OutputMode,
    manager: Option<String>,
}

impl Context {
    pub fn new(settings: Settings, manager: Option<String>, mode: OutputMode) -> Self {
        Self { settings, mode, manager }
    }

    /// Address given with `--manager`, else the first configured manager.
    pub fn manager_address(&self) -> Result<String, CliError> {
        match (&self.manager, self.settings.managers.first()) {
            (Some(addr), _) => Ok(addr.clone()),
            (None, Some(first)) => Ok(first.public_ip.to_string()),
            (None, None) => Err(CliError::Arg(
                "no manager given; pass --manager or set VIGIL_MANAGER".to_owned(),
            )),
        }
    }

    pub fn explicit_manager(&self) -> Option<&str> {
        self.manager.as_deref()
    }

    pub fn api(&self) -> Result<Api, CliError> {
        Ok(self.api_for(&self.manager_address()?))
    }

    pub fn api_for(&self, address: &str) -> Api {
        Api::new(address, &self.settings.credentials)
    }

    /// SSH session to `host`, optionally as a different user.
    pub fn remote(&self, host: IpAddr, user: Option<&str>) -> Arc<dyn Remote> {
        let ssh = &self.settings.ssh;
        let user = user.unwrap_or(&ssh.user);
        Arc::new(SshRemote::new(host, user, ssh.port, ssh.key_path.clone()))
    }
}

pub async fn dispatch(cmd: Command, ctx: &Context) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::status(ctx).await,

        Command::Cluster { action } => cluster::cluster(ctx, action).await,

        Command::Snapshot { action } => snapshot::snapshot(ctx, action).await,

        Command::Execution { action } => execution::execution(ctx, action).await,

        Command::Replication { host, ssh_user, replicas } => {
            network::replication(ctx, host, ssh_user.as_deref(), replicas).await
        }

        Command::Partition { target } => network::partition(ctx, target).await,

        Command::Heal { target } => network::heal(ctx, target).await,

        Command::Load { deployment, workflow, stop_file, interval_ms } => {
            load::load(ctx, &deployment, &workflow, &stop_file, interval_ms).await
        }
    }
}
