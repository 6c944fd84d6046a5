//! The provisioned environment a scenario runs against.

use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;

use vigil_config::{HostSpec, Settings};
use vigil_net::{BoxFuture, FaultInjector, Partition, Remote, SshRemote};

use crate::client::Api;
use crate::error::Result;

/// One manager: its REST client and a shell on the host.
pub struct ManagerHandle {
    pub name: String,
    pub public_ip: IpAddr,
    pub private_ip: IpAddr,
    api: Api,
    remote: Arc<dyn Remote>,
}

impl ManagerHandle {
    pub fn new(spec: &HostSpec, api: Api, remote: Arc<dyn Remote>) -> Self {
        Self {
            name: spec.name.clone(),
            public_ip: spec.public_ip,
            private_ip: spec.private_ip,
            api,
            remote,
        }
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    pub fn remote(&self) -> &dyn Remote {
        self.remote.as_ref()
    }

    pub fn shared_remote(&self) -> Arc<dyn Remote> {
        Arc::clone(&self.remote)
    }

    pub fn faults(&self) -> FaultInjector<'_> {
        FaultInjector::new(self.remote.as_ref())
    }
}

/// One message broker. Brokers are only reached through a shell.
pub struct BrokerHandle {
    pub name: String,
    pub public_ip: IpAddr,
    pub private_ip: IpAddr,
    remote: Arc<dyn Remote>,
}

impl BrokerHandle {
    pub fn new(spec: &HostSpec, remote: Arc<dyn Remote>) -> Self {
        Self {
            name: spec.name.clone(),
            public_ip: spec.public_ip,
            private_ip: spec.private_ip,
            remote,
        }
    }

    pub fn remote(&self) -> &dyn Remote {
        self.remote.as_ref()
    }

    pub fn shared_remote(&self) -> Arc<dyn Remote> {
        Arc::clone(&self.remote)
    }
}

type CleanupAction = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

/// Teardown actions registered as a scenario creates things.
///
/// Actions run in reverse registration order, either from `run` or, if the
/// registry is dropped first, from `Drop`. When the environment asked to keep
/// resources (`CLOUDIFY_TEST_NO_CLEANUP`), they are discarded without running.
pub struct Cleanup {
    actions: Vec<(String, CleanupAction)>,
    skip: bool,
}

impl Cleanup {
    pub fn new(skip: bool) -> Self {
        Self { actions: Vec::new(), skip }
    }

    pub fn register<F, Fut>(&mut self, name: &str, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let action: CleanupAction =
            Box::new(move || -> BoxFuture<'static, Result<()>> { Box::pin(action()) });
        self.actions.push((name.to_owned(), action));
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Run every pending action, newest first. A failing action is logged
    /// and the rest still run. Returns the number of failures.
    pub async fn run(&mut self) -> usize {
        let actions = std::mem::take(&mut self.actions);
        if self.skip {
            if !actions.is_empty() {
                tracing::info!(pending = actions.len(), "cleanup disabled, leaving resources");
            }
            return 0;
        }
        let mut failures = 0;
        for (name, action) in actions.into_iter().rev() {
            match action().await {
                Ok(()) => tracing::debug!(action = %name, "cleaned up"),
                Err(e) => {
                    tracing::warn!(action = %name, "cleanup failed: {e}");
                    failures += 1;
                }
            }
        }
        failures
    }
}

impl Drop for Cleanup {
    /// A scenario that panicked never reaches `teardown`. Pending actions
    /// run here instead, on a scoped thread with its own runtime so this
    /// works from inside any async context.
    fn drop(&mut self) {
        if self.actions.is_empty() {
            return;
        }
        let mut pending = Cleanup { actions: std::mem::take(&mut self.actions), skip: self.skip };
        if pending.skip {
            tracing::info!(pending = pending.len(), "cleanup disabled, leaving resources");
            pending.actions.clear();
            return;
        }
        tracing::warn!(pending = pending.len(), "environment dropped before teardown, cleaning up");
        let outcome = std::thread::scope(|s| {
            s.spawn(|| {
                let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
                Ok::<_, std::io::Error>(rt.block_on(pending.run()))
            })
            .join()
        });
        match outcome {
            Ok(Ok(0)) => {}
            Ok(Ok(failures)) => tracing::warn!(failures, "cleanup on drop had failures"),
            Ok(Err(e)) => tracing::warn!("cleanup on drop could not start a runtime: {e}"),
            Err(_) => tracing::warn!("cleanup on drop panicked"),
        }
    }
}

/// Managers, brokers and settings for one scenario run.
pub struct Environment {
    settings: Settings,
    managers: Vec<ManagerHandle>,
    brokers: Vec<BrokerHandle>,
    cleanup: Cleanup,
}

impl Environment {
    /// Connect to every configured host over SSH and REST.
    pub fn new(settings: Settings) -> Self {
        let ssh = |host: &HostSpec| -> Arc<dyn Remote> {
            Arc::new(SshRemote::new(
                host.public_ip,
                &settings.ssh.user,
                settings.ssh.port,
                settings.ssh.key_path.clone(),
            ))
        };
        let managers = settings
            .managers
            .iter()
            .map(|m| {
                let api = Api::new(&m.public_ip.to_string(), &settings.credentials);
                ManagerHandle::new(m, api, ssh(m))
            })
            .collect();
        let brokers = settings.brokers.iter().map(|b| BrokerHandle::new(b, ssh(b))).collect();
        Self::with_hosts(settings, managers, brokers)
    }

    /// Build from prepared handles.
    pub fn with_hosts(
        settings: Settings,
        managers: Vec<ManagerHandle>,
        brokers: Vec<BrokerHandle>,
    ) -> Self {
        let cleanup = Cleanup::new(settings.no_cleanup);
        Self { settings, managers, brokers, cleanup }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn managers(&self) -> &[ManagerHandle] {
        &self.managers
    }

    pub fn manager(&self, name: &str) -> Option<&ManagerHandle> {
        self.managers.iter().find(|m| m.name == name)
    }

    pub fn brokers(&self) -> &[BrokerHandle] {
        &self.brokers
    }

    /// REST clients for every manager, in configuration order.
    pub fn apis(&self) -> Vec<Api> {
        self.managers.iter().map(|m| m.api.clone()).collect()
    }

    pub fn manager_remotes(&self) -> Vec<Arc<dyn Remote>> {
        self.managers.iter().map(ManagerHandle::shared_remote).collect()
    }

    pub fn broker_remotes(&self) -> Vec<Arc<dyn Remote>> {
        self.brokers.iter().map(BrokerHandle::shared_remote).collect()
    }

    /// Rules cutting manager `name` off from every other manager.
    pub fn isolate(&self, name: &str) -> Option<Partition> {
        let target = self.manager(name)?;
        let peers = self.managers.iter().map(|m| m.private_ip);
        Some(Partition::between(target.private_ip, peers))
    }

    pub fn cleanup(&mut self) -> &mut Cleanup {
        &mut self.cleanup
    }

    /// Run registered cleanup. Returns the number of failed actions.
    pub async fn teardown(mut self) -> usize {
        self.cleanup.run().await
    }
}
