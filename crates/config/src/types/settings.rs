use std::collections::HashSet;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// YAML settings file read first (lowest precedence after defaults).
pub const CONFIG_PATH_ENV: &str = "CLOUDIFY_TEST_CONFIG_PATH";
/// YAML handler configuration, usually written by the provisioning step.
pub const HANDLER_CONFIG_ENV: &str = "HANDLER_CONFIGURATION";
/// Any truthy value skips teardown so the environment can be inspected.
pub const CLEANUP_ENV: &str = "CLOUDIFY_TEST_NO_CLEANUP";

/// Raw settings as written in YAML. Every field is optional so that the
/// config file, the handler configuration and the environment can each
/// supply a subset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawSettings {
    pub managers: Option<Vec<RawHost>>,
    pub brokers: Option<Vec<RawHost>>,
    pub credentials: RawCredentials,
    pub ssh: RawSsh,
    pub database: RawDatabase,
    pub timeouts: RawTimeouts,
    pub services: RawServices,
    pub no_cleanup: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawHost {
    pub name: String,
    pub public_ip: IpAddr,
    #[serde(default)]
    pub private_ip: Option<IpAddr>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawCredentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub tenant: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawSsh {
    pub user: Option<String>,
    pub key_path: Option<PathBuf>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawDatabase {
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub host: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawTimeouts {
    pub poll_interval_ms: Option<u64>,
    pub leader_election_ms: Option<u64>,
    pub health_ms: Option<u64>,
    pub execution_ms: Option<u64>,
    pub snapshot_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RawServices {
    pub manager: Option<String>,
    pub broker: Option<String>,
    pub database: Option<String>,
}

impl RawSettings {
    /// Layer `over` on top of `self`: any field set in `over` wins.
    pub fn overlay(self, over: RawSettings) -> RawSettings {
        RawSettings {
            managers: over.managers.or(self.managers),
            brokers: over.brokers.or(self.brokers),
            credentials: RawCredentials {
                username: over.credentials.username.or(self.credentials.username),
                password: over.credentials.password.or(self.credentials.password),
                tenant: over.credentials.tenant.or(self.credentials.tenant),
            },
            ssh: RawSsh {
                user: over.ssh.user.or(self.ssh.user),
                key_path: over.ssh.key_path.or(self.ssh.key_path),
                port: over.ssh.port.or(self.ssh.port),
            },
            database: RawDatabase {
                user: over.database.user.or(self.database.user),
                password: over.database.password.or(self.database.password),
                database: over.database.database.or(self.database.database),
                host: over.database.host.or(self.database.host),
            },
            timeouts: RawTimeouts {
                poll_interval_ms: over.timeouts.poll_interval_ms.or(self.timeouts.poll_interval_ms),
                leader_election_ms: over
                    .timeouts
                    .leader_election_ms
                    .or(self.timeouts.leader_election_ms),
                health_ms: over.timeouts.health_ms.or(self.timeouts.health_ms),
                execution_ms: over.timeouts.execution_ms.or(self.timeouts.execution_ms),
                snapshot_ms: over.timeouts.snapshot_ms.or(self.timeouts.snapshot_ms),
            },
            services: RawServices {
                manager: over.services.manager.or(self.services.manager),
                broker: over.services.broker.or(self.services.broker),
                database: over.services.database.or(self.services.database),
            },
            no_cleanup: over.no_cleanup.or(self.no_cleanup),
        }
    }

    /// Build the environment layer from a variable lookup.
    pub fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Result<RawSettings> {
        let ms = |var: &str| -> Result<Option<u64>> {
            match lookup(var) {
                None => Ok(None),
                Some(val) => val.trim().parse().map(Some).map_err(|_| ConfigError::InvalidField {
                    path: var.to_owned(),
                    message: format!("expected milliseconds, got '{val}'"),
                }),
            }
        };
        let port = match lookup("VIGIL_SSH_PORT") {
            None => None,
            Some(val) => Some(val.trim().parse().map_err(|_| ConfigError::InvalidField {
                path: "VIGIL_SSH_PORT".to_owned(),
                message: format!("expected a port number, got '{val}'"),
            })?),
        };

        Ok(RawSettings {
            managers: None,
            brokers: None,
            credentials: RawCredentials {
                username: lookup("VIGIL_MANAGER_USERNAME"),
                password: lookup("VIGIL_MANAGER_PASSWORD"),
                tenant: lookup("VIGIL_MANAGER_TENANT"),
            },
            ssh: RawSsh {
                user: lookup("VIGIL_SSH_USER"),
                key_path: lookup("VIGIL_SSH_KEY").map(PathBuf::from),
                port,
            },
            database: RawDatabase {
                user: lookup("VIGIL_DB_USER"),
                password: lookup("VIGIL_DB_PASSWORD"),
                database: None,
                host: None,
            },
            timeouts: RawTimeouts {
                poll_interval_ms: ms("VIGIL_POLL_INTERVAL_MS")?,
                leader_election_ms: ms("VIGIL_LEADER_ELECTION_TIMEOUT_MS")?,
                health_ms: ms("VIGIL_HEALTH_TIMEOUT_MS")?,
                execution_ms: ms("VIGIL_EXECUTION_TIMEOUT_MS")?,
                snapshot_ms: ms("VIGIL_SNAPSHOT_TIMEOUT_MS")?,
            },
            services: RawServices::default(),
            no_cleanup: lookup(CLEANUP_ENV).map(|v| is_truthy(&v)),
        })
    }
}

fn is_truthy(value: &str) -> bool {
    let v = value.trim();
    !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false")
}

/// A provisioned host (manager or broker).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostSpec {
    pub name: String,
    pub public_ip: IpAddr,
    pub private_ip: IpAddr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub tenant: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SshSettings {
    pub user: String,
    pub key_path: Option<PathBuf>,
    pub port: u16,
}

/// Authenticated session used to read the database replication view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseSettings {
    pub user: String,
    pub password: Option<String>,
    pub database: String,
    pub host: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timeouts {
    pub poll_interval: Duration,
    pub leader_election: Duration,
    pub health: Duration,
    pub execution: Duration,
    pub snapshot: Duration,
}

/// systemd units stopped and started by fault injection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceUnits {
    pub manager: String,
    pub broker: String,
    pub database: String,
}

/// Fully resolved harness settings. Built once at startup and passed by
/// reference; nothing re-reads the environment after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub managers: Vec<HostSpec>,
    pub brokers: Vec<HostSpec>,
    pub credentials: Credentials,
    pub ssh: SshSettings,
    pub database: DatabaseSettings,
    pub timeouts: Timeouts,
    pub services: ServiceUnits,
    pub no_cleanup: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            managers: Vec::new(),
            brokers: Vec::new(),
            credentials: Credentials {
                username: "admin".to_owned(),
                password: "admin".to_owned(),
                tenant: "default_tenant".to_owned(),
            },
            ssh: SshSettings { user: "centos".to_owned(), key_path: None, port: 22 },
            database: DatabaseSettings {
                user: "cloudify".to_owned(),
                password: None,
                database: "cloudify_db".to_owned(),
                host: "localhost".to_owned(),
            },
            timeouts: Timeouts {
                poll_interval: Duration::from_secs(1),
                leader_election: Duration::from_secs(150),
                health: Duration::from_secs(30),
                execution: Duration::from_secs(600),
                snapshot: Duration::from_secs(900),
            },
            services: ServiceUnits {
                manager: "cloudify-restservice".to_owned(),
                broker: "cloudify-rabbitmq".to_owned(),
                database: "postgresql-9.5".to_owned(),
            },
            no_cleanup: false,
        }
    }
}

impl Settings {
    /// Load from the real process: config file, handler configuration and
    /// environment, in increasing precedence.
    pub fn load() -> Result<Settings> {
        let file = read_layer(std::env::var(CONFIG_PATH_ENV).ok())?;
        let handler = read_layer(std::env::var(HANDLER_CONFIG_ENV).ok())?;
        Settings::resolve(file, handler, |var| std::env::var(var).ok())
    }

    /// Resolve settings from explicit layers. Precedence:
    /// environment > handler configuration > config file > defaults.
    pub fn resolve(
        file: RawSettings,
        handler: RawSettings,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Settings> {
        let raw = file.overlay(handler).overlay(RawSettings::from_env(env)?);
        Settings::from_raw(raw)
    }

    /// Fill defaults for anything `raw` leaves unset and validate.
    pub fn from_raw(raw: RawSettings) -> Result<Settings> {
        let d = Settings::default();
        let managers = resolve_hosts("managers", raw.managers.unwrap_or_default())?;
        let brokers = resolve_hosts("brokers", raw.brokers.unwrap_or_default())?;
        let ms = |v: Option<u64>, default: Duration| {
            v.map(Duration::from_millis).unwrap_or(default)
        };

        let poll_interval = ms(raw.timeouts.poll_interval_ms, d.timeouts.poll_interval);
        if poll_interval.is_zero() {
            return Err(ConfigError::InvalidField {
                path: "timeouts.poll_interval_ms".to_owned(),
                message: "must be greater than zero".to_owned(),
            });
        }

        Ok(Settings {
            managers,
            brokers,
            credentials: Credentials {
                username: raw.credentials.username.unwrap_or(d.credentials.username),
                password: raw.credentials.password.unwrap_or(d.credentials.password),
                tenant: raw.credentials.tenant.unwrap_or(d.credentials.tenant),
            },
            ssh: SshSettings {
                user: raw.ssh.user.unwrap_or(d.ssh.user),
                key_path: raw.ssh.key_path,
                port: raw.ssh.port.unwrap_or(d.ssh.port),
            },
            database: DatabaseSettings {
                user: raw.database.user.unwrap_or(d.database.user),
                password: raw.database.password,
                database: raw.database.database.unwrap_or(d.database.database),
                host: raw.database.host.unwrap_or(d.database.host),
            },
            timeouts: Timeouts {
                poll_interval,
                leader_election: ms(raw.timeouts.leader_election_ms, d.timeouts.leader_election),
                health: ms(raw.timeouts.health_ms, d.timeouts.health),
                execution: ms(raw.timeouts.execution_ms, d.timeouts.execution),
                snapshot: ms(raw.timeouts.snapshot_ms, d.timeouts.snapshot),
            },
            services: ServiceUnits {
                manager: raw.services.manager.unwrap_or(d.services.manager),
                broker: raw.services.broker.unwrap_or(d.services.broker),
                database: raw.services.database.unwrap_or(d.services.database),
            },
            no_cleanup: raw.no_cleanup.unwrap_or(false),
        })
    }
}

fn resolve_hosts(field: &str, hosts: Vec<RawHost>) -> Result<Vec<HostSpec>> {
    let mut seen = HashSet::new();
    hosts
        .into_iter()
        .map(|h| {
            if !seen.insert(h.name.clone()) {
                return Err(ConfigError::Constraint {
                    path: format!("{field}.{}", h.name),
                    message: "duplicate host name".to_owned(),
                });
            }
            Ok(HostSpec {
                private_ip: h.private_ip.unwrap_or(h.public_ip),
                public_ip: h.public_ip,
                name: h.name,
            })
        })
        .collect()
}

fn read_layer(path: Option<String>) -> Result<RawSettings> {
    match path {
        Some(p) if !p.trim().is_empty() => read_file(Path::new(&p)),
        _ => Ok(RawSettings::default()),
    }
}

/// Read one YAML settings layer from disk.
pub(crate) fn read_file(path: &Path) -> Result<RawSettings> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    crate::parse_raw(&text)
}
