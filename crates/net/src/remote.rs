use std::future::Future;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;

use tokio::process::Command;

use crate::cmd::run_command;
use crate::error::NetError;

/// Boxed future for trait methods that need `dyn` dispatch.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Captured result of a command on a remote host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Trimmed stdout on success, `NetError::Remote` otherwise.
    pub fn into_stdout(self, host: IpAddr, command: &str) -> Result<String, NetError> {
        if self.success() {
            Ok(self.stdout.trim().to_string())
        } else {
            Err(NetError::Remote {
                host,
                command: command.to_string(),
                code: self.code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Command-execution channel to one host.
///
/// Production code uses `SshRemote`; tests substitute an in-memory
/// implementation from `vigil-support`.
pub trait Remote: Send + Sync {
    /// Address this remote executes on.
    fn host(&self) -> IpAddr;

    /// Run a shell command and capture its output regardless of exit code.
    fn exec<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<CommandOutput, NetError>>;

    /// Drop any cached connection. The next `exec` reconnects.
    fn reset(&self) -> BoxFuture<'_, ()>;

    /// Run a command, returning trimmed stdout or an error on non-zero exit.
    fn run<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<String, NetError>> {
        Box::pin(async move {
            let output = self.exec(command).await?;
            output.into_stdout(self.host(), command)
        })
    }
}

/// `Remote` backed by the OpenSSH client.
///
/// Sessions are multiplexed through a ControlMaster socket per host, so
/// consecutive commands reuse one TCP connection until `reset` tears it down.
pub struct SshRemote {
    host: IpAddr,
    user: String,
    port: u16,
    key_path: Option<PathBuf>,
    control_dir: PathBuf,
}

/// ssh reserves exit status 255 for its own connection errors.
const SSH_CONNECTION_ERROR: i32 = 255;

impl SshRemote {
    pub fn new(host: IpAddr, user: &str, port: u16, key_path: Option<PathBuf>) -> Self {
        Self {
            host,
            user: user.to_string(),
            port,
            key_path,
            control_dir: std::env::temp_dir().join("vigil-ssh"),
        }
    }

    fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    fn control_path(&self) -> String {
        format!("ControlPath={}/%C", self.control_dir.display())
    }

    fn base_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "-o",
            "BatchMode=yes",
            "-o",
            "StrictHostKeyChecking=no",
            "-o",
            "UserKnownHostsFile=/dev/null",
            "-o",
            "LogLevel=ERROR",
            "-o",
            "ConnectTimeout=10",
            "-o",
            "ControlMaster=auto",
            "-o",
            "ControlPersist=60",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        args.push("-o".into());
        args.push(self.control_path());
        args.push("-p".into());
        args.push(self.port.to_string());
        if let Some(key) = &self.key_path {
            args.push("-i".into());
            args.push(key.display().to_string());
        }
        args
    }

    async fn exec_impl(&self, command: &str) -> Result<CommandOutput, NetError> {
        tokio::fs::create_dir_all(&self.control_dir).await?;
        let output = Command::new("ssh")
            .args(self.base_args())
            .arg(self.destination())
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    NetError::CommandNotFound { program: "ssh".to_string() }
                } else {
                    NetError::Io(e)
                }
            })?;

        let code = output.status.code().unwrap_or(SSH_CONNECTION_ERROR);
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if code == SSH_CONNECTION_ERROR {
            return Err(NetError::Disconnected { host: self.host, message: stderr.trim().into() });
        }
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        Ok(CommandOutput { stdout, stderr, code })
    }

    /// `ssh -O exit` against the same control socket `exec` uses. The socket
    /// name hashes the port, so the full connection arguments are required.
    fn reset_args(&self) -> Vec<String> {
        let mut args = self.base_args();
        args.extend(["-O".into(), "exit".into(), self.destination()]);
        args
    }

    async fn reset_impl(&self) {
        let args = self.reset_args();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        if let Err(e) = run_command("ssh", &args).await {
            tracing::debug!(host = %self.host, "ssh control reset: {e}");
        }
    }
}

impl Remote for SshRemote {
    fn host(&self) -> IpAddr {
        self.host
    }

    fn exec<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<CommandOutput, NetError>> {
        Box::pin(self.exec_impl(command))
    }

    fn reset(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.reset_impl())
    }
}

/// `Remote` that runs commands on this machine through `sh -c`.
///
/// Used when the harness runs on the host under test.
pub struct LocalRemote;

impl LocalRemote {
    async fn exec_impl(&self, command: &str) -> Result<CommandOutput, NetError> {
        let output = Command::new("sh")
            .args(["-c", command])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(NetError::Io)?;
        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            code: output.status.code().unwrap_or(-1),
        })
    }
}

impl Remote for LocalRemote {
    fn host(&self) -> IpAddr {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    }

    fn exec<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<CommandOutput, NetError>> {
        Box::pin(self.exec_impl(command))
    }

    fn reset(&self) -> BoxFuture<'_, ()> {
        Box::pin(std::future::ready(()))
    }
}
