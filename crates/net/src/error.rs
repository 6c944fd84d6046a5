use std::io;
use std::net::IpAddr;

pub type Result<T> = std::result::Result<T, NetError>;

/// Errors that can occur running local or remote commands.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// A local command (ssh, sh) exited non-zero.
    #[error("{program}: {message}")]
    Command { program: String, message: String },

    /// A required external binary was not found.
    #[error("{program}: command not found")]
    CommandNotFound { program: String },

    /// A command on a remote host exited non-zero.
    #[error("{host}: `{command}` exited with {code}: {stderr}")]
    Remote { host: IpAddr, command: String, code: i32, stderr: String },

    /// The session to a remote host dropped or could not be established.
    /// Expected right after a partition or shutdown is applied.
    #[error("{host}: connection lost: {message}")]
    Disconnected { host: IpAddr, message: String },

    /// General I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl NetError {
    /// Connection-level failure rather than a command failure.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, NetError::Disconnected { .. })
    }
}
