use std::time::Duration;

use vigil_config::{ConfigError, ExecutionStatus};
use vigil_net::NetError;

/// Errors from the manager REST API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Connection refused, timeout, TLS or other transport failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The manager answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, code: Option<String>, message: String },

    /// The body did not match the expected shape.
    #[error("invalid response body: {0}")]
    Decode(reqwest::Error),
}

impl ApiError {
    /// Worth retrying on the next endpoint or poll tick.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Request(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            ApiError::Status { status, .. } => *status >= 500,
            ApiError::Decode(_) => false,
        }
    }

    /// The manager's structured `error_code`, when it sent one.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            ApiError::Status { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Errors surfaced by harness operations.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Net(#[from] NetError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A wait ran out of time. Always a hard failure.
    #[error("timed out after {elapsed:?} waiting for {what}")]
    Timeout { what: String, elapsed: Duration },

    /// An execution reached a terminal status other than `terminated`.
    #[error("execution {id} ({workflow_id}) ended {status}: {error}")]
    ExecutionFailed { id: String, workflow_id: String, status: ExecutionStatus, error: String },

    #[error("snapshot {id} failed: {error}")]
    SnapshotFailed { id: String, error: String },

    /// A cluster or replication invariant does not hold.
    #[error("topology: {0}")]
    Topology(String),

    #[error("{what}: expected {expected}, got {actual}")]
    Mismatch { what: String, expected: String, actual: String },

    /// Remote output could not be interpreted.
    #[error("parse error: {0}")]
    Parse(String),

    /// A negative check saw the operation succeed.
    #[error("{operation}: expected an error matching '{expected}', but it succeeded")]
    UnexpectedSuccess { operation: String, expected: String },

    /// A negative check saw a different error than expected.
    #[error(
        "{operation}: expected an error matching '{expected}', got '{actual}' \
         (the upstream message may have changed)"
    )]
    UnexpectedError { operation: String, expected: String, actual: String },

    #[error("worker failed: {0}")]
    Worker(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HarnessError>;
