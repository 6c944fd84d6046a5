use vigil_config::ConfigError;
use vigil_harness::{ApiError, HarnessError};
use vigil_net::NetError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// The manager answered with an error status.
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },

    /// Nothing listening at the manager address.
    #[error("connection refused; is the manager running? (address: {address})")]
    ConnectionRefused { address: String },

    /// Other request errors (DNS, timeout, TLS, bad body).
    #[error("request failed: {0}")]
    Request(ApiError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// A wait timed out or a checked condition did not hold.
    #[error("{0}")]
    Harness(HarnessError),

    /// Invalid arguments or configuration.
    #[error("{0}")]
    Arg(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Api { .. } => 1,
            CliError::ConnectionRefused { .. } => 2,
            CliError::Request(_) => 3,
            CliError::Io(_) => 4,
            CliError::Harness(_) => 5,
            CliError::Arg(_) => 64, // EX_USAGE
        }
    }
}

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, message, .. } => CliError::Api { status, message },
            ApiError::Request(e) if e.is_connect() => {
                let address = e.url().map(|u| u.origin().ascii_serialization()).unwrap_or_default();
                CliError::ConnectionRefused { address }
            }
            other => CliError::Request(other),
        }
    }
}

impl From<HarnessError> for CliError {
    fn from(err: HarnessError) -> Self {
        match err {
            HarnessError::Api(e) => e.into(),
            HarnessError::Io(e) => CliError::Io(e),
            HarnessError::Config(e) => e.into(),
            other => CliError::Harness(other),
        }
    }
}

impl From<NetError> for CliError {
    fn from(err: NetError) -> Self {
        CliError::Harness(HarnessError::Net(err))
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Arg(err.to_string())
    }
}
