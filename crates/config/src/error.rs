/// Errors that can occur when loading settings or patching inventory files.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// YAML parse error.
    #[error("parse error: {0}")]
    Parse(String),
    /// A settings or inventory file could not be read or written.
    #[error("{path}: {message}")]
    Io { path: String, message: String },
    /// A field has an invalid value (e.g. a non-numeric timeout).
    #[error("{path}: {message}")]
    InvalidField { path: String, message: String },
    /// A constraint violation across fields (e.g. duplicate host names).
    #[error("{path}: {message}")]
    Constraint { path: String, message: String },
}

impl ConfigError {
    pub(crate) fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        ConfigError::Io { path: path.display().to_string(), message: err.to_string() }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
