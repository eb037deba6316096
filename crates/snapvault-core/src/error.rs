//! Error types for snapvault-core

use thiserror::Error;

/// Result type alias using snapvault-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for Snapvault
#[derive(Error, Debug)]
pub enum Error {
    /// Null, empty or malformed input supplied by the caller
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    /// A component with this pid is already known
    #[error("Configuration already exists for pid: {pid}")]
    AlreadyExists { pid: String },

    /// Snapshot file missing or not enough history
    #[error("Snapshot not found: {message}")]
    SnapshotNotFound { message: String },

    /// Serialization or non-recoverable decrypt failure
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Batch operation where some pids were not applied
    #[error("{operation} partially succeeded; failed pids: [{}]", failed_pids.join(", "))]
    PartialSuccess {
        operation: String,
        failed_pids: Vec<String>,
        causes: Vec<String>,
    },

    /// Crypto collaborator failure
    #[error("Crypto error: {message}")]
    Crypto { message: String },

    /// Serializer collaborator failure
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Backing store collaborator failure
    #[error("Backing store error for {id}: {message}")]
    BackingStore { id: String, message: String },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid runtime configuration
    #[error("Invalid configuration format: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid parameter error
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    /// Create an already-exists error
    pub fn already_exists(pid: impl Into<String>) -> Self {
        Self::AlreadyExists { pid: pid.into() }
    }

    /// Create a snapshot not found error
    pub fn snapshot_not_found(message: impl Into<String>) -> Self {
        Self::SnapshotNotFound {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a partial success error from the failures of a batch
    pub fn partial_success(
        operation: impl Into<String>,
        failures: Vec<(String, String)>,
    ) -> Self {
        let (failed_pids, causes) = failures.into_iter().unzip();
        Self::PartialSuccess {
            operation: operation.into(),
            failed_pids,
            causes,
        }
    }

    /// Create a crypto error
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a backing store error
    pub fn backing_store(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackingStore {
            id: id.into(),
            message: message.into(),
        }
    }

    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether this error reports a partially applied batch
    pub fn is_partial_success(&self) -> bool {
        matches!(self, Self::PartialSuccess { .. })
    }

    /// Pids that were not applied, for partial success errors
    pub fn failed_pids(&self) -> &[String] {
        match self {
            Self::PartialSuccess { failed_pids, .. } => failed_pids,
            _ => &[],
        }
    }
}
