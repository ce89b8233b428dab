use extendo_storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid field: {0}")]
    InvalidField(String),
    #[error("invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("Translations API instance is not configured")]
    NotConfigured,
    #[error("failed to read settings: {0}")]
    Settings(#[from] StoreError),
    #[error("failed to serialize conversation payload: {0}")]
    Serialization(String),
    #[error("Failed to save translation payload. {endpoint} -> {status} {reason}")]
    Status {
        endpoint: String,
        status: u16,
        reason: String,
    },
    #[error("Failed to save translation payload. {endpoint} -> {cause}")]
    Transport { endpoint: String, cause: String },
    #[error("http client init failed: {0}")]
    Client(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeerError {
    #[error("peer request timed out after {0} ms")]
    Timeout(u64),
    #[error("peer rejected request: {0}")]
    Remote(String),
    #[error("peer channel closed")]
    ChannelClosed,
    #[error("peer port failed to open: {0}")]
    Connect(String),
}
