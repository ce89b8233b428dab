use extendo_blackiya::{ConfigError, PersistenceError};
use extendo_excerpt::ExcerptError;
use extendo_storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("native messaging frame exceeds {max_bytes} bytes (got {frame_bytes})")]
    TooLarge { frame_bytes: usize, max_bytes: usize },
    #[error("native messaging frame truncated: expected {expected} bytes")]
    Truncated { expected: usize },
    #[error("native messaging I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid native messaging JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("invalid sync config: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },
    #[error("settings store failed: {0}")]
    Store(#[from] StoreError),
    #[error("relay channel failed: {0}")]
    Frame(#[from] FrameError),
    #[error("translations client: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("compilation client: {0}")]
    Excerpt(#[from] ExcerptError),
}
