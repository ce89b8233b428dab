use extendo_storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExcerptError {
    #[error("Translations API instance is not configured.")]
    NotConfigured,
    #[error("failed to read settings: {0}")]
    Settings(#[from] StoreError),
    #[error("Failed to fetch compilation excerpt. maxTokens or variant is required")]
    MissingBudget,
    #[error("Failed to fetch compilation excerpt. {endpoint} -> {status} {reason}")]
    Status {
        endpoint: String,
        status: u16,
        reason: String,
    },
    #[error("Failed to fetch compilation excerpt. {endpoint} -> {cause}")]
    Transport { endpoint: String, cause: String },
    #[error("http client init failed: {0}")]
    Client(String),
}
