use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("storage io error: {0}")]
    Io(String),
    #[error("storage document is corrupt: {0}")]
    Corrupt(String),
    #[error("storage serialization failed: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}
