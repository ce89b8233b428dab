use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("message is not a JSON object")]
    NotAnObject,
    #[error("api mismatch: expected {expected}, got {actual}")]
    ApiMismatch { expected: &'static str, actual: String },
    #[error("unsupported message type: {0}")]
    UnsupportedType(String),
    #[error("missing or invalid field: {0}")]
    InvalidField(&'static str),
    #[error("untrusted format: {0}")]
    UntrustedFormat(String),
}
