//! Errors surfaced by the private data protocol
//!
//! Every failure is scoped to a single call. Remote executor messages are
//! carried through verbatim; nothing here is retried.

use crate::executor::ExecutorError;

/// Protocol-level errors
#[derive(Debug, thiserror::Error)]
pub enum PrivateError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Encode failed: {0}")]
    EncodeError(String),

    #[error("Decode failed: {0}")]
    DecodeError(String),

    #[error("Export failed: {0}")]
    ExportError(String),

    #[error("Purge failed: {0}")]
    PurgeError(String),

    #[error("DSID lookup failed: {0}")]
    LookupError(String),

    #[error("Unexpected response from purge: got {got} != expected {expected}")]
    ResponseMismatch { expected: String, got: String },

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Call to {0} cancelled")]
    Cancelled(String),

    #[error("Call to {0} timed out")]
    Timeout(String),

    #[error("Executor error: {0}")]
    Executor(ExecutorError),

    #[error("Seed generation failed: {0}")]
    Seed(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("wrap encode error: {0}")]
    WrapEncodeError(Box<PrivateError>),

    #[error("wrap call error: {0}")]
    WrapCallError(Box<PrivateError>),

    #[error("wrap call response error: {0}")]
    WrapCallResponseError(String),

    #[error("wrap decode error: {0}")]
    WrapDecodeError(Box<PrivateError>),
}

impl PrivateError {
    /// True for failures caused by the call context expiring
    pub fn is_context_error(&self) -> bool {
        matches!(self, PrivateError::Cancelled(_) | PrivateError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, PrivateError>;
