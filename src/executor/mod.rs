//! Remote executor — the call-and-response channel that performs the actual
//! encryption, compression and erasure.
//!
//! The executor is addressed by endpoint name and receives an ordered list of
//! `Config` entries (call parameters plus transient data). Implementations:
//! - **MemoryExecutor**: in-process executor with a per-DSID vault (dev/demo)
//! - **ScriptedExecutor**: records calls and replays canned responses (tests)

pub mod config;
pub mod memory;
pub mod mock;

use crate::context::CallContext;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use config::Config;
pub use memory::MemoryExecutor;
pub use mock::{RecordedCall, ScriptedExecutor};

/// Encodes private data
pub const ENDPOINT_ENCODE: &str = "private_encode";
/// Decodes private data
pub const ENDPOINT_DECODE: &str = "private_decode";
/// Removes all private data for a data subject
pub const ENDPOINT_PURGE: &str = "private_purge";
/// Exports a data subject's private data
pub const ENDPOINT_EXPORT: &str = "private_export";
/// Maps a data subject profile to its DSID
pub const ENDPOINT_PROFILE_TO_DSID: &str = "private_get_dsid";

/// Reply from an executor endpoint: a JSON payload or an error message
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    payload: Vec<u8>,
    error_message: Option<String>,
}

impl Response {
    pub fn ok(payload: Vec<u8>) -> Self {
        Self {
            payload,
            error_message: None,
        }
    }

    /// Serialize a value as the success payload
    pub fn from_value<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::ok(serde_json::to_vec(value)?))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            payload: Vec::new(),
            error_message: Some(message.into()),
        }
    }

    pub fn has_error(&self) -> bool {
        self.error_message.is_some()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Deserialize the success payload
    pub fn unmarshal<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

/// Transport-level failures (the call never produced a `Response`)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutorError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Executor timed out: {0}")]
    Timeout(String),

    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),
}

impl ExecutorError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutorError::Timeout(_))
    }
}

/// Client interface to the remote executor
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Invoke `method` with the given configs
    async fn call(
        &self,
        ctx: &CallContext,
        method: &str,
        configs: &[Config],
    ) -> Result<Response, ExecutorError>;

    async fn private_encode(
        &self,
        ctx: &CallContext,
        configs: &[Config],
    ) -> Result<Response, ExecutorError> {
        self.call(ctx, ENDPOINT_ENCODE, configs).await
    }

    async fn private_decode(
        &self,
        ctx: &CallContext,
        configs: &[Config],
    ) -> Result<Response, ExecutorError> {
        self.call(ctx, ENDPOINT_DECODE, configs).await
    }

    async fn private_export(
        &self,
        ctx: &CallContext,
        configs: &[Config],
    ) -> Result<Response, ExecutorError> {
        self.call(ctx, ENDPOINT_EXPORT, configs).await
    }

    async fn private_purge(
        &self,
        ctx: &CallContext,
        configs: &[Config],
    ) -> Result<Response, ExecutorError> {
        self.call(ctx, ENDPOINT_PURGE, configs).await
    }

    async fn private_get_dsid(
        &self,
        ctx: &CallContext,
        configs: &[Config],
    ) -> Result<Response, ExecutorError> {
        self.call(ctx, ENDPOINT_PROFILE_TO_DSID, configs).await
    }
}
