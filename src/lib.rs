//! MXF — data-subject message transforms
//!
//! Protects the parts of a structured message that belong to an identifiable
//! data subject by routing them through a remote executor, and later decodes,
//! exports or permanently purges them by data subject ID (DSID).

pub mod client;
pub mod context;
pub mod error;
pub mod executor;
pub mod seed;
pub mod subject;
pub mod transform;
pub mod wrap;

pub use client::{ClientConfig, PrivateClient};
pub use context::{CallContext, CancelHandle};
pub use error::PrivateError;
pub use executor::{Config, RemoteExecutor, Response};
pub use transform::{
    Compressor, Dsid, EncodedMessage, EncodedResponse, Encryptor, Transform, TransformBody,
    TransformHeader,
};
pub use wrap::WrappedCall;
