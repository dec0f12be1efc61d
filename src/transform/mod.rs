//! Transform module — selective protection of message sub-paths
//!
//! - **model**: headers, bodies, transforms and algorithm tokens
//! - **envelope**: the `Encoded`/`Raw` response union
//! - **codec**: encode/decode against the remote executor

mod codec;
mod envelope;
mod model;

pub use envelope::{EncodedMessage, EncodedResponse};
pub use model::{
    Compressor, Dsid, EncodeRequest, Encryptor, Transform, TransformBody, TransformHeader,
};
