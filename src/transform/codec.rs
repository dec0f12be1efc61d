//! Transform codec — encode and decode through the executor
//!
//! Fast path: with no transforms, encode and decode are local serde round
//! trips and never touch the executor or the seed source.
//! Slow path: encode attaches a fresh seed and the serialized request as
//! transient data and calls `private_encode`; decode sends the envelope to
//! `private_decode`.

use super::envelope::EncodedResponse;
use super::model::{EncodeRequest, Transform};
use crate::client::PrivateClient;
use crate::context::CallContext;
use crate::error::{PrivateError, Result};
use crate::executor::config::{self, Config};
use crate::executor::{ENDPOINT_DECODE, ENDPOINT_ENCODE};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

impl PrivateClient {
    /// Encode `message`, protecting the paths described by `transforms`.
    /// With no transforms the result is a thin wrapper over the message.
    pub async fn encode<M: Serialize + ?Sized>(
        &self,
        ctx: &CallContext,
        message: &M,
        transforms: &[Transform],
        mut configs: Vec<Config>,
    ) -> Result<EncodedResponse> {
        if transforms.is_empty() {
            // Kept raw even when the message carries its own `mxf` field
            let raw = serde_json::to_value(message)?;
            debug!("Encode fast path: no transforms");
            return Ok(EncodedResponse::Raw(raw));
        }

        for transform in transforms {
            transform.validate()?;
        }
        let request = EncodeRequest {
            message: serde_json::to_value(message)?,
            transforms: transforms.to_vec(),
        };
        configs.extend(config::with_transient_mxf(
            self.seeds.as_ref(),
            self.config.seed_size,
            &request,
        )?);

        let resp = self
            .guarded(
                ctx,
                ENDPOINT_ENCODE,
                &configs,
                self.executor.private_encode(ctx, &configs),
            )
            .await?;
        if let Some(msg) = resp.error_message() {
            warn!("Encode rejected by executor: {}", msg);
            return Err(PrivateError::EncodeError(msg.to_string()));
        }
        let encoded: EncodedResponse = resp.unmarshal()?;
        if !encoded.is_encoded() {
            debug!("Executor returned an untagged envelope for {} transforms", transforms.len());
        }
        Ok(encoded)
    }

    /// Decode a previously encoded response into `T`
    pub async fn decode<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        encoded: Option<&EncodedResponse>,
        mut configs: Vec<Config>,
    ) -> Result<T> {
        let encoded =
            encoded.ok_or_else(|| PrivateError::MissingInput("nil encoded message".into()))?;

        let envelope = match encoded {
            EncodedResponse::Raw(raw) => {
                // Through bytes so T's own text contract applies
                let raw_bytes = serde_json::to_vec(raw)?;
                return Ok(serde_json::from_slice(&raw_bytes)?);
            }
            EncodedResponse::Encoded(envelope) => envelope,
        };

        configs.push(config::with_param(envelope)?);
        let resp = self
            .guarded(
                ctx,
                ENDPOINT_DECODE,
                &configs,
                self.executor.private_decode(ctx, &configs),
            )
            .await?;
        if let Some(msg) = resp.error_message() {
            warn!("Decode rejected by executor: {}", msg);
            return Err(PrivateError::DecodeError(msg.to_string()));
        }
        Ok(resp.unmarshal()?)
    }
}
