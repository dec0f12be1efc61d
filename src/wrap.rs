//! Call wrapper — encode, call, decode as one unit of work
//!
//! The wrapped endpoint receives exactly one argument: the encoded payload.
//! Caller configs go to the wrapped call only, never to the encode or decode
//! steps, so they cannot clobber transient encode state.
//! The wrapper cannot check the endpoint's arity; an endpoint taking more
//! than one argument gets undefined behaviour on the executor side.

use crate::client::PrivateClient;
use crate::context::CallContext;
use crate::error::{PrivateError, Result};
use crate::executor::config::{self, Config};
use crate::transform::{EncodedResponse, Transform};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A remote method bracketed by encode and decode
#[derive(Clone)]
pub struct WrappedCall {
    client: PrivateClient,
    method: String,
    transforms: Vec<Transform>,
}

impl PrivateClient {
    /// Wrap `method` so its argument is encoded with `transforms` and its
    /// reply decoded
    pub fn wrap_call(&self, method: impl Into<String>, transforms: Vec<Transform>) -> WrappedCall {
        WrappedCall {
            client: self.clone(),
            method: method.into(),
            transforms,
        }
    }
}

impl WrappedCall {
    pub fn method(&self) -> &str {
        &self.method
    }

    pub async fn call<M, T>(&self, ctx: &CallContext, message: &M, configs: Vec<Config>) -> Result<T>
    where
        M: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let encoded = self
            .client
            .encode(ctx, message, &self.transforms, Vec::new())
            .await
            .map_err(|e| PrivateError::WrapEncodeError(Box::new(e)))?;

        let mut call_configs = Vec::with_capacity(configs.len() + 1);
        call_configs.push(config::with_param(&encoded)?);
        call_configs.extend(configs);

        let resp = self
            .client
            .guarded(
                ctx,
                &self.method,
                &call_configs,
                self.client.executor.call(ctx, &self.method, &call_configs),
            )
            .await
            .map_err(|e| PrivateError::WrapCallError(Box::new(e)))?;
        if let Some(msg) = resp.error_message() {
            return Err(PrivateError::WrapCallResponseError(msg.to_string()));
        }
        debug!("Wrapped call {} returned, decoding reply", self.method);

        let reply: EncodedResponse = resp
            .unmarshal()
            .map_err(|e| PrivateError::WrapDecodeError(Box::new(e.into())))?;
        self.client
            .decode(ctx, Some(&reply), Vec::new())
            .await
            .map_err(|e| PrivateError::WrapDecodeError(Box::new(e)))
    }
}
