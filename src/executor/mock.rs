//! Scripted executor for tests
//!
//! Replays queued responses per endpoint and records every call it receives.

use super::config::Config;
use super::{ExecutorError, RemoteExecutor, Response};
use crate::context::CallContext;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A call as seen by the executor
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub configs: Vec<Config>,
    pub transaction_id: String,
}

type Scripted = Result<Response, ExecutorError>;

#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    responses: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Option<Duration>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every reply (for deadline/cancellation tests)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a response for `method`
    pub fn respond(&self, method: &str, response: Response) {
        self.push(method, Ok(response));
    }

    /// Queue a transport failure for `method`
    pub fn fail(&self, method: &str, error: ExecutorError) {
        self.push(method, Err(error));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    fn push(&self, method: &str, scripted: Scripted) {
        lock(&self.responses)
            .entry(method.to_string())
            .or_default()
            .push_back(scripted);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl RemoteExecutor for ScriptedExecutor {
    async fn call(
        &self,
        ctx: &CallContext,
        method: &str,
        configs: &[Config],
    ) -> Result<Response, ExecutorError> {
        lock(&self.calls).push(RecordedCall {
            method: method.to_string(),
            configs: configs.to_vec(),
            transaction_id: ctx.transaction_id(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = lock(&self.responses)
            .get_mut(method)
            .and_then(|queue| queue.pop_front());
        next.unwrap_or_else(|| Err(ExecutorError::UnknownEndpoint(method.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order() {
        let exec = ScriptedExecutor::new();
        exec.respond("m", Response::ok(b"1".to_vec()));
        exec.respond("m", Response::ok(b"2".to_vec()));
        let ctx = CallContext::background();

        assert_eq!(exec.call(&ctx, "m", &[]).await.unwrap().payload(), b"1");
        assert_eq!(exec.call(&ctx, "m", &[]).await.unwrap().payload(), b"2");
        assert!(matches!(
            exec.call(&ctx, "m", &[]).await,
            Err(ExecutorError::UnknownEndpoint(_))
        ));
        assert_eq!(exec.call_count(), 3);
    }

    #[tokio::test]
    async fn test_records_transaction_id() {
        let exec = ScriptedExecutor::new();
        exec.respond("m", Response::ok(b"null".to_vec()));
        let ctx = CallContext::background().with_transaction_id();
        ctx.set_transaction_id("tx-9");
        exec.call(&ctx, "m", &[]).await.unwrap();
        assert_eq!(exec.calls()[0].transaction_id, "tx-9");
    }
}
