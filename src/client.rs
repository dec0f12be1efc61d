//! Private data client
//!
//! Bundles the remote executor, the seed source and client settings. The
//! encode/decode, data subject and call-wrapping operations are implemented
//! on this type in their own modules.

use crate::context::CallContext;
use crate::error::{PrivateError, Result};
use crate::executor::config::{self, Config};
use crate::executor::{ExecutorError, RemoteExecutor, Response};
use crate::seed::{OsSeedSource, SeedSource, DEFAULT_SEED_SIZE};
use log::debug;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Length of each CSPRNG seed in bytes
    pub seed_size: usize,
    /// Bound for executor calls when neither the context nor the call configs
    /// set one (milliseconds)
    pub default_timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            seed_size: DEFAULT_SEED_SIZE,
            default_timeout_ms: None,
        }
    }
}

impl ClientConfig {
    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| PrivateError::Config(format!("{}: {}", path.display(), e)))?;
        let config: ClientConfig = serde_json::from_str(&data)
            .map_err(|e| PrivateError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.seed_size == 0 {
            return Err(PrivateError::Config("seed_size must be non-zero".into()));
        }
        Ok(())
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }
}

/// Handle to the remote executor's private data endpoints
#[derive(Clone)]
pub struct PrivateClient {
    pub(crate) executor: Arc<dyn RemoteExecutor>,
    pub(crate) seeds: Arc<dyn SeedSource>,
    pub config: ClientConfig,
}

impl PrivateClient {
    /// Create a client drawing seeds from the OS CSPRNG
    pub fn new(executor: Arc<dyn RemoteExecutor>) -> Self {
        Self {
            executor,
            seeds: Arc::new(OsSeedSource),
            config: ClientConfig::default(),
        }
    }

    /// Replace the seed source (e.g. a deterministic one in tests)
    pub fn with_seed_source(mut self, seeds: Arc<dyn SeedSource>) -> Self {
        self.seeds = seeds;
        self
    }

    pub fn with_config(mut self, config: ClientConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn executor(&self) -> &Arc<dyn RemoteExecutor> {
        &self.executor
    }

    /// Transient seed entry for one call
    pub(crate) fn seed_config(&self) -> Result<Config> {
        config::with_seed(self.seeds.as_ref(), self.config.seed_size)
    }

    /// Run one executor call under `ctx`, after checking the config list.
    /// The call future is lazy, so an invalid list never reaches the executor.
    pub(crate) async fn guarded<F>(
        &self,
        ctx: &CallContext,
        method: &str,
        configs: &[Config],
        call: F,
    ) -> Result<Response>
    where
        F: Future<Output = std::result::Result<Response, ExecutorError>>,
    {
        config::check_compatible(configs)?;
        let fallback = match (config::timeout(configs), self.config.default_timeout()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        debug!("Calling {} with {} config entries", method, configs.len());
        ctx.run(method, fallback, call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::mock::ScriptedExecutor;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.seed_size, 32);
        assert_eq!(config.default_timeout(), None);
    }

    #[test]
    fn test_load_config() {
        let path = std::env::temp_dir().join(format!("mxf-config-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{"default_timeout_ms": 1500}"#).unwrap();
        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.seed_size, 32);
        assert_eq!(config.default_timeout(), Some(Duration::from_millis(1500)));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_rejects_zero_seed() {
        let path = std::env::temp_dir().join(format!("mxf-config-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{"seed_size": 0}"#).unwrap();
        assert!(matches!(ClientConfig::load(&path), Err(PrivateError::Config(_))));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_with_config_rejects_zero_seed() {
        let client = PrivateClient::new(Arc::new(ScriptedExecutor::new()));
        let zero = ClientConfig {
            seed_size: 0,
            ..ClientConfig::default()
        };
        assert!(matches!(
            client.clone().with_config(zero),
            Err(PrivateError::Config(_))
        ));

        let tuned = ClientConfig {
            seed_size: 16,
            default_timeout_ms: Some(250),
        };
        let client = client.with_config(tuned.clone()).unwrap();
        assert_eq!(client.config, tuned);
    }

    #[test]
    fn test_zero_seed_size_never_drawn() {
        // The config field is public, so seed draws check the size again
        let mut client = PrivateClient::new(Arc::new(ScriptedExecutor::new()));
        client.config.seed_size = 0;
        assert!(matches!(client.seed_config(), Err(PrivateError::Seed(_))));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            ClientConfig::load("/nonexistent/mxf.json"),
            Err(PrivateError::Config(_))
        ));
    }
}
