//! CSPRNG seed sources
//!
//! Every encode and purge draws a fresh seed. The source is injected into the
//! client so tests can swap in a reproducible one without touching the
//! protocol logic.

use crate::error::{PrivateError, Result};
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use std::sync::Mutex;

/// Default seed length in bytes (HKDF input size expected by the executor)
pub const DEFAULT_SEED_SIZE: usize = 32;

/// A source of secret seed material
pub trait SeedSource: Send + Sync {
    /// Produce `size` fresh bytes. Must never return the same bytes twice.
    fn generate(&self, size: usize) -> Result<Vec<u8>>;
}

/// Seeds drawn from the operating system CSPRNG
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSeedSource;

impl SeedSource for OsSeedSource {
    fn generate(&self, size: usize) -> Result<Vec<u8>> {
        let mut seed = vec![0u8; size];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| PrivateError::Seed(e.to_string()))?;
        Ok(seed)
    }
}

/// Reproducible seeds for tests. Successive calls still differ because the
/// generator state advances.
pub struct DeterministicSeedSource {
    rng: Mutex<StdRng>,
}

impl DeterministicSeedSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl SeedSource for DeterministicSeedSource {
    fn generate(&self, size: usize) -> Result<Vec<u8>> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| PrivateError::Seed("seed generator poisoned".into()))?;
        let mut seed = vec![0u8; size];
        rng.fill_bytes(&mut seed);
        Ok(seed)
    }
}
