//! Call configuration and transient data
//!
//! Transient entries live for exactly one call and are never persisted by the
//! executor. Reserved keys:
//! - `csprng_seed_private`: fresh CSPRNG seed
//! - `mxf`: serialized encode request
//! - `transient_ivs`: legacy per-call IVs, NOT compatible with `mxf`

use crate::error::{PrivateError, Result};
use crate::seed::SeedSource;
use crate::transform::EncodeRequest;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

pub const SEED_KEY: &str = "csprng_seed_private";
pub const MXF_KEY: &str = "mxf";
pub const IVS_KEY: &str = "transient_ivs";

/// One entry in the config list passed to an executor call
#[derive(Debug, Clone, PartialEq)]
pub enum Config {
    /// Positional call arguments
    Params(Vec<Value>),
    /// Single-call data under a reserved key
    TransientData { key: String, value: Vec<u8> },
    /// Upper bound for this call
    Timeout(Duration),
}

pub fn with_params(args: Vec<Value>) -> Config {
    Config::Params(args)
}

/// Pass a single argument to the endpoint
pub fn with_param<T: Serialize + ?Sized>(arg: &T) -> Result<Config> {
    Ok(Config::Params(vec![serde_json::to_value(arg)?]))
}

pub fn with_transient_data(key: impl Into<String>, value: Vec<u8>) -> Config {
    Config::TransientData {
        key: key.into(),
        value,
    }
}

pub fn with_timeout(timeout: Duration) -> Config {
    Config::Timeout(timeout)
}

/// Attach a freshly generated seed
pub fn with_seed(source: &dyn SeedSource, size: usize) -> Result<Config> {
    if size == 0 {
        return Err(PrivateError::Seed("seed size must be non-zero".into()));
    }
    let seed = source.generate(size)?;
    Ok(with_transient_data(SEED_KEY, seed))
}

/// Transient data used by the executor to encode and encrypt: a fresh seed
/// plus the serialized request. Not compatible with `with_transient_ivs`.
pub fn with_transient_mxf(
    source: &dyn SeedSource,
    seed_size: usize,
    req: &EncodeRequest,
) -> Result<Vec<Config>> {
    let seed = with_seed(source, seed_size)?;
    let req_bytes = serde_json::to_vec(req)?;
    Ok(vec![seed, with_transient_data(MXF_KEY, req_bytes)])
}

/// Legacy per-call IVs for endpoints that encrypt new data themselves
pub fn with_transient_ivs(ivs: Vec<u8>) -> Config {
    with_transient_data(IVS_KEY, ivs)
}

/// Last transient value stored under `key`
pub fn transient<'a>(configs: &'a [Config], key: &str) -> Option<&'a [u8]> {
    configs.iter().rev().find_map(|c| match c {
        Config::TransientData { key: k, value } if k == key => Some(value.as_slice()),
        _ => None,
    })
}

/// All positional params, in order
pub fn params(configs: &[Config]) -> Vec<&Value> {
    configs
        .iter()
        .filter_map(|c| match c {
            Config::Params(args) => Some(args.iter()),
            _ => None,
        })
        .flatten()
        .collect()
}

/// Tightest timeout in the list
pub fn timeout(configs: &[Config]) -> Option<Duration> {
    configs
        .iter()
        .filter_map(|c| match c {
            Config::Timeout(d) => Some(*d),
            _ => None,
        })
        .min()
}

/// Reject config lists that mix the encode request with legacy IVs
pub fn check_compatible(configs: &[Config]) -> Result<()> {
    if transient(configs, MXF_KEY).is_some() && transient(configs, IVS_KEY).is_some() {
        return Err(PrivateError::InvalidArgument(format!(
            "transient '{}' cannot be combined with '{}'",
            MXF_KEY, IVS_KEY
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::DeterministicSeedSource;
    use serde_json::json;

    #[test]
    fn test_params_flatten_in_order() {
        let configs = vec![
            with_param("first").unwrap(),
            with_transient_data(SEED_KEY, vec![1, 2, 3]),
            with_params(vec![json!(2), json!({"x": 3})]),
        ];
        let p = params(&configs);
        assert_eq!(p, vec![&json!("first"), &json!(2), &json!({"x": 3})]);
    }

    #[test]
    fn test_transient_last_wins() {
        let configs = vec![
            with_transient_data(SEED_KEY, vec![1]),
            with_transient_data(SEED_KEY, vec![2]),
        ];
        assert_eq!(transient(&configs, SEED_KEY), Some(&[2u8][..]));
        assert_eq!(transient(&configs, MXF_KEY), None);
    }

    #[test]
    fn test_transient_mxf_carries_both_keys() {
        let source = DeterministicSeedSource::new(1);
        let req = EncodeRequest {
            message: json!({"name": "alice"}),
            transforms: vec![],
        };
        let configs = with_transient_mxf(&source, 32, &req).unwrap();
        assert_eq!(transient(&configs, SEED_KEY).unwrap().len(), 32);
        let raw = transient(&configs, MXF_KEY).unwrap();
        let decoded: EncodeRequest = serde_json::from_slice(raw).unwrap();
        assert_eq!(decoded.message, json!({"name": "alice"}));
    }

    #[test]
    fn test_mxf_and_ivs_rejected() {
        let configs = vec![
            with_transient_data(MXF_KEY, b"{}".to_vec()),
            with_transient_ivs(vec![0; 16]),
        ];
        assert!(matches!(
            check_compatible(&configs),
            Err(PrivateError::InvalidArgument(_))
        ));
        assert!(check_compatible(&configs[..1]).is_ok());
    }

    #[test]
    fn test_tightest_timeout() {
        let configs = vec![
            with_timeout(Duration::from_secs(5)),
            with_timeout(Duration::from_secs(1)),
        ];
        assert_eq!(timeout(&configs), Some(Duration::from_secs(1)));
        assert_eq!(timeout(&[]), None);
    }
}
