//! In-process executor with a per-DSID vault
//!
//! Implements the five private data endpoints over JSON messages addressed by
//! dotted paths (`customer.address.street`, `$` or "" for the root). Private
//! sub-documents are moved into a vault keyed by DSID, and the encoded message
//! carries only an opaque base64 handle per transform. No cryptography happens
//! here: purging a subject deletes its vault entries, after which decodes
//! return the message without that subject's private fields.
//!
//! The vault can be persisted to a JSON file, like the CLI does.

use super::config::{self, Config, MXF_KEY, SEED_KEY};
use super::{
    ExecutorError, RemoteExecutor, Response, ENDPOINT_DECODE, ENDPOINT_ENCODE, ENDPOINT_EXPORT,
    ENDPOINT_PROFILE_TO_DSID, ENDPOINT_PURGE,
};
use crate::context::CallContext;
use crate::transform::{
    Compressor, Dsid, EncodeRequest, EncodedMessage, Encryptor, Transform, TransformBody,
};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex as StdMutex;
use tokio::sync::Mutex;

/// Envelope tag written on every encoded message
pub const ENVELOPE_TAG: &str = "1";

/// Most recent calls kept in the call log
pub const CALL_LOG_CAPACITY: usize = 256;

/// Handler for an application endpoint: positional params in, payload out
pub type MethodHandler = Box<dyn Fn(Vec<Value>) -> Result<Value, String> + Send + Sync>;

/// Private fields removed from one context of one message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultRecord {
    pub context_path: String,
    /// Private path -> removed value
    pub fields: Map<String, Value>,
    pub encryptor: Encryptor,
    pub compressor: Compressor,
    pub stored_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct VaultState {
    /// DSID -> handle -> record
    subjects: HashMap<String, HashMap<String, VaultRecord>>,
    total_encoded: u64,
    total_purged: u64,
}

pub struct MemoryExecutor {
    state: Mutex<VaultState>,
    path: Option<PathBuf>,
    methods: HashMap<String, MethodHandler>,
    call_log: StdMutex<VecDeque<String>>,
}

impl Default for MemoryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(VaultState::default()),
            path: None,
            methods: HashMap::new(),
            call_log: StdMutex::new(VecDeque::new()),
        }
    }

    /// Open a vault persisted at `path`, or start an empty one there
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut state = VaultState::default();
        if path.exists() {
            match std::fs::read_to_string(&path).map(|data| serde_json::from_str(&data)) {
                Ok(Ok(loaded)) => state = loaded,
                Ok(Err(e)) => warn!("Ignoring unreadable vault {}: {}", path.display(), e),
                Err(e) => warn!("Failed to read vault {}: {}", path.display(), e),
            }
        }
        Self {
            state: Mutex::new(state),
            path: Some(path),
            ..Self::new()
        }
    }

    /// Register an application endpoint (e.g. a method wrapped by `wrap_call`)
    pub fn with_method<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.methods.insert(name.to_string(), Box::new(handler));
        self
    }

    /// Persist the vault, if it was opened from a file
    pub async fn save(&self) -> std::io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = {
            let state = self.state.lock().await;
            serde_json::to_string_pretty(&*state).map_err(std::io::Error::other)?
        };
        tokio::fs::write(path, json).await
    }

    /// Most recent methods called, oldest first (at most `CALL_LOG_CAPACITY`)
    pub fn call_log(&self) -> Vec<String> {
        self.call_log
            .lock()
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear_call_log(&self) {
        if let Ok(mut log) = self.call_log.lock() {
            log.clear();
        }
    }

    /// Number of vault records held for `dsid`
    pub async fn record_count(&self, dsid: &Dsid) -> usize {
        let state = self.state.lock().await;
        state.subjects.get(dsid.as_str()).map_or(0, HashMap::len)
    }

    pub async fn summary(&self) -> String {
        let state = self.state.lock().await;
        let records: usize = state.subjects.values().map(HashMap::len).sum();
        format!(
            "Vault | {} subjects | {} records | {} encoded | {} purged",
            state.subjects.len(),
            records,
            state.total_encoded,
            state.total_purged
        )
    }

    async fn encode(&self, ctx: &CallContext, configs: &[Config]) -> Result<Value, String> {
        let seed = config::transient(configs, SEED_KEY).ok_or("missing transient seed")?;
        let raw_req = config::transient(configs, MXF_KEY).ok_or("missing transient mxf request")?;
        let req: EncodeRequest =
            serde_json::from_slice(raw_req).map_err(|e| format!("bad encode request: {}", e))?;

        let mut message = req.message;
        let mut transforms = Vec::with_capacity(req.transforms.len());
        let mut staged = Vec::with_capacity(req.transforms.len());

        for (index, transform) in req.transforms.iter().enumerate() {
            let header = transform
                .header
                .as_ref()
                .ok_or_else(|| format!("transform {} has no header", index))?;
            let context = get_path_mut(&mut message, &transform.context_path)
                .ok_or_else(|| format!("context path not found: {}", transform.context_path))?;

            let profile = extract_profile(context, &header.profile_paths)?;
            let dsid = dsid_for(&profile);

            let mut fields = Map::new();
            for path in &header.private_paths {
                let value = remove_path(context, path)
                    .ok_or_else(|| format!("private path not found: {}", path))?;
                fields.insert(path.clone(), value);
            }

            let handle = record_handle(seed, index, &dsid);
            transforms.push(Transform {
                context_path: transform.context_path.clone(),
                header: None,
                body: Some(TransformBody {
                    dsid: Dsid::new(dsid.clone()),
                    encrypted_base64: BASE64.encode(handle.as_bytes()),
                }),
            });
            staged.push((
                dsid,
                handle,
                VaultRecord {
                    context_path: transform.context_path.clone(),
                    fields,
                    encryptor: header.encryptor,
                    compressor: header.compressor,
                    stored_at: Utc::now(),
                },
            ));
        }

        {
            let mut state = self.state.lock().await;
            for (dsid, handle, record) in staged {
                state.subjects.entry(dsid).or_default().insert(handle, record);
            }
            state.total_encoded += 1;
        }
        ctx.set_transaction_id(uuid::Uuid::new_v4().to_string());
        self.autosave().await;

        let envelope = EncodedMessage {
            mxf: ENVELOPE_TAG.to_string(),
            message,
            transforms,
        };
        serde_json::to_value(envelope).map_err(|e| e.to_string())
    }

    async fn decode(&self, configs: &[Config]) -> Result<Value, String> {
        let envelope: EncodedMessage = serde_json::from_value(single_param(configs)?.clone())
            .map_err(|e| format!("bad envelope: {}", e))?;
        let mut message = envelope.message;

        let state = self.state.lock().await;
        for transform in &envelope.transforms {
            let Some(body) = &transform.body else {
                continue;
            };
            let handle = BASE64
                .decode(&body.encrypted_base64)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
                .ok_or("corrupt transform body")?;
            let record = state
                .subjects
                .get(body.dsid.as_str())
                .and_then(|records| records.get(&handle));
            let Some(record) = record else {
                debug!("No vault record for subject {}, leaving fields erased", body.dsid.short());
                continue;
            };
            let context = get_path_mut(&mut message, &transform.context_path)
                .ok_or_else(|| format!("context path not found: {}", transform.context_path))?;
            for (path, value) in &record.fields {
                if !insert_path(context, path, value.clone()) {
                    return Err(format!("cannot restore private path: {}", path));
                }
            }
        }
        Ok(message)
    }

    async fn export(&self, configs: &[Config]) -> Result<Value, String> {
        let dsid: Dsid = serde_json::from_value(single_param(configs)?.clone())
            .map_err(|e| format!("bad dsid: {}", e))?;

        let state = self.state.lock().await;
        let mut records: Vec<&VaultRecord> = state
            .subjects
            .get(dsid.as_str())
            .map(|records| records.values().collect())
            .unwrap_or_default();
        records.sort_by_key(|r| r.stored_at);

        let mut exported = Map::new();
        for record in records {
            for (path, value) in &record.fields {
                let key = if is_root(&record.context_path) {
                    path.clone()
                } else {
                    format!("{}.{}", record.context_path, path)
                };
                exported.insert(key, value.clone());
            }
        }
        Ok(Value::Object(exported))
    }

    async fn purge(&self, ctx: &CallContext, configs: &[Config]) -> Result<Value, String> {
        if config::transient(configs, SEED_KEY).is_none() {
            return Err("missing transient seed".into());
        }
        let dsid: Dsid = serde_json::from_value(single_param(configs)?.clone())
            .map_err(|e| format!("bad dsid: {}", e))?;

        let removed = {
            let mut state = self.state.lock().await;
            state.total_purged += 1;
            state.subjects.remove(dsid.as_str()).map_or(0, |r| r.len())
        };
        info!("Purged subject {}: {} records erased", dsid.short(), removed);
        ctx.set_transaction_id(uuid::Uuid::new_v4().to_string());
        self.autosave().await;

        Ok(Value::String(dsid.to_string()))
    }

    fn profile_to_dsid(&self, configs: &[Config]) -> Result<Value, String> {
        let profile = single_param(configs)?
            .as_object()
            .ok_or("profile must be an object")?;
        if profile.is_empty() {
            return Err("empty profile".into());
        }
        Ok(Value::String(dsid_for(profile)))
    }

    async fn autosave(&self) {
        if let Err(e) = self.save().await {
            warn!("Failed to auto-save vault: {}", e);
        }
    }
}

#[async_trait]
impl RemoteExecutor for MemoryExecutor {
    async fn call(
        &self,
        ctx: &CallContext,
        method: &str,
        configs: &[Config],
    ) -> Result<Response, ExecutorError> {
        if let Ok(mut log) = self.call_log.lock() {
            if log.len() == CALL_LOG_CAPACITY {
                log.pop_front();
            }
            log.push_back(method.to_string());
        }

        let result = match method {
            ENDPOINT_ENCODE => self.encode(ctx, configs).await,
            ENDPOINT_DECODE => self.decode(configs).await,
            ENDPOINT_EXPORT => self.export(configs).await,
            ENDPOINT_PURGE => self.purge(ctx, configs).await,
            ENDPOINT_PROFILE_TO_DSID => self.profile_to_dsid(configs),
            other => match self.methods.get(other) {
                Some(handler) => handler(config::params(configs).into_iter().cloned().collect()),
                None => return Err(ExecutorError::UnknownEndpoint(other.to_string())),
            },
        };

        match result {
            Ok(payload) => {
                Response::from_value(&payload).map_err(|e| ExecutorError::Transport(e.to_string()))
            }
            Err(msg) => Ok(Response::error(msg)),
        }
    }
}

fn single_param(configs: &[Config]) -> Result<&Value, String> {
    config::params(configs)
        .first()
        .copied()
        .ok_or_else(|| "missing call parameter".to_string())
}

/// Collect profile values keyed by path; every profile path must resolve
fn extract_profile(context: &Value, paths: &[String]) -> Result<Map<String, Value>, String> {
    if paths.is_empty() {
        return Err("transform has no profile paths".into());
    }
    let mut profile = Map::new();
    for path in paths {
        let value = get_path(context, path).ok_or_else(|| format!("profile path not found: {}", path))?;
        profile.insert(path.clone(), value.clone());
    }
    Ok(profile)
}

/// Deterministic DSID for a profile (serde_json maps serialize in key order)
fn dsid_for(profile: &Map<String, Value>) -> String {
    let mut h = Sha256::new();
    h.update(b"mxf-dsid-v1");
    h.update(serde_json::to_vec(profile).unwrap_or_default());
    format!("dsid-{}", &hex::encode(h.finalize())[..24])
}

fn record_handle(seed: &[u8], index: usize, dsid: &str) -> String {
    let mut h = Sha256::new();
    h.update(seed);
    h.update((index as u64).to_le_bytes());
    h.update(dsid.as_bytes());
    h.update(b"mxf-handle-v1");
    hex::encode(&h.finalize()[..16])
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.trim_start_matches('$').split('.').filter(|s| !s.is_empty())
}

fn is_root(path: &str) -> bool {
    segments(path).next().is_none()
}

fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    segments(path).try_fold(value, |v, seg| match v {
        Value::Object(map) => map.get(seg),
        Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn get_path_mut<'a>(value: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    segments(path).try_fold(value, |v, seg| match v {
        Value::Object(map) => map.get_mut(seg),
        Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
        _ => None,
    })
}

/// Split `path` into its parent path and final segment
fn split_parent(path: &str) -> Option<(String, &str)> {
    let segs: Vec<&str> = segments(path).collect();
    let (last, parents) = segs.split_last()?;
    Some((parents.join("."), *last))
}

/// Take the value at `path` out of its parent. Array elements are replaced
/// by `null` so sibling indices stay valid for later paths.
fn remove_path(value: &mut Value, path: &str) -> Option<Value> {
    let (parent, last) = split_parent(path)?;
    match get_path_mut(value, &parent)? {
        Value::Object(map) => map.remove(last),
        Value::Array(items) => {
            let slot = items.get_mut(last.parse::<usize>().ok()?)?;
            Some(std::mem::replace(slot, Value::Null))
        }
        _ => None,
    }
}

/// Insert `new` at `path`, creating intermediate objects. Array segments
/// must address an existing element or the next free index.
fn insert_path(value: &mut Value, path: &str, new: Value) -> bool {
    let segs: Vec<&str> = segments(path).collect();
    let Some((last, parents)) = segs.split_last() else {
        return false;
    };
    let mut cursor = value;
    for seg in parents {
        cursor = match cursor {
            Value::Object(map) => map
                .entry(seg.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            Value::Array(items) => match seg.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                Some(item) => item,
                None => return false,
            },
            _ => return false,
        };
    }
    match cursor {
        Value::Object(map) => {
            map.insert(last.to_string(), new);
            true
        }
        Value::Array(items) => match last.parse::<usize>() {
            Ok(i) if i < items.len() => {
                items[i] = new;
                true
            }
            Ok(i) if i == items.len() => {
                items.push(new);
                true
            }
            _ => false,
        },
        _ => false,
    }
}
