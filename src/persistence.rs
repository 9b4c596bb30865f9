//! Key-value persistence boundary
//!
//! The console keeps its configuration and presets in a string key-value
//! store. The core never treats a store failure as fatal: [`load_or`] falls
//! back to the caller's default and [`save_json`] only logs a warning.

use anyhow::Context;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::{ConsoleError, Result};

/// Store keys used by the core
pub mod keys {
    /// Persisted [`SessionConfig`](crate::SessionConfig)
    pub const CONFIG: &str = "netpulse_config";

    /// Persisted preset list
    pub const PRESETS: &str = "netpulse_presets";
}

/// String key-value store collaborator
pub trait KeyValueStore: Send + Sync + 'static {
    /// Load a value; `Ok(None)` when the key was never saved
    fn load(&self, key: &str) -> Result<Option<String>>;

    fn save(&self, key: &str, value: &str) -> Result<()>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| ConsoleError::storage_error(key, "memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ConsoleError::storage_error(key, "memory store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Directory-backed store: one `<key>.json` file per key
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Use `dir`, creating it if needed
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| ConsoleError::file_error(dir.clone(), e))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(ConsoleError::storage_error(key, "key is not a valid file name"));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConsoleError::file_error(path, e)),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        std::fs::write(&path, value).map_err(|e| ConsoleError::file_error(path, e))
    }
}

/// Load and decode a JSON value, falling back on any failure
pub fn load_or<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str, fallback: T) -> T {
    match decode(store, key) {
        Ok(Some(value)) => value,
        Ok(None) => {
            debug!(key, "No stored value, using defaults");
            fallback
        }
        Err(e) => {
            warn!(key, error = format!("{e:#}"), "Failed to load stored value, using defaults");
            fallback
        }
    }
}

fn decode<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> anyhow::Result<Option<T>> {
    let Some(raw) = store.load(key).context("store load failed")? else {
        return Ok(None);
    };
    let value = serde_json::from_str(&raw).with_context(|| format!("invalid JSON under {key}"))?;
    Ok(Some(value))
}

/// Encode and save a JSON value; returns whether it was stored
pub fn save_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> bool {
    let result = serde_json::to_string(value)
        .context("encode failed")
        .and_then(|raw| store.save(key, &raw).context("store save failed"));
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!(key, error = format!("{e:#}"), "Failed to persist value");
            false
        }
    }
}
