//! Persistent key-value storage for history, exclusions and the profile.
//!
//! Records are written inside a small versioned envelope. Loads never fail:
//! a missing, corrupt or unknown-version record falls back to the default
//! value, and save failures are logged and dropped. Persistence here is
//! best-effort; callers keep working from their in-memory state.

use std::{
    collections::HashMap,
    fmt::Debug,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::StorageError;

pub const HISTORY_KEY: &str = "weather-search-history";
pub const EXCLUSIONS_KEY: &str = "weather-deleted-locations";
pub const PROFILE_KEY: &str = "weather-app-profile";

/// Version written by this build. Bare values without an envelope are
/// treated as version 0.
pub const RECORD_VERSION: u32 = 1;

pub trait KeyValueStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// One JSON file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;

        // write-then-rename so a crash never leaves a half-written record
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored text for a key, bypassing the versioned decoding.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries.lock().insert(key.to_string(), value.to_string());
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    data: &'a T,
}

/// Reads a record, returning `None` if it is missing or unusable.
pub fn load_record<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to read stored record, using default");
            return None;
        }
    };

    match decode_record(&raw) {
        Ok(value) => Some(value),
        Err(reason) => {
            tracing::warn!(key, %reason, "discarding stored record, using default");
            None
        }
    }
}

fn decode_record<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    let value: Value = serde_json::from_str(raw).map_err(|e| format!("corrupt JSON: {e}"))?;

    let (version, data) = match value {
        Value::Object(mut map)
            if map.len() == 2 && map.contains_key("version") && map.contains_key("data") =>
        {
            let version = map
                .get("version")
                .and_then(Value::as_u64)
                .ok_or_else(|| "record version is not a number".to_string())?;
            (version, map.remove("data").unwrap_or(Value::Null))
        }
        bare => (0, bare),
    };

    if version > u64::from(RECORD_VERSION) {
        return Err(format!("record version {version} is newer than {RECORD_VERSION}"));
    }

    // Version 0 and 1 share a layout; v0 is just missing the envelope.
    serde_json::from_value(data).map_err(|e| format!("unexpected shape (v{version}): {e}"))
}

/// Writes a record inside the current envelope.
pub fn save_record<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let text = serde_json::to_string(&EnvelopeRef { version: RECORD_VERSION, data: value })?;
    store.set(key, &text)
}

/// [`save_record`], with failures logged and ignored.
pub fn persist<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) {
    if let Err(e) = save_record(store, key, value) {
        tracing::warn!(key, error = %e, "failed to persist record");
    }
}

/// Removes a record, with failures logged and ignored.
pub fn forget(store: &dyn KeyValueStore, key: &str) {
    if let Err(e) = store.remove(key) {
        tracing::warn!(key, error = %e, "failed to remove stored record");
    }
}
