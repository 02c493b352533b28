//! Asynchronous key-value storage shared by every scan.
//!
//! The store serializes individual `get`/`set`/`remove` calls but not
//! compound read-modify-write sequences; callers that need one (see
//! [`crate::dedup`]) must treat what they read as possibly stale by the time
//! they write.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::error::StoreError;

/// Get/set/remove semantics over JSON values keyed by string.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send;

    fn set(&self, key: &str, value: Value) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Reads `key` and deserializes it into `T`.
///
/// # Errors
///
/// Returns [`StoreError::Json`] if the stored value does not have the shape
/// of `T`, or any error from the backend.
pub async fn get_json<S, T>(store: &S, key: &str) -> Result<Option<T>, StoreError>
where
    S: KeyValueStore,
    T: DeserializeOwned,
{
    let Some(value) = store.get(key).await? else {
        return Ok(None);
    };
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| StoreError::Json {
            context: format!("key '{key}'"),
            source: e,
        })
}

/// Serializes `value` and writes it under `key`.
///
/// # Errors
///
/// Returns [`StoreError::Json`] if `value` cannot be serialized, or any error
/// from the backend.
pub async fn set_json<S, T>(store: &S, key: &str, value: &T) -> Result<(), StoreError>
where
    S: KeyValueStore,
    T: Serialize + ?Sized,
{
    let value = serde_json::to_value(value).map_err(|e| StoreError::Json {
        context: format!("key '{key}'"),
        source: e,
    })?;
    store.set(key, value).await
}

/// In-process store. Used by tests and by callers that embed the pipeline.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.lock().await.insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// Store persisted as a single JSON object on disk.
///
/// Each write rewrites the whole file through a temporary sibling and a
/// rename, so a crash mid-write leaves the previous contents intact. A missing
/// file reads as an empty store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    io_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Map<String, Value>, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Map::new());
        }
        serde_json::from_slice(&raw).map_err(|e| StoreError::Json {
            context: self.path.display().to_string(),
            source: e,
        })
    }

    async fn write_all(&self, entries: &Map<String, Value>) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(entries).map_err(|e| StoreError::Json {
            context: self.path.display().to_string(),
            source: e,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        tokio::fs::write(&tmp, body).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)
    }
}

impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let _guard = self.io_lock.lock().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let _guard = self.io_lock.lock().await;
        let mut entries = self.read_all().await?;
        entries.insert(key.to_owned(), value);
        self.write_all(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.io_lock.lock().await;
        let mut entries = self.read_all().await?;
        if entries.remove(key).is_some() {
            self.write_all(&entries).await?;
        }
        Ok(())
    }
}
