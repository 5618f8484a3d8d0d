//! Key-value store abstraction behind the registry client
//!
//! The QC engine is read-only with respect to the registry; this module
//! exposes the narrow fetch contract the client needs plus an in-memory
//! implementation used for snapshot replay and tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use tracing::info;

use crate::{Error, Result};

/// Errors surfaced by a key-value store backend.
///
/// The registry client translates every one of these to an absent value, so
/// a broken backend can never poison the stream.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend unreachable or connection dropped
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Backend reachable but the read failed
    #[error("store read failed: {0}")]
    ReadFailed(String),
}

/// Read-only view over the registry's key-value storage engine.
///
/// Keys are colon-delimited ASCII strings; values are scalar strings parsed
/// on demand by the caller.
#[async_trait]
pub trait KeyValueStore: std::fmt::Debug + Send + Sync {
    /// Fetch the raw stored value for a key, or `None` when absent
    async fn fetch(&self, key: &str) -> std::result::Result<Option<String>, StoreError>;
}

/// In-memory key-value store backing snapshot replay and tests
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated from key-value pairs
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Load a harvested registry snapshot: a JSON object mapping keys to
    /// scalar string values
    pub fn load_snapshot(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::io(format!("failed to read snapshot '{}'", path.display()), e)
        })?;
        let entries: HashMap<String, String> = serde_json::from_str(&raw).map_err(|e| {
            Error::registry(format!(
                "snapshot '{}' is not a JSON string map: {}",
                path.display(),
                e
            ))
        })?;

        info!(
            "Loaded registry snapshot '{}' with {} entries",
            path.display(),
            entries.len()
        );

        Ok(Self {
            entries: RwLock::new(entries),
        })
    }

    /// Insert or replace an entry
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .write()
            .expect("registry store lock poisoned")
            .insert(key.into(), value.into());
    }

    /// Remove an entry
    pub fn remove(&self, key: &str) {
        self.entries
            .write()
            .expect("registry store lock poisoned")
            .remove(key);
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .expect("registry store lock poisoned")
            .len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn fetch(&self, key: &str) -> std::result::Result<Option<String>, StoreError> {
        Ok(self
            .entries
            .read()
            .map_err(|_| StoreError::ReadFailed("store lock poisoned".to_string()))?
            .get(key)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_fetch_present_and_absent() {
        let store = InMemoryStore::with_entries([("a::b", "1")]);
        assert_eq!(store.fetch("a::b").await.unwrap(), Some("1".to_string()));
        assert_eq!(store.fetch("a::c").await.unwrap(), None);
    }

    #[test]
    fn test_snapshot_loading() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"k::1": "v1", "k::2": "v2"}}"#).unwrap();

        let store = InMemoryStore::load_snapshot(file.path()).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_snapshot_rejects_non_string_map() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"["not", "a", "map"]"#).unwrap();

        assert!(InMemoryStore::load_snapshot(file.path()).is_err());
    }
}
