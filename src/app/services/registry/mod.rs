//! Registry client service for threshold and metadata lookups
//!
//! This module provides the read-only view over the registry's key-value
//! store that every check operator consults. Lookups are total: absence,
//! malformed values, backend errors, and timeouts all map to an absent
//! result so one broken registry entry cannot poison the stream.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::RegistryConfig;
use crate::constants::{KEY_SEPARATOR, REGISTRY_CACHE_MAX_ENTRIES};

pub mod keys;
pub mod store;

#[cfg(test)]
pub mod tests;

// Re-export key types for convenience
pub use store::{InMemoryStore, KeyValueStore, StoreError};

/// Cached lookup result; negative results are cached too so a hot missing
/// key does not hammer the backend
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Option<String>,
    fetched_at: Instant,
}

/// Read-only registry client shared by the check operators of a partition.
///
/// Wraps a [`KeyValueStore`] with a bounded TTL cache, a per-call timeout,
/// and rate-limited warnings per key-pattern.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    store: Arc<dyn KeyValueStore>,
    config: RegistryConfig,
    cache: Arc<Mutex<HashMap<String, CacheEntry>>>,
    last_warned: Arc<Mutex<HashMap<String, Instant>>>,
}

impl RegistryClient {
    /// Create a client over a store handle
    pub fn new(store: Arc<dyn KeyValueStore>, config: RegistryConfig) -> Self {
        Self {
            store,
            config,
            cache: Arc::new(Mutex::new(HashMap::new())),
            last_warned: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Fetch the raw value for a key.
    ///
    /// Total: backend errors and timeouts are logged (rate-limited) and
    /// returned as `None`, indistinguishable from a genuinely absent entry.
    pub async fn get(&self, key: &str) -> Option<String> {
        if let Some(cached) = self.cached(key).await {
            return cached;
        }

        let fetched =
            match tokio::time::timeout(self.config.lookup_timeout(), self.store.fetch(key)).await {
                Ok(Ok(value)) => value,
                Ok(Err(e)) => {
                    self.warn_lookup(key, &format!("store error: {e}")).await;
                    None
                }
                Err(_) => {
                    self.warn_lookup(key, "lookup timed out").await;
                    None
                }
            };

        self.remember(key, fetched.clone()).await;
        fetched
    }

    /// Fetch and parse a floating-point value; malformed values are logged
    /// and treated as absent
    pub async fn get_f64(&self, key: &str) -> Option<f64> {
        let raw = self.get(key).await?;
        match raw.trim().parse::<f64>() {
            Ok(value) => Some(value),
            Err(_) => {
                self.warn_lookup(key, &format!("expected a number, found '{raw}'"))
                    .await;
                None
            }
        }
    }

    /// Fetch and parse an integer value; malformed values are logged and
    /// treated as absent
    pub async fn get_i64(&self, key: &str) -> Option<i64> {
        let raw = self.get(key).await?;
        match raw.trim().parse::<i64>() {
            Ok(value) => Some(value),
            Err(_) => {
                self.warn_lookup(key, &format!("expected an integer, found '{raw}'"))
                    .await;
                None
            }
        }
    }

    /// Fetch a `::`-separated enumeration; absent keys yield an empty list.
    /// Element order follows the stored enumeration order.
    pub async fn get_list(&self, key: &str) -> Vec<String> {
        match self.get(key).await {
            Some(raw) => raw
                .split(KEY_SEPARATOR)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Drop cached state and release the store handle
    pub async fn close(&self) {
        self.cache.lock().await.clear();
        debug!("registry client closed");
    }

    async fn cached(&self, key: &str) -> Option<Option<String>> {
        let cache = self.cache.lock().await;
        let entry = cache.get(key)?;
        if entry.fetched_at.elapsed() <= self.config.cache_ttl() {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    async fn remember(&self, key: &str, value: Option<String>) {
        let mut cache = self.cache.lock().await;
        if cache.len() >= REGISTRY_CACHE_MAX_ENTRIES {
            let ttl = self.config.cache_ttl();
            cache.retain(|_, entry| entry.fetched_at.elapsed() <= ttl);
            if cache.len() >= REGISTRY_CACHE_MAX_ENTRIES {
                cache.clear();
            }
        }
        cache.insert(
            key.to_string(),
            CacheEntry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Log a lookup problem at most once per warn interval per key-pattern
    async fn warn_lookup(&self, key: &str, reason: &str) {
        let pattern = key_pattern(key);
        let mut last_warned = self.last_warned.lock().await;
        let due = last_warned
            .get(&pattern)
            .map_or(true, |at| at.elapsed() >= self.config.warn_interval());
        if due {
            warn!("registry lookup '{key}' degraded: {reason}");
            last_warned.insert(pattern, Instant::now());
        } else {
            debug!("registry lookup '{key}' degraded: {reason}");
        }
    }
}

/// Collapse a key to its family pattern for warning rate-limiting: the PUID
/// prefix (first three segments) is dropped so every sensor sharing a broken
/// family warns through one slot.
fn key_pattern(key: &str) -> String {
    let segments: Vec<&str> = key.split(KEY_SEPARATOR).collect();
    if segments.len() > 3 {
        segments[3..].join(KEY_SEPARATOR)
    } else {
        key.to_string()
    }
}
