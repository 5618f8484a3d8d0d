//! Tests for the registry client service


use super::store::{InMemoryStore, KeyValueStore, StoreError};
use super::RegistryClient;
use crate::config::RegistryConfig;
use async_trait::async_trait;
use std::sync::Arc;

/// Build a client over an in-memory store pre-populated with entries
pub fn client_with(entries: &[(&str, &str)]) -> (Arc<InMemoryStore>, RegistryClient) {
    let store = Arc::new(InMemoryStore::with_entries(
        entries.iter().map(|(k, v)| (*k, *v)),
    ));
    let client = RegistryClient::new(store.clone(), RegistryConfig::default());
    (store, client)
}

/// Store that fails every fetch, for degraded-backend tests
#[derive(Debug)]
pub struct BrokenStore;

#[async_trait]
impl KeyValueStore for BrokenStore {
    async fn fetch(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

/// Store that never answers, for timeout tests
#[derive(Debug)]
pub struct StalledStore;

#[async_trait]
impl KeyValueStore for StalledStore {
    async fn fetch(&self, _key: &str) -> Result<Option<String>, StoreError> {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        Ok(None)
    }
}
