//! Tests for threshold resolution


use crate::app::services::registry::{InMemoryStore, RegistryClient};
use crate::config::RegistryConfig;
use std::sync::Arc;

use super::ThresholdResolver;

/// Build a resolver over an in-memory registry pre-populated with entries
pub fn resolver_with(entries: &[(&str, &str)]) -> ThresholdResolver {
    let store = Arc::new(InMemoryStore::with_entries(
        entries.iter().map(|(k, v)| (*k, *v)),
    ));
    ThresholdResolver::new(RegistryClient::new(store, RegistryConfig::default()))
}
