//! Tests for the streaming pipeline


use std::sync::Arc;

use crate::app::models::{Puid, SemanticObservation};
use crate::app::services::registry::{InMemoryStore, RegistryClient};
use crate::config::RegistryConfig;

/// Stream key used across pipeline tests
pub fn puid() -> Puid {
    Puid::new("A", "B", "C")
}

/// Build a registry client over pre-populated entries
pub fn registry_with(entries: &[(&str, &str)]) -> RegistryClient {
    let store = Arc::new(InMemoryStore::with_entries(
        entries.iter().map(|(k, v)| (*k, *v)),
    ));
    RegistryClient::new(store, RegistryConfig::default())
}

/// Numeric observation at an instant
pub fn numeric_obs(instant: i64, value: f64) -> SemanticObservation {
    SemanticObservation::numerical(puid(), instant, instant, Some(value)).unwrap()
}

/// Null observation at an instant
pub fn null_obs(instant: i64) -> SemanticObservation {
    SemanticObservation::numerical(puid(), instant, instant, None).unwrap()
}
