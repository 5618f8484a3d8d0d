//! Tests for the QC check operators

pub mod delta_tests;
pub mod metadata_tests;

use std::sync::Arc;

use crate::app::models::{Puid, SemanticObservation};
use crate::app::services::registry::{InMemoryStore, RegistryClient};
use crate::app::services::thresholds::ThresholdResolver;
use crate::config::RegistryConfig;

use super::{WelfordAccumulator, WindowSnapshot};

/// Stream key used across check tests
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

/// Build a threshold resolver over pre-populated entries
pub fn resolver_with(entries: &[(&str, &str)]) -> ThresholdResolver {
    ThresholdResolver::new(registry_with(entries))
}

/// Numeric observation at an instant
pub fn numeric_obs(instant: i64, value: f64) -> SemanticObservation {
    SemanticObservation::numerical(puid(), instant, instant, Some(value)).unwrap()
}

/// Null observation at an instant
pub fn null_obs(instant: i64) -> SemanticObservation {
    SemanticObservation::numerical(puid(), instant, instant, None).unwrap()
}

/// Build a window snapshot over numeric values spaced a minute apart from
/// the window start, with an explicit null count
pub fn window_with(
    window_start: i64,
    window_end: i64,
    values: &[f64],
    null_count: usize,
) -> WindowSnapshot {
    let mut stats = WelfordAccumulator::new();
    let mut instants = Vec::new();
    for (index, &value) in values.iter().enumerate() {
        stats.push(value);
        instants.push(window_start + index as i64 * 60_000);
    }
    WindowSnapshot::new(puid(), window_start, window_end, stats, instants, null_count)
}
