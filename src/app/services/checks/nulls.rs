//! Null checks: windowed aggregate counts and edge-triggered runs
//!
//! A null observation is a well-formed numerical record whose payload is
//! absent. The aggregate check raises one event when a closed window's null
//! count reaches the configured threshold for the window's duration class.
//! The consecutive check counts uninterrupted nulls along event time and
//! raises exactly one event per run, the moment the run reaches the
//! configured length.

use std::collections::HashMap;

use crate::app::models::{Puid, QcEvent, SemanticObservation};
use crate::app::services::registry::{keys, RegistryClient};
use crate::app::services::thresholds::WindowClass;

use super::WindowSnapshot;

/// Window-scoped null count check
#[derive(Debug, Clone)]
pub struct NullAggregateCheck {
    registry: RegistryClient,
}

impl NullAggregateCheck {
    /// Create a null-aggregate check over a registry client
    pub fn new(registry: RegistryClient) -> Self {
        Self { registry }
    }

    /// Evaluate a closed window's null subset against the configured count
    /// threshold for its duration class.
    ///
    /// The emitted description reads "Consecutive Nulls" for compatibility
    /// with downstream consumers even though the count is an aggregate.
    pub async fn evaluate(&self, window: &WindowSnapshot) -> Vec<QcEvent> {
        if window.null_count == 0 {
            return Vec::new();
        }

        let class = WindowClass::classify(window.span_ms());
        let key = keys::null_aggregate(&window.puid.key_prefix(), class);
        let Some(threshold) = self.registry.get_i64(&key).await else {
            return Vec::new();
        };

        if threshold > 0 && window.null_count as i64 >= threshold {
            vec![QcEvent::new(
                window.puid.clone(),
                format!("Consecutive Nulls: {}", window.null_count),
                window.window_start,
                window.window_end,
            )]
        } else {
            Vec::new()
        }
    }
}

/// An in-progress run of null observations
#[derive(Debug, Clone, Copy)]
struct NullRun {
    count: i64,
    run_start: i64,
}

/// Stateful edge-triggered consecutive-null check, keyed by PUID
#[derive(Debug)]
pub struct NullConsecutiveCheck {
    registry: RegistryClient,
    runs: HashMap<Puid, NullRun>,
}

impl NullConsecutiveCheck {
    /// Create a null-consecutive check over a registry client
    pub fn new(registry: RegistryClient) -> Self {
        Self {
            registry,
            runs: HashMap::new(),
        }
    }

    /// Feed one observation in event-time order.
    ///
    /// Nulls extend the PUID's current run; any non-null reading resets it.
    /// One event is emitted per run, exactly when the run length reaches the
    /// configured threshold; further nulls extend the run silently.
    pub async fn evaluate(&mut self, observation: &SemanticObservation) -> Vec<QcEvent> {
        if !observation.is_null() {
            self.runs.remove(&observation.puid);
            return Vec::new();
        }

        let run = self
            .runs
            .entry(observation.puid.clone())
            .or_insert(NullRun {
                count: 0,
                run_start: observation.phenomenon_time_start,
            });
        run.count += 1;
        let run = *run;

        let key = keys::null_consecutive(&observation.puid.key_prefix());
        let Some(threshold) = self.registry.get_i64(&key).await else {
            return Vec::new();
        };

        if threshold > 0 && run.count == threshold {
            vec![QcEvent::new(
                observation.puid.clone(),
                format!("Consecutive nulls: {}", run.count),
                run.run_start,
                observation.phenomenon_time_end,
            )]
        } else {
            Vec::new()
        }
    }
}
