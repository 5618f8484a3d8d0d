//! Delta checks: step and spike over consecutive numeric readings
//!
//! Both checks advance along the event-time-ordered numeric stream of one
//! PUID. The step check compares the absolute difference of consecutive
//! values `(p, c)` against the resolved max; the spike check compares the
//! centred second-difference magnitude `|2c - p - n|` of a triple and is
//! emitted against the middle observation.
//!
//! Arrivals may be slightly out of order: a small reorder buffer sorts by
//! phenomenon start time before values advance into evaluation. Anything
//! displaced beyond the buffer is dropped from delta evaluation only; it
//! still flows through every other operator.

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::app::models::{family_test_id, Bound, CheckFamily, Puid, QcOutcome, SemanticObservation};
use crate::app::services::thresholds::ThresholdResolver;

/// A numeric reading queued for delta evaluation
#[derive(Debug, Clone, Copy)]
struct Reading {
    instant: i64,
    value: f64,
}

/// Per-PUID delta state: the reorder buffer and the advanced readings
#[derive(Debug, Default)]
struct DeltaState {
    /// Readings awaiting release, sorted by instant
    pending: Vec<Reading>,
    /// The last up-to-three released readings
    recent: VecDeque<Reading>,
    /// Instant of the newest released reading; older arrivals are dropped
    watermark: Option<i64>,
    /// Readings dropped for arriving behind the watermark
    dropped: usize,
}

/// Stateful step and spike delta check, keyed by PUID
#[derive(Debug)]
pub struct DeltaCheck {
    resolver: ThresholdResolver,
    reorder_capacity: usize,
    states: HashMap<Puid, DeltaState>,
}

impl DeltaCheck {
    /// Create a delta check with the given reorder buffer depth
    pub fn new(resolver: ThresholdResolver, reorder_capacity: usize) -> Self {
        assert!(reorder_capacity > 0, "reorder buffer needs capacity");
        Self {
            resolver,
            reorder_capacity,
            states: HashMap::new(),
        }
    }

    /// Feed one observation; returns the outcomes of every reading the
    /// arrival released from the reorder buffer.
    ///
    /// Null and categorical observations neither advance nor break the
    /// numeric chain.
    pub async fn evaluate(&mut self, observation: &SemanticObservation) -> Vec<QcOutcome> {
        let Some(value) = observation.numeric_value else {
            return Vec::new();
        };

        let mut state = self.states.remove(&observation.puid).unwrap_or_default();
        let mut outcomes = Vec::new();

        let instant = observation.phenomenon_time_start;
        if state.watermark.is_some_and(|watermark| instant < watermark) {
            state.dropped += 1;
            debug!(
                "delta: {} displaced beyond reorder buffer for {}, dropped",
                instant, observation.puid
            );
        } else {
            let position = state
                .pending
                .partition_point(|reading| reading.instant <= instant);
            state.pending.insert(position, Reading { instant, value });

            while state.pending.len() > self.reorder_capacity {
                let next = state.pending.remove(0);
                outcomes.extend(self.advance(&observation.puid, &mut state, next).await);
            }
        }

        self.states.insert(observation.puid.clone(), state);
        outcomes
    }

    /// Drain every reorder buffer at end of stream
    pub async fn flush(&mut self) -> Vec<QcOutcome> {
        let puids: Vec<Puid> = self.states.keys().cloned().collect();
        let mut outcomes = Vec::new();

        for puid in puids {
            let mut state = self.states.remove(&puid).unwrap_or_default();
            while !state.pending.is_empty() {
                let next = state.pending.remove(0);
                outcomes.extend(self.advance(&puid, &mut state, next).await);
            }
            self.states.insert(puid, state);
        }

        outcomes
    }

    /// Total readings dropped for arriving beyond the reorder buffer
    pub fn dropped_count(&self) -> usize {
        self.states.values().map(|state| state.dropped).sum()
    }

    /// Release one reading into evaluation: step against its predecessor,
    /// spike for the triple it completes.
    async fn advance(
        &self,
        puid: &Puid,
        state: &mut DeltaState,
        next: Reading,
    ) -> Vec<QcOutcome> {
        state.watermark = Some(next.instant);
        state.recent.push_back(next);
        while state.recent.len() > 3 {
            state.recent.pop_front();
        }

        let mut outcomes = Vec::new();
        let count = state.recent.len();

        if count >= 2 {
            let previous = state.recent[count - 2];
            let current = state.recent[count - 1];
            outcomes.extend(self.step_outcomes(puid, previous, current).await);
        }

        if count == 3 {
            let previous = state.recent[0];
            let current = state.recent[1];
            let following = state.recent[2];
            outcomes.extend(
                self.spike_outcomes(puid, previous, current, following)
                    .await,
            );
        }

        outcomes
    }

    async fn step_outcomes(
        &self,
        puid: &Puid,
        previous: Reading,
        current: Reading,
    ) -> Vec<QcOutcome> {
        let difference = (current.value - previous.value).abs();
        let thresholds = self
            .resolver
            .resolve(puid, CheckFamily::DeltaStep, current.instant, None)
            .await;

        let mut outcomes = Vec::new();
        for threshold in thresholds {
            // Only the max bound applies to deltas
            let Some(max) = threshold.max else { continue };
            let test_id = family_test_id(CheckFamily::DeltaStep, &threshold.method, Bound::Max);
            outcomes.push(if difference > max {
                QcOutcome::fail(puid.clone(), current.instant, test_id, difference - max)
            } else {
                QcOutcome::pass(puid.clone(), current.instant, test_id)
            });
        }
        outcomes
    }

    async fn spike_outcomes(
        &self,
        puid: &Puid,
        previous: Reading,
        current: Reading,
        following: Reading,
    ) -> Vec<QcOutcome> {
        let magnitude = (2.0 * current.value - previous.value - following.value).abs();
        let thresholds = self
            .resolver
            .resolve(puid, CheckFamily::DeltaSpike, current.instant, None)
            .await;

        let mut outcomes = Vec::new();
        for threshold in thresholds {
            let Some(max) = threshold.max else { continue };
            let test_id = family_test_id(CheckFamily::DeltaSpike, &threshold.method, Bound::Max);
            outcomes.push(if magnitude > max {
                QcOutcome::fail(puid.clone(), current.instant, test_id, magnitude - max)
            } else {
                QcOutcome::pass(puid.clone(), current.instant, test_id)
            });
        }
        outcomes
    }
}
