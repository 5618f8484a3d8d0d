//! PUID-partitioned streaming QC pipeline
//!
//! Observations are routed by PUID hash onto single-threaded partition
//! workers. Each worker owns its checks' keyed state, so no two tasks ever
//! share mutable state, and event-time ordering is preserved within a
//! partition. Outcomes and events from every partition converge on one
//! bounded output channel each.
//!
//! Cancellation is observed between observations and at every registry
//! lookup timeout; a cancelled partition discards its in-progress windows
//! and buffers rather than emitting partial records. A clean end of stream
//! flushes them instead.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::app::models::{Puid, QcEvent, QcOutcome, SemanticObservation};
use crate::app::services::checks::{
    DeltaCheck, MetaIdentityCheck, MetaValueCheck, NullAggregateCheck, NullConsecutiveCheck,
    RangeCheck, SigmaCheck, WindowSnapshot,
};
use crate::app::services::registry::RegistryClient;
use crate::app::services::thresholds::ThresholdResolver;
use crate::config::QcConfig;
use crate::{Error, Result};

pub mod windows;

#[cfg(test)]
pub mod tests;

pub use windows::WindowManager;

/// Statistics aggregated across the pipeline's partitions
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PipelineStats {
    /// Observations processed
    pub observations: usize,
    /// QC outcomes emitted
    pub outcomes: usize,
    /// QC events emitted
    pub events: usize,
    /// Observations no point check applied to
    pub unchecked: usize,
    /// Observations dropped from window evaluation for lateness
    pub late_window_drops: usize,
    /// Readings dropped from delta evaluation for lateness
    pub late_delta_drops: usize,
}

impl PipelineStats {
    /// Fold another partition's statistics into this one
    pub fn merge(&mut self, other: &PipelineStats) {
        self.observations += other.observations;
        self.outcomes += other.outcomes;
        self.events += other.events;
        self.unchecked += other.unchecked;
        self.late_window_drops += other.late_window_drops;
        self.late_delta_drops += other.late_delta_drops;
    }

    /// Share of observations acknowledged by at least one point check
    pub fn checked_rate(&self) -> f64 {
        if self.observations == 0 {
            100.0
        } else {
            ((self.observations - self.unchecked) as f64 / self.observations as f64) * 100.0
        }
    }

    /// One-line summary for logging
    pub fn summary(&self) -> String {
        format!(
            "Pipeline Summary: {} observations -> {} outcomes, {} events | \
             {} with no applicable check ({:.1}% checked) | \
             late drops: {} window, {} delta",
            self.observations,
            self.outcomes,
            self.events,
            self.unchecked,
            self.checked_rate(),
            self.late_window_drops,
            self.late_delta_drops
        )
    }
}

/// Output side of a spawned pipeline; drain both receivers concurrently
/// with submission or the bounded channels will fill and stall the workers
pub struct PipelineOutput {
    pub outcomes: mpsc::Receiver<QcOutcome>,
    pub events: mpsc::Receiver<QcEvent>,
}

/// Handle to a running QC pipeline
pub struct QcPipeline {
    senders: Vec<mpsc::Sender<SemanticObservation>>,
    workers: JoinSet<PipelineStats>,
    cancellation: CancellationToken,
}

impl QcPipeline {
    /// Spawn the partition workers and return the pipeline handle with its
    /// output channels
    pub fn spawn(
        config: &QcConfig,
        registry: RegistryClient,
        cancellation: CancellationToken,
    ) -> (Self, PipelineOutput) {
        let capacity = config.pipeline.channel_capacity;
        let (outcome_tx, outcome_rx) = mpsc::channel(capacity);
        let (event_tx, event_rx) = mpsc::channel(capacity);

        let mut workers = JoinSet::new();
        let mut senders = Vec::with_capacity(config.pipeline.partitions);

        info!(
            "Spawning {} QC partition workers",
            config.pipeline.partitions
        );

        for partition in 0..config.pipeline.partitions {
            let (tx, rx) = mpsc::channel(capacity);
            senders.push(tx);

            let worker = PartitionWorker::new(
                partition,
                registry.clone(),
                config,
                outcome_tx.clone(),
                event_tx.clone(),
                cancellation.clone(),
            );
            workers.spawn(worker.run(rx));
        }

        (
            Self {
                senders,
                workers,
                cancellation,
            },
            PipelineOutput {
                outcomes: outcome_rx,
                events: event_rx,
            },
        )
    }

    /// Route an observation to its PUID partition
    pub async fn submit(&self, observation: SemanticObservation) -> Result<()> {
        let index = partition_index(&observation.puid, self.senders.len());
        self.senders[index]
            .send(observation)
            .await
            .map_err(|_| Error::pipeline("partition channel closed"))
    }

    /// Request cancellation of every partition
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Signal end of stream, wait for the partitions to flush, and return
    /// the aggregated statistics
    pub async fn finish(self) -> PipelineStats {
        let Self {
            senders,
            mut workers,
            cancellation: _,
        } = self;
        drop(senders);

        let mut total = PipelineStats::default();
        while let Some(result) = workers.join_next().await {
            match result {
                Ok(stats) => total.merge(&stats),
                Err(e) => error!("partition worker panicked: {e}"),
            }
        }
        total
    }
}

/// Stable PUID-hash partition routing
fn partition_index(puid: &Puid, partitions: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    puid.hash(&mut hasher);
    (hasher.finish() % partitions as u64) as usize
}

/// One single-threaded partition: the full check set plus keyed state for
/// the PUIDs hashed onto it
struct PartitionWorker {
    partition: usize,
    range: RangeCheck,
    delta: DeltaCheck,
    sigma: SigmaCheck,
    null_aggregate: NullAggregateCheck,
    null_consecutive: NullConsecutiveCheck,
    meta_identity: MetaIdentityCheck,
    meta_value: MetaValueCheck,
    windows: WindowManager,
    outcome_tx: mpsc::Sender<QcOutcome>,
    event_tx: mpsc::Sender<QcEvent>,
    cancellation: CancellationToken,
    stats: PipelineStats,
}

impl PartitionWorker {
    fn new(
        partition: usize,
        registry: RegistryClient,
        config: &QcConfig,
        outcome_tx: mpsc::Sender<QcOutcome>,
        event_tx: mpsc::Sender<QcEvent>,
        cancellation: CancellationToken,
    ) -> Self {
        let resolver = ThresholdResolver::new(registry.clone());
        Self {
            partition,
            range: RangeCheck::new(resolver.clone()),
            delta: DeltaCheck::new(resolver.clone(), config.pipeline.delta_reorder_capacity),
            sigma: SigmaCheck::new(resolver.clone()),
            null_aggregate: NullAggregateCheck::new(registry.clone()),
            null_consecutive: NullConsecutiveCheck::new(registry),
            meta_identity: MetaIdentityCheck::new(resolver.registry().clone()),
            meta_value: MetaValueCheck::new(resolver),
            windows: WindowManager::new(),
            outcome_tx,
            event_tx,
            cancellation,
            stats: PipelineStats::default(),
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<SemanticObservation>) -> PipelineStats {
        debug!("partition {} started", self.partition);

        loop {
            tokio::select! {
                // Cancellation is checked before the queue so a cancelled
                // partition never drains into a flush
                biased;
                _ = self.cancellation.cancelled() => {
                    debug!(
                        "partition {} cancelled, discarding open windows and buffers",
                        self.partition
                    );
                    return self.into_stats();
                }
                next = rx.recv() => match next {
                    Some(observation) => {
                        if self.process(&observation).await.is_err() {
                            warn!(
                                "partition {} output closed, stopping early",
                                self.partition
                            );
                            return self.into_stats();
                        }
                    }
                    None => break,
                }
            }
        }

        // Clean end of stream: drain reorder buffers and open windows
        if self.flush().await.is_err() {
            warn!("partition {} output closed during flush", self.partition);
        }

        debug!(
            "partition {} finished: {} observations",
            self.partition, self.stats.observations
        );
        self.into_stats()
    }

    /// Run the full point-check set plus window bookkeeping for one
    /// observation
    async fn process(&mut self, observation: &SemanticObservation) -> Result<()> {
        self.stats.observations += 1;
        let mut acknowledged = 0usize;

        let outcomes = self.range.evaluate(observation).await;
        acknowledged += outcomes.len();
        self.send_outcomes(outcomes).await?;

        let outcomes = self.meta_identity.evaluate(observation).await;
        acknowledged += outcomes.len();
        self.send_outcomes(outcomes).await?;

        let outcomes = self.meta_value.evaluate(observation).await;
        acknowledged += outcomes.len();
        self.send_outcomes(outcomes).await?;

        let outcomes = self.delta.evaluate(observation).await;
        acknowledged += outcomes.len();
        self.send_outcomes(outcomes).await?;

        let events = self.null_consecutive.evaluate(observation).await;
        acknowledged += events.len();
        self.send_events(events).await?;

        for snapshot in self.windows.observe(observation) {
            self.evaluate_window(&snapshot).await?;
        }

        if acknowledged == 0 {
            self.stats.unchecked += 1;
            debug!("no applicable point check for {}", observation.puid);
        }

        Ok(())
    }

    async fn evaluate_window(&mut self, snapshot: &WindowSnapshot) -> Result<()> {
        let outcomes = self.sigma.evaluate(snapshot).await;
        self.send_outcomes(outcomes).await?;

        let events = self.null_aggregate.evaluate(snapshot).await;
        self.send_events(events).await
    }

    async fn flush(&mut self) -> Result<()> {
        let outcomes = self.delta.flush().await;
        self.send_outcomes(outcomes).await?;

        for snapshot in self.windows.flush() {
            self.evaluate_window(&snapshot).await?;
        }
        Ok(())
    }

    async fn send_outcomes(&mut self, outcomes: Vec<QcOutcome>) -> Result<()> {
        for outcome in outcomes {
            self.outcome_tx
                .send(outcome)
                .await
                .map_err(|_| Error::pipeline("outcome channel closed"))?;
            self.stats.outcomes += 1;
        }
        Ok(())
    }

    async fn send_events(&mut self, events: Vec<QcEvent>) -> Result<()> {
        for event in events {
            self.event_tx
                .send(event)
                .await
                .map_err(|_| Error::pipeline("event channel closed"))?;
            self.stats.events += 1;
        }
        Ok(())
    }

    fn into_stats(mut self) -> PipelineStats {
        self.stats.late_window_drops = self.windows.late_dropped();
        self.stats.late_delta_drops = self.delta.dropped_count();
        self.stats
    }
}
