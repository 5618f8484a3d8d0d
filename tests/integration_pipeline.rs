//! End-to-end integration tests for the QC pipeline
//!
//! Drives the public pipeline API against an in-memory registry and checks
//! the documented QC scenarios: range bounds, under-filled sigma windows,
//! null runs and aggregates, delta spikes, and replay determinism.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use sensorqc::app::models::{Puid, QcEvent, QcOutcome, SemanticObservation, TestOutcome};
use sensorqc::app::services::pipeline::{PipelineStats, QcPipeline};
use sensorqc::app::services::registry::{InMemoryStore, RegistryClient};
use sensorqc::config::{PipelineConfig, QcConfig};

const HOUR_MS: i64 = 3_600_000;

fn puid() -> Puid {
    Puid::new("A", "B", "C")
}

fn numeric(instant: i64, value: f64) -> SemanticObservation {
    SemanticObservation::numerical(puid(), instant, instant, Some(value)).unwrap()
}

fn null(instant: i64) -> SemanticObservation {
    SemanticObservation::numerical(puid(), instant, instant, None).unwrap()
}

/// Replay observations through a freshly spawned pipeline and collect
/// everything it emits
async fn run_qc(
    entries: &[(&str, &str)],
    observations: Vec<SemanticObservation>,
) -> (Vec<QcOutcome>, Vec<QcEvent>, PipelineStats) {
    let config = QcConfig {
        pipeline: PipelineConfig {
            partitions: 2,
            channel_capacity: 256,
            delta_reorder_capacity: 3,
        },
        ..Default::default()
    };
    let store = Arc::new(InMemoryStore::with_entries(
        entries.iter().map(|(k, v)| (*k, *v)),
    ));
    let registry = RegistryClient::new(store, config.registry.clone());

    let (pipeline, output) = QcPipeline::spawn(&config, registry, CancellationToken::new());

    let mut outcome_rx = output.outcomes;
    let outcomes = tokio::spawn(async move {
        let mut collected = Vec::new();
        while let Some(outcome) = outcome_rx.recv().await {
            collected.push(outcome);
        }
        collected
    });
    let mut event_rx = output.events;
    let events = tokio::spawn(async move {
        let mut collected = Vec::new();
        while let Some(event) = event_rx.recv().await {
            collected.push(event);
        }
        collected
    });

    for observation in observations {
        pipeline.submit(observation).await.unwrap();
    }
    let stats = pipeline.finish().await;

    (outcomes.await.unwrap(), events.await.unwrap(), stats)
}

#[tokio::test]
async fn scenario_range_fail_high() {
    let (outcomes, _, _) = run_qc(
        &[
            ("A::B::C::thresholds::range", "m1"),
            ("A::B::C::thresholds::range::m1", "single"),
            ("A::B::C::thresholds::range::m1::min", "0"),
            ("A::B::C::thresholds::range::m1::max", "100"),
        ],
        vec![numeric(1_000_000, 120.0)],
    )
    .await;

    assert_eq!(outcomes.len(), 2);

    let max = outcomes
        .iter()
        .find(|o| o.test_id == "http://placeholder.catalogue.ceh.ac.uk/qc/range/m1/max")
        .unwrap();
    assert_eq!(max.outcome, TestOutcome::Fail);
    assert_eq!(max.quantitative_value, 20.0);
    assert_eq!(max.instant, 1_000_000);

    let min = outcomes
        .iter()
        .find(|o| o.test_id == "http://placeholder.catalogue.ceh.ac.uk/qc/range/m1/min")
        .unwrap();
    assert_eq!(min.outcome, TestOutcome::Pass);
    assert_eq!(min.quantitative_value, 0.0);
}

#[tokio::test]
async fn scenario_range_missing_registry() {
    let (outcomes, events, stats) = run_qc(&[], vec![numeric(0, 50.0)]).await;

    assert!(outcomes.is_empty());
    assert!(events.is_empty());
    assert_eq!(stats.unchecked, 1);
}

#[tokio::test]
async fn scenario_sigma_under_filled_window() {
    // Five values covering ten hours. The nominal 24h window still
    // classifies as 24h by span, so with only 12h sigma keys registered the
    // 24h window resolves nothing; the 12h window resolves and emits.
    let entries = [
        ("A::B::C::thresholds::sigma", "m1"),
        ("A::B::C::thresholds::sigma::12h::m1", "single"),
        ("A::B::C::thresholds::sigma::12h::m1::max", "1"),
    ];
    let observations: Vec<SemanticObservation> = (0..5)
        .map(|i| numeric(i * 2 * HOUR_MS + 60_000, (i * i) as f64))
        .collect();

    let (outcomes, _, _) = run_qc(&entries, observations).await;

    assert!(!outcomes.is_empty());
    assert!(outcomes.iter().all(|o| o.test_id.contains("/sigma/12h/")));
    assert!(!outcomes.iter().any(|o| o.test_id.contains("/sigma/24h/")));
}

#[tokio::test]
async fn scenario_null_consecutive_edge_trigger() {
    let observations = vec![
        numeric(0, 1.0),
        null(60_000),
        null(120_000),
        null(180_000),
        null(240_000),
        numeric(300_000, 2.0),
    ];
    let (_, events, _) = run_qc(
        &[("A::B::C::thresholds::null::consecutive", "3")],
        observations,
    )
    .await;

    // A run of four nulls against K=3: exactly one event, raised when the
    // run reached three, spanning the run from its first null
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_description, "Consecutive nulls: 3");
    assert_eq!(events[0].window_start, 60_000);
    assert_eq!(events[0].window_end, 180_000);
}

#[tokio::test]
async fn scenario_null_aggregate() {
    let observations = (0..5).map(|i| null(i * 60_000)).collect();
    let (_, events, _) = run_qc(
        &[("A::B::C::thresholds::null::aggregate::1h", "4")],
        observations,
    )
    .await;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_description, "Consecutive Nulls: 5");
    assert!(events[0].window_start <= events[0].window_end);
    assert_eq!(events[0].puid, puid());
}

#[tokio::test]
async fn scenario_delta_spike() {
    let observations = vec![
        numeric(0, 10.0),
        numeric(60_000, 50.0),
        numeric(120_000, 10.0),
    ];
    let (outcomes, _, _) = run_qc(
        &[
            ("A::B::C::thresholds::delta::spike", "m1"),
            ("A::B::C::thresholds::delta::spike::m1", "single"),
            ("A::B::C::thresholds::delta::spike::m1::max", "10"),
        ],
        observations,
    )
    .await;

    // |2*50 - 10 - 10| = 80 against max 10, attributed to the middle point
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].outcome, TestOutcome::Fail);
    assert_eq!(outcomes[0].quantitative_value, 70.0);
    assert_eq!(outcomes[0].instant, 60_000);
    assert_eq!(
        outcomes[0].test_id,
        "http://placeholder.catalogue.ceh.ac.uk/qc/delta/spike/m1/max"
    );
}

#[tokio::test]
async fn property_sign_correctness_and_exclusivity() {
    let entries = [
        ("A::B::C::thresholds::range", "m1"),
        ("A::B::C::thresholds::range::m1", "single"),
        ("A::B::C::thresholds::range::m1::min", "0"),
        ("A::B::C::thresholds::range::m1::max", "10"),
        ("A::B::C::thresholds::delta::step", "m1"),
        ("A::B::C::thresholds::delta::step::m1", "single"),
        ("A::B::C::thresholds::delta::step::m1::max", "3"),
    ];
    let observations: Vec<SemanticObservation> = vec![
        numeric(0, 5.0),
        numeric(60_000, 12.0),
        numeric(120_000, -2.0),
        numeric(180_000, 4.0),
    ];

    let (outcomes, _, _) = run_qc(&entries, observations).await;

    // Sign correctness: fails strictly positive, passes exactly zero
    for outcome in &outcomes {
        match outcome.outcome {
            TestOutcome::Fail => assert!(outcome.quantitative_value > 0.0),
            TestOutcome::Pass => assert_eq!(outcome.quantitative_value, 0.0),
        }
    }

    // Exclusivity: one outcome per (instant, test) pair
    let mut seen = std::collections::HashSet::new();
    for outcome in &outcomes {
        assert!(
            seen.insert((outcome.instant, outcome.test_id.clone())),
            "duplicate outcome for {} at {}",
            outcome.test_id,
            outcome.instant
        );
    }
}

#[tokio::test]
async fn property_replay_determinism() {
    let entries = [
        ("A::B::C::thresholds::range", "m1"),
        ("A::B::C::thresholds::range::m1", "single"),
        ("A::B::C::thresholds::range::m1::max", "8"),
        ("A::B::C::thresholds::sigma", "m1"),
        ("A::B::C::thresholds::sigma::1h::m1", "single"),
        ("A::B::C::thresholds::sigma::1h::m1::max", "4"),
        ("A::B::C::thresholds::null::aggregate::1h", "2"),
        ("A::B::C::thresholds::null::consecutive", "2"),
    ];
    let observations: Vec<SemanticObservation> = vec![
        numeric(0, 1.0),
        numeric(10 * 60_000, 9.0),
        null(20 * 60_000),
        null(30 * 60_000),
        numeric(40 * 60_000, 2.0),
        numeric(HOUR_MS + 60_000, 3.0),
    ];

    let (mut first, first_events, _) = run_qc(&entries, observations.clone()).await;
    let (mut second, second_events, _) = run_qc(&entries, observations).await;

    let key = |o: &QcOutcome| (o.instant, o.test_id.clone());
    first.sort_by_key(key);
    second.sort_by_key(key);

    assert_eq!(first, second);
    assert_eq!(first_events.len(), second_events.len());
    assert!(!first.is_empty());
    assert!(!first_events.is_empty());
}
