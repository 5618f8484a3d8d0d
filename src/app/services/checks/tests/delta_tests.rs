//! Tests for the step and spike delta checks

use super::{null_obs, numeric_obs, resolver_with};
use crate::app::models::TestOutcome;
use crate::app::services::checks::DeltaCheck;
use crate::constants::DELTA_REORDER_CAPACITY;

fn step_check() -> DeltaCheck {
    DeltaCheck::new(
        resolver_with(&[
            ("A::B::C::thresholds::delta::step", "m1"),
            ("A::B::C::thresholds::delta::step::m1", "single"),
            ("A::B::C::thresholds::delta::step::m1::max", "5"),
        ]),
        DELTA_REORDER_CAPACITY,
    )
}

fn spike_check() -> DeltaCheck {
    DeltaCheck::new(
        resolver_with(&[
            ("A::B::C::thresholds::delta::spike", "m1"),
            ("A::B::C::thresholds::delta::spike::m1", "single"),
            ("A::B::C::thresholds::delta::spike::m1::max", "10"),
        ]),
        DELTA_REORDER_CAPACITY,
    )
}

#[tokio::test]
async fn test_step_fail_with_deviation() {
    let mut check = step_check();

    // Fill the reorder buffer then force releases
    let mut outcomes = Vec::new();
    for (i, value) in [(0, 10.0), (1, 18.0), (2, 18.5), (3, 19.0), (4, 19.5)] {
        let released = check.evaluate(&numeric_obs(i * 60_000, value)).await;
        // Releases begin only once the buffer overflows
        if i < 3 {
            assert!(released.is_empty());
        }
        outcomes.extend(released);
    }
    outcomes.extend(check.flush().await);

    // Steps: |18-10|=8 fail by 3, then 0.5 passes three times
    let fails: Vec<_> = outcomes.iter().filter(|o| o.is_fail()).collect();
    assert_eq!(fails.len(), 1);
    assert_eq!(fails[0].quantitative_value, 3.0);
    assert_eq!(fails[0].instant, 60_000);
    assert!(fails[0].test_id.ends_with("/delta/step/m1/max"));

    let passes = outcomes.iter().filter(|o| !o.is_fail()).count();
    assert_eq!(passes, 3);
}

#[tokio::test]
async fn test_spike_against_middle_observation() {
    let mut check = spike_check();

    // The (10, 50, 10) triple has centred difference |2*50 - 10 - 10| = 80
    check.evaluate(&numeric_obs(0, 10.0)).await;
    check.evaluate(&numeric_obs(60_000, 50.0)).await;
    check.evaluate(&numeric_obs(120_000, 10.0)).await;
    let outcomes = check.flush().await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].outcome, TestOutcome::Fail);
    assert_eq!(outcomes[0].quantitative_value, 70.0);
    assert_eq!(outcomes[0].instant, 60_000);
    assert!(outcomes[0].test_id.ends_with("/delta/spike/m1/max"));
}

#[tokio::test]
async fn test_smooth_spike_passes() {
    let mut check = spike_check();

    check.evaluate(&numeric_obs(0, 10.0)).await;
    check.evaluate(&numeric_obs(60_000, 14.0)).await;
    check.evaluate(&numeric_obs(120_000, 10.0)).await;
    let outcomes = check.flush().await;

    // |2*14 - 10 - 10| = 8 <= 10
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].outcome, TestOutcome::Pass);
    assert_eq!(outcomes[0].quantitative_value, 0.0);
}

#[tokio::test]
async fn test_out_of_order_within_buffer_is_reordered() {
    let mut check = step_check();

    // Arrivals 0, 120s, 60s: the buffer restores event-time order, so the
    // evaluated steps are (0 -> 60s) and (60s -> 120s)
    check.evaluate(&numeric_obs(0, 10.0)).await;
    check.evaluate(&numeric_obs(120_000, 20.0)).await;
    check.evaluate(&numeric_obs(60_000, 14.0)).await;
    let outcomes = check.flush().await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].instant, 60_000);
    assert_eq!(outcomes[0].quantitative_value, 0.0); // |14-10|=4 passes
    assert_eq!(outcomes[1].instant, 120_000);
    assert_eq!(outcomes[1].outcome, TestOutcome::Fail); // |20-14|=6 fails by 1
    assert_eq!(outcomes[1].quantitative_value, 1.0);
}

#[tokio::test]
async fn test_displaced_arrival_is_dropped_from_delta() {
    let mut check = step_check();

    // Four ascending arrivals overflow the buffer and advance the watermark
    for i in 0..4 {
        check.evaluate(&numeric_obs((i + 10) * 60_000, 10.0)).await;
    }
    // An arrival behind the released instant is dropped
    let outcomes = check.evaluate(&numeric_obs(0, 99.0)).await;
    assert!(outcomes.is_empty());
    assert_eq!(check.dropped_count(), 1);

    // The stale value never participates in any step
    let outcomes = check.flush().await;
    assert!(outcomes.iter().all(|o| o.outcome == TestOutcome::Pass));
}

#[tokio::test]
async fn test_nulls_do_not_break_the_numeric_chain() {
    let mut check = step_check();

    check.evaluate(&numeric_obs(0, 10.0)).await;
    check.evaluate(&null_obs(60_000)).await;
    check.evaluate(&numeric_obs(120_000, 18.0)).await;
    let outcomes = check.flush().await;

    // The step pairs 10 with 18 across the null: |18-10|=8 fails by 3
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].outcome, TestOutcome::Fail);
    assert_eq!(outcomes[0].quantitative_value, 3.0);
}

#[tokio::test]
async fn test_missing_thresholds_produce_no_outcomes() {
    let mut check = DeltaCheck::new(resolver_with(&[]), DELTA_REORDER_CAPACITY);

    for i in 0..5 {
        assert!(check
            .evaluate(&numeric_obs(i * 60_000, i as f64))
            .await
            .is_empty());
    }
    assert!(check.flush().await.is_empty());
}

#[tokio::test]
async fn test_step_min_bound_is_ignored() {
    let mut check = DeltaCheck::new(
        resolver_with(&[
            ("A::B::C::thresholds::delta::step", "m1"),
            ("A::B::C::thresholds::delta::step::m1", "single"),
            ("A::B::C::thresholds::delta::step::m1::min", "100"),
        ]),
        DELTA_REORDER_CAPACITY,
    );

    check.evaluate(&numeric_obs(0, 10.0)).await;
    check.evaluate(&numeric_obs(60_000, 11.0)).await;
    let outcomes = check.flush().await;

    // Only max applies to deltas; a lone min produces nothing
    assert!(outcomes.is_empty());
}
