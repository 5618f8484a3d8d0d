//! Tests for the metadata identity and value checks

use super::{numeric_obs, registry_with, resolver_with};
use crate::app::models::TestOutcome;
use crate::app::services::checks::{MetaIdentityCheck, MetaValueCheck};

#[tokio::test]
async fn test_identity_flagged_puid_fails() {
    let check = MetaIdentityCheck::new(registry_with(&[
        ("A::meta::identity", "notcleaned"),
        ("A::meta::identity::notcleaned", "A,B,C::X,Y,Z"),
    ]));

    let outcomes = check.evaluate(&numeric_obs(0, 1.0)).await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].outcome, TestOutcome::Fail);
    assert!(outcomes[0].quantitative_value > 0.0);
    assert!(outcomes[0]
        .test_id
        .ends_with("/meta/identity/notcleaned"));
}

#[tokio::test]
async fn test_identity_unflagged_puid_passes() {
    let check = MetaIdentityCheck::new(registry_with(&[
        ("A::meta::identity", "maintenance"),
        ("A::meta::identity::maintenance", "X,Y,Z"),
    ]));

    let outcomes = check.evaluate(&numeric_obs(0, 1.0)).await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].outcome, TestOutcome::Pass);
    assert_eq!(outcomes[0].quantitative_value, 0.0);
}

#[tokio::test]
async fn test_identity_multiple_checks_each_emit() {
    let check = MetaIdentityCheck::new(registry_with(&[
        ("A::meta::identity", "notcleaned::maintenance"),
        ("A::meta::identity::notcleaned", "A,B,C"),
        ("A::meta::identity::maintenance", "X,Y,Z"),
    ]));

    let outcomes = check.evaluate(&numeric_obs(0, 1.0)).await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].outcome, TestOutcome::Fail);
    assert_eq!(outcomes[1].outcome, TestOutcome::Pass);
}

#[tokio::test]
async fn test_identity_without_enumeration_is_silent() {
    let check = MetaIdentityCheck::new(registry_with(&[]));
    assert!(check.evaluate(&numeric_obs(0, 1.0)).await.is_empty());
}

#[tokio::test]
async fn test_value_check_emits_pass_per_resolved_bound() {
    let check = MetaValueCheck::new(resolver_with(&[
        ("A::meta::value", "battery"),
        ("battery::thresholds::range", "volts"),
        ("battery::thresholds::range::volts", "single"),
        ("battery::thresholds::range::volts::min", "11.5"),
        ("battery::thresholds::range::volts::max", "14.5"),
    ]));

    let outcomes = check.evaluate(&numeric_obs(0, 1.0)).await;

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.outcome == TestOutcome::Pass));
    assert!(outcomes.iter().all(|o| o.quantitative_value == 0.0));
    assert!(outcomes[0]
        .test_id
        .ends_with("/meta/value/battery/volts/min"));
    assert!(outcomes[1]
        .test_id
        .ends_with("/meta/value/battery/volts/max"));
}

#[tokio::test]
async fn test_value_check_without_subject_thresholds_is_silent() {
    let check = MetaValueCheck::new(resolver_with(&[("A::meta::value", "battery")]));
    assert!(check.evaluate(&numeric_obs(0, 1.0)).await.is_empty());
}

#[tokio::test]
async fn test_value_check_outcomes_keep_observation_puid() {
    let check = MetaValueCheck::new(resolver_with(&[
        ("A::meta::value", "battery"),
        ("battery::thresholds::range", "volts"),
        ("battery::thresholds::range::volts", "single"),
        ("battery::thresholds::range::volts::max", "14.5"),
    ]));

    let outcomes = check.evaluate(&numeric_obs(0, 1.0)).await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].puid, super::puid());
}
