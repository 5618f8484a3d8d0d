//! Range check: per-observation bounds on the numeric value
//!
//! For each method resolved under the `range` family at the observation's
//! instant, the value is compared against whichever of the min/max bounds is
//! present. A violated bound fails with the positive distance to the bound;
//! a respected bound passes with zero deviation. An absent bound produces no
//! outcome at all, and null observations never reach this check's
//! comparisons.

use crate::app::models::{family_test_id, Bound, CheckFamily, QcOutcome, SemanticObservation};
use crate::app::services::thresholds::ThresholdResolver;

/// Stateless per-observation range check
#[derive(Debug, Clone)]
pub struct RangeCheck {
    resolver: ThresholdResolver,
}

impl RangeCheck {
    /// Create a range check over a threshold resolver
    pub fn new(resolver: ThresholdResolver) -> Self {
        Self { resolver }
    }

    /// Evaluate an observation against every resolved range method.
    ///
    /// Observations with an absent numeric value produce no outcomes.
    pub async fn evaluate(&self, observation: &SemanticObservation) -> Vec<QcOutcome> {
        let Some(value) = observation.numeric_value else {
            return Vec::new();
        };

        let thresholds = self
            .resolver
            .resolve(
                &observation.puid,
                CheckFamily::Range,
                observation.instant(),
                None,
            )
            .await;

        let mut outcomes = Vec::new();
        for threshold in thresholds {
            if let Some(min) = threshold.min {
                let test_id = family_test_id(CheckFamily::Range, &threshold.method, Bound::Min);
                outcomes.push(if value < min {
                    QcOutcome::fail(
                        observation.puid.clone(),
                        observation.instant(),
                        test_id,
                        min - value,
                    )
                } else {
                    QcOutcome::pass(observation.puid.clone(), observation.instant(), test_id)
                });
            }

            if let Some(max) = threshold.max {
                let test_id = family_test_id(CheckFamily::Range, &threshold.method, Bound::Max);
                outcomes.push(if value > max {
                    QcOutcome::fail(
                        observation.puid.clone(),
                        observation.instant(),
                        test_id,
                        value - max,
                    )
                } else {
                    QcOutcome::pass(observation.puid.clone(), observation.instant(), test_id)
                });
            }
        }

        outcomes
    }
}
