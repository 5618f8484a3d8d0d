//! Metadata checks: feature-level identity flags and associated values
//!
//! Identity checks mark whole PUID sets as affected by an operational
//! condition of the feature (e.g. sensor not cleaned, station under
//! maintenance): the registry enumerates check names per feature and a PUID
//! set per name, and every observation whose PUID appears in an active set
//! fails that check.
//!
//! Value checks tie an observation to range thresholds of an associated
//! subject reading (e.g. battery voltage) enumerated under the feature.
//! Outcomes are currently emitted as passes with zero deviation; the failing
//! shape is reserved until the associated readings are delivered in-stream.

use crate::app::models::{CheckFamily, QcOutcome, SemanticObservation};
use crate::app::services::registry::{keys, RegistryClient};
use crate::app::services::thresholds::ThresholdResolver;
use crate::constants;

/// Deviation reported for an active identity flag; identity checks are
/// boolean so the magnitude only has to satisfy the fail sign convention
const IDENTITY_FAIL_DEVIATION: f64 = 1.0;

/// Feature-level identity flag check
#[derive(Debug, Clone)]
pub struct MetaIdentityCheck {
    registry: RegistryClient,
}

impl MetaIdentityCheck {
    /// Create an identity check over a registry client
    pub fn new(registry: RegistryClient) -> Self {
        Self { registry }
    }

    /// Evaluate every identity check enumerated for the observation's
    /// feature: fail when the PUID appears in the check's enumerated set,
    /// pass otherwise.
    pub async fn evaluate(&self, observation: &SemanticObservation) -> Vec<QcOutcome> {
        let names = self
            .registry
            .get_list(&keys::meta_identity(&observation.puid.feature))
            .await;

        let mut outcomes = Vec::new();
        for name in names {
            let entries = self
                .registry
                .get_list(&keys::meta_identity_set(&observation.puid.feature, &name))
                .await;
            let flagged = entries
                .iter()
                .any(|entry| observation.puid.matches_triple_entry(entry));

            let test_id = constants::test_id(&["meta", "identity", &name]);
            outcomes.push(if flagged {
                QcOutcome::fail(
                    observation.puid.clone(),
                    observation.instant(),
                    test_id,
                    IDENTITY_FAIL_DEVIATION,
                )
            } else {
                QcOutcome::pass(observation.puid.clone(), observation.instant(), test_id)
            });
        }

        outcomes
    }
}

/// Feature-level associated-value check
#[derive(Debug, Clone)]
pub struct MetaValueCheck {
    resolver: ThresholdResolver,
}

impl MetaValueCheck {
    /// Create a value check over a threshold resolver
    pub fn new(resolver: ThresholdResolver) -> Self {
        Self { resolver }
    }

    /// Evaluate every value check enumerated for the observation's feature.
    ///
    /// Range thresholds are resolved under each enumerated subject's own
    /// prefix; one pass outcome with zero deviation is emitted per resolved
    /// bound.
    pub async fn evaluate(&self, observation: &SemanticObservation) -> Vec<QcOutcome> {
        let names = self
            .resolver
            .registry()
            .get_list(&keys::meta_value(&observation.puid.feature))
            .await;

        let mut outcomes = Vec::new();
        for name in names {
            let thresholds = self
                .resolver
                .resolve_at(&name, CheckFamily::Range, observation.instant(), None)
                .await;

            for threshold in thresholds {
                if threshold.min.is_some() {
                    outcomes.push(QcOutcome::pass(
                        observation.puid.clone(),
                        observation.instant(),
                        constants::test_id(&["meta", "value", &name, &threshold.method, "min"]),
                    ));
                }
                if threshold.max.is_some() {
                    outcomes.push(QcOutcome::pass(
                        observation.puid.clone(),
                        observation.instant(),
                        constants::test_id(&["meta", "value", &name, &threshold.method, "max"]),
                    ));
                }
            }
        }

        outcomes
    }
}
