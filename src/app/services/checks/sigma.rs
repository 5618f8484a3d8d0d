//! Sigma check: windowed sample-variance bounds
//!
//! The variance of a closed tumbling window's numeric values is compared
//! against the bounds resolved for the window's duration class, anchored at
//! the window midpoint. One outcome per bound is attributed to every numeric
//! observation in the window so downstream joins can tie the window-level
//! judgement back to each contributing point.

use crate::app::models::{Bound, CheckFamily, QcOutcome, TestOutcome};
use crate::app::services::thresholds::{window_centre, ThresholdResolver, WindowClass};
use crate::constants::{self, MIN_SIGMA_SAMPLE_COUNT};

use super::WindowSnapshot;

/// Streaming mean/variance accumulator.
///
/// Welford's update avoids the catastrophic cancellation a naive
/// sum-of-squares accumulator suffers on large offsets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WelfordAccumulator {
    count: u64,
    mean: f64,
    m2: f64,
}

impl WelfordAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one value into the summary
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    /// Number of accumulated values
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean of the accumulated values, when any
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Unbiased sample variance; undefined below two samples
    pub fn sample_variance(&self) -> Option<f64> {
        (self.count >= MIN_SIGMA_SAMPLE_COUNT).then(|| self.m2 / (self.count - 1) as f64)
    }
}

/// Window-scoped variance check
#[derive(Debug, Clone)]
pub struct SigmaCheck {
    resolver: ThresholdResolver,
}

impl SigmaCheck {
    /// Create a sigma check over a threshold resolver
    pub fn new(resolver: ThresholdResolver) -> Self {
        Self { resolver }
    }

    /// Evaluate a closed window; returns one outcome per resolved bound per
    /// numeric observation in the window.
    pub async fn evaluate(&self, window: &WindowSnapshot) -> Vec<QcOutcome> {
        let Some(variance) = window.stats.sample_variance() else {
            return Vec::new();
        };

        let class = WindowClass::classify(window.span_ms());
        let centre = window_centre(window.window_start, window.window_end);
        let thresholds = self
            .resolver
            .resolve(&window.puid, CheckFamily::Sigma, centre, Some(class))
            .await;

        let mut outcomes = Vec::new();
        for threshold in &thresholds {
            if let Some(min) = threshold.min {
                let test_id = sigma_test_id(class, &threshold.method, Bound::Min);
                let (outcome, deviation) = if variance < min {
                    (TestOutcome::Fail, min - variance)
                } else {
                    (TestOutcome::Pass, 0.0)
                };
                self.attribute(window, &test_id, outcome, deviation, &mut outcomes);
            }

            if let Some(max) = threshold.max {
                let test_id = sigma_test_id(class, &threshold.method, Bound::Max);
                let (outcome, deviation) = if variance > max {
                    (TestOutcome::Fail, variance - max)
                } else {
                    (TestOutcome::Pass, 0.0)
                };
                self.attribute(window, &test_id, outcome, deviation, &mut outcomes);
            }
        }

        outcomes
    }

    /// Attribute one window-level judgement to every numeric observation
    fn attribute(
        &self,
        window: &WindowSnapshot,
        test_id: &str,
        outcome: TestOutcome,
        deviation: f64,
        outcomes: &mut Vec<QcOutcome>,
    ) {
        for &instant in &window.numeric_instants {
            outcomes.push(match outcome {
                TestOutcome::Pass => {
                    QcOutcome::pass(window.puid.clone(), instant, test_id.to_string())
                }
                TestOutcome::Fail => {
                    QcOutcome::fail(window.puid.clone(), instant, test_id.to_string(), deviation)
                }
            });
        }
    }
}

/// Sigma test identifiers carry the window duration between family and
/// method: `.../qc/sigma/<windowDuration>/<method>/<min|max>`
fn sigma_test_id(class: WindowClass, method: &str, bound: Bound) -> String {
    constants::test_id(&["sigma", class.as_str(), method, bound.as_str()])
}
