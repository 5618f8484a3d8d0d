//! Data models for streaming sensor QC
//!
//! This module contains the core data structures for the QC engine: the PUID
//! stream key, the semantic observation record that flows through every
//! operator, and the QC outcome and event records the operators emit.

use crate::constants::{self, KEY_SEPARATOR, MAX_SEGMENT, MIN_SEGMENT, TRIPLE_FIELD_SEPARATOR};
use crate::{Error, Result};
use chrono::{DateTime, Datelike};
use serde::{Deserialize, Serialize};

// =============================================================================
// Stream Key
// =============================================================================

/// Procedure Unique IDentifier: the (feature, procedure, observableproperty)
/// triple that keys every registry lookup and every partitioned stream.
///
/// The triple is immutable across the pipeline; operators never rewrite it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Puid {
    /// Observed real-world entity, e.g. a monitoring station (URI-valued)
    pub feature: String,

    /// Sensing process, e.g. a specific thermometer instance (URI-valued)
    pub procedure: String,

    /// Phenomenon being measured, e.g. air temperature (URI-valued)
    #[serde(rename = "observableproperty")]
    pub observable_property: String,
}

impl Puid {
    /// Create a new PUID triple
    pub fn new(
        feature: impl Into<String>,
        procedure: impl Into<String>,
        observable_property: impl Into<String>,
    ) -> Self {
        Self {
            feature: feature.into(),
            procedure: procedure.into(),
            observable_property: observable_property.into(),
        }
    }

    /// Registry key prefix for this PUID: `feature::procedure::observableproperty`
    pub fn key_prefix(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.feature,
            self.procedure,
            self.observable_property,
            sep = KEY_SEPARATOR
        )
    }

    /// Check whether an identity-set entry (`feature,procedure,observableproperty`)
    /// names this PUID
    pub fn matches_triple_entry(&self, entry: &str) -> bool {
        let mut fields = entry.split(TRIPLE_FIELD_SEPARATOR);
        fields.next() == Some(self.feature.as_str())
            && fields.next() == Some(self.procedure.as_str())
            && fields.next() == Some(self.observable_property.as_str())
            && fields.next().is_none()
    }
}

impl std::fmt::Display for Puid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key_prefix())
    }
}

// =============================================================================
// Semantic Observation
// =============================================================================

/// Payload type of an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObservationType {
    /// Floating-point reading; may be absent (a null observation)
    Numerical,
    /// Free-text category reading
    Categorical,
}

/// The canonical in-flight record every operator consumes and produces.
///
/// Created by the raw-to-semantic transform and immutable thereafter. A
/// numerical observation whose wire value was the `NotAValue` sentinel has an
/// absent `numeric_value` and participates only in the null checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticObservation {
    /// Stream key triple
    #[serde(flatten)]
    pub puid: Puid,

    /// Start of the phenomenon time, epoch milliseconds UTC
    pub phenomenon_time_start: i64,

    /// End of the phenomenon time, epoch milliseconds UTC
    pub phenomenon_time_end: i64,

    /// Calendar year derived from the phenomenon start
    pub year: i32,

    /// Calendar month derived from the phenomenon start
    pub month: u32,

    /// Payload type
    pub observation_type: ObservationType,

    /// Numeric payload; absent for null and categorical observations
    pub numeric_value: Option<f64>,

    /// Categorical payload; absent for numerical observations
    pub categoric_value: Option<String>,

    /// Upstream quality indicator, opaque to the core
    pub quality: i32,

    /// Upstream accuracy indicator, opaque to the core
    pub accuracy: i32,

    /// Upstream status string, opaque to the core
    pub status: String,

    /// Upstream processing trail, opaque to the core
    pub processing: String,

    /// Uncertainty markup reference, opaque to the core
    pub uncertml: String,

    /// Free-text comment, opaque to the core
    pub comment: String,

    /// Location reference, opaque to the core
    pub location: String,

    /// Additional parameters, opaque to the core
    pub parameters: String,
}

/// Opaque processing-trail fields carried through the pipeline unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingTrail {
    pub quality: i32,
    pub accuracy: i32,
    pub status: String,
    pub processing: String,
    pub uncertml: String,
    pub comment: String,
    pub location: String,
    pub parameters: String,
}

impl SemanticObservation {
    /// Create a numerical observation; `value` of `None` is a null observation
    pub fn numerical(
        puid: Puid,
        phenomenon_time_start: i64,
        phenomenon_time_end: i64,
        value: Option<f64>,
    ) -> Result<Self> {
        Self::build(
            puid,
            phenomenon_time_start,
            phenomenon_time_end,
            ObservationType::Numerical,
            value,
            None,
        )
    }

    /// Create a categorical observation
    pub fn categorical(
        puid: Puid,
        phenomenon_time_start: i64,
        phenomenon_time_end: i64,
        value: impl Into<String>,
    ) -> Result<Self> {
        Self::build(
            puid,
            phenomenon_time_start,
            phenomenon_time_end,
            ObservationType::Categorical,
            None,
            Some(value.into()),
        )
    }

    fn build(
        puid: Puid,
        phenomenon_time_start: i64,
        phenomenon_time_end: i64,
        observation_type: ObservationType,
        numeric_value: Option<f64>,
        categoric_value: Option<String>,
    ) -> Result<Self> {
        if phenomenon_time_end < phenomenon_time_start {
            return Err(Error::observation_format(format!(
                "phenomenon time end {} precedes start {}",
                phenomenon_time_end, phenomenon_time_start
            )));
        }

        let instant = DateTime::from_timestamp_millis(phenomenon_time_start).ok_or_else(|| {
            Error::timestamp(format!(
                "phenomenon time {} is outside the representable range",
                phenomenon_time_start
            ))
        })?;

        Ok(Self {
            puid,
            phenomenon_time_start,
            phenomenon_time_end,
            year: instant.year(),
            month: instant.month(),
            observation_type,
            numeric_value,
            categoric_value,
            quality: 0,
            accuracy: 0,
            status: String::new(),
            processing: String::new(),
            uncertml: String::new(),
            comment: String::new(),
            location: String::new(),
            parameters: String::new(),
        })
    }

    /// Attach the opaque processing-trail fields
    pub fn with_trail(mut self, trail: ProcessingTrail) -> Self {
        self.quality = trail.quality;
        self.accuracy = trail.accuracy;
        self.status = trail.status;
        self.processing = trail.processing;
        self.uncertml = trail.uncertml;
        self.comment = trail.comment;
        self.location = trail.location;
        self.parameters = trail.parameters;
        self
    }

    /// Representative instant of this observation, used for threshold
    /// resolution and emitted outcomes. Always lies within
    /// `[phenomenon_time_start, phenomenon_time_end]`.
    pub fn instant(&self) -> i64 {
        self.phenomenon_time_start
    }

    /// A null observation: numerical type with absent payload
    pub fn is_null(&self) -> bool {
        self.observation_type == ObservationType::Numerical && self.numeric_value.is_none()
    }
}

// =============================================================================
// Check Families and Bounds
// =============================================================================

/// Closed set of check families evaluated by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckFamily {
    Range,
    DeltaStep,
    DeltaSpike,
    Sigma,
    NullAggregate,
    NullConsecutive,
    MetaIdentity,
    MetaValue,
}

impl CheckFamily {
    /// Registry key segments addressing this family under `::thresholds::`
    /// or `::meta::`
    pub fn key_segments(&self) -> &'static [&'static str] {
        match self {
            CheckFamily::Range => &["range"],
            CheckFamily::DeltaStep => &["delta", "step"],
            CheckFamily::DeltaSpike => &["delta", "spike"],
            CheckFamily::Sigma => &["sigma"],
            CheckFamily::NullAggregate => &["null", "aggregate"],
            CheckFamily::NullConsecutive => &["null", "consecutive"],
            CheckFamily::MetaIdentity => &["identity"],
            CheckFamily::MetaValue => &["value"],
        }
    }

    /// Test-identifier path segments for this family
    pub fn test_segments(&self) -> &'static [&'static str] {
        match self {
            CheckFamily::Range => &["range"],
            CheckFamily::DeltaStep => &["delta", "step"],
            CheckFamily::DeltaSpike => &["delta", "spike"],
            CheckFamily::Sigma => &["sigma"],
            CheckFamily::NullAggregate => &["null", "aggregate"],
            CheckFamily::NullConsecutive => &["null", "consecutive"],
            CheckFamily::MetaIdentity => &["meta", "identity"],
            CheckFamily::MetaValue => &["meta", "value"],
        }
    }
}

/// Threshold bound addressed by a leaf key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Min,
    Max,
}

impl Bound {
    /// Key and test-identifier segment for this bound
    pub fn as_str(&self) -> &'static str {
        match self {
            Bound::Min => MIN_SEGMENT,
            Bound::Max => MAX_SEGMENT,
        }
    }
}

// =============================================================================
// QC Outcomes and Events
// =============================================================================

/// Binary outcome of a single test invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    Pass,
    Fail,
}

impl TestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestOutcome::Pass => "pass",
            TestOutcome::Fail => "fail",
        }
    }
}

impl std::fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-observation quantitative QC outcome against a specific test.
///
/// `quantitative_value` is the signed deviation from the violated bound:
/// strictly positive for a fail, exactly zero for a pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QcOutcome {
    /// Stream key of the originating observation
    #[serde(flatten)]
    pub puid: Puid,

    /// Instant the outcome refers to, epoch milliseconds UTC
    pub instant: i64,

    /// Test identifier URI
    pub test_id: String,

    /// Pass or fail
    pub outcome: TestOutcome,

    /// Signed deviation from the violated bound; zero for pass
    pub quantitative_value: f64,
}

impl QcOutcome {
    /// Create a passing outcome with zero deviation
    pub fn pass(puid: Puid, instant: i64, test_id: String) -> Self {
        Self {
            puid,
            instant,
            test_id,
            outcome: TestOutcome::Pass,
            quantitative_value: 0.0,
        }
    }

    /// Create a failing outcome with a strictly positive deviation
    pub fn fail(puid: Puid, instant: i64, test_id: String, deviation: f64) -> Self {
        debug_assert!(deviation > 0.0, "fail deviation must be positive");
        Self {
            puid,
            instant,
            test_id,
            outcome: TestOutcome::Fail,
            quantitative_value: deviation,
        }
    }

    /// Whether this outcome is a fail
    pub fn is_fail(&self) -> bool {
        self.outcome == TestOutcome::Fail
    }
}

/// Window-scoped anomaly record not attributable to a single observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QcEvent {
    /// Stream key the window was partitioned on
    #[serde(flatten)]
    pub puid: Puid,

    /// Human-readable anomaly description
    pub event_description: String,

    /// Window start, epoch milliseconds UTC
    pub window_start: i64,

    /// Window end, epoch milliseconds UTC
    pub window_end: i64,
}

impl QcEvent {
    /// Create a new window-scoped event; the bounds must be ordered
    pub fn new(puid: Puid, event_description: String, window_start: i64, window_end: i64) -> Self {
        assert!(
            window_start <= window_end,
            "event window end {} precedes start {}",
            window_end,
            window_start
        );
        Self {
            puid,
            event_description,
            window_start,
            window_end,
        }
    }
}

/// Build a test identifier for a family without a window segment
pub fn family_test_id(family: CheckFamily, method: &str, bound: Bound) -> String {
    let mut segments: Vec<&str> = family.test_segments().to_vec();
    segments.push(method);
    segments.push(bound.as_str());
    constants::test_id(&segments)
}
