//! Application constants for the sensor QC engine
//!
//! This module contains the registry key grammar literals, window duration
//! and classification constants, granularity tags, and default values used
//! throughout the QC engine.

// =============================================================================
// Registry Key Grammar
// =============================================================================

/// Separator joining registry key parts
pub const KEY_SEPARATOR: &str = "::";

/// Key segment introducing threshold subtrees
pub const THRESHOLDS_SEGMENT: &str = "thresholds";

/// Key segment introducing feature-level metadata subtrees
pub const META_SEGMENT: &str = "meta";

/// Sentinel value marking an absent numeric reading in the CSV wire form
pub const NOT_A_VALUE: &str = "NotAValue";

/// Separator between fields of a PUID triple inside identity set entries
pub const TRIPLE_FIELD_SEPARATOR: char = ',';

// =============================================================================
// Test Identifiers
// =============================================================================

/// Base URI for emitted QC test identifiers
pub const TEST_ID_BASE: &str = "http://placeholder.catalogue.ceh.ac.uk/qc";

/// Build a test identifier from path segments under [`TEST_ID_BASE`]
///
/// Segments are joined with `/`; the caller supplies family, optional window
/// duration, method, and bound in order.
pub fn test_id(segments: &[&str]) -> String {
    debug_assert!(!segments.is_empty());
    format!("{}/{}", TEST_ID_BASE, segments.join("/"))
}

// =============================================================================
// Granularity Tags and Time Suffix Formats
// =============================================================================

/// Granularity tag values as stored in the registry
pub mod granularity_tags {
    /// One threshold pair for all time
    pub const SINGLE: &str = "single";

    /// Threshold pair per hour of the year
    pub const HOUR: &str = "hour";

    /// Threshold pair per calendar date
    pub const DAY: &str = "day";

    /// Threshold pair per calendar month
    pub const MONTH: &str = "month";
}

/// chrono format strings for granularity key suffixes
pub mod time_formats {
    /// Hourly suffix, e.g. `2023-06-01T14`
    pub const HOUR: &str = "%Y-%m-%dT%H";

    /// Daily suffix, e.g. `2023-06-01`
    pub const DAY: &str = "%Y-%m-%d";

    /// Monthly suffix, e.g. `2023-06`
    pub const MONTH: &str = "%Y-%m";
}

// =============================================================================
// Window Durations and Classification
// =============================================================================

/// Tumbling window durations and span classification cutoffs, all in
/// milliseconds. Classification collapses under-filled spans downward so a
/// partially covered window resolves against the nearest smaller bucket
/// instead of producing a false anomaly.
pub mod windows {
    /// One hour in milliseconds
    pub const ONE_HOUR_MS: i64 = 3_600_000;

    /// Twelve hours in milliseconds
    pub const TWELVE_HOURS_MS: i64 = 43_200_000;

    /// Twenty-four hours in milliseconds
    pub const TWENTY_FOUR_HOURS_MS: i64 = 86_400_000;

    /// Spans below 1.5h classify as the 1h bucket
    pub const ONE_HOUR_CUTOFF_MS: i64 = 5_400_000;

    /// Spans below 12.5h classify as the 12h bucket
    pub const TWELVE_HOUR_CUTOFF_MS: i64 = 45_000_000;
}

/// One hour in milliseconds, for hour rounding in threshold suffixes
pub const HOUR_MS: i64 = 3_600_000;

/// One minute in milliseconds
pub const MINUTE_MS: i64 = 60_000;

/// Minimum sample count for a meaningful sample variance
pub const MIN_SIGMA_SAMPLE_COUNT: u64 = 2;

// =============================================================================
// Registry Client Defaults
// =============================================================================

/// Per-call registry lookup timeout in milliseconds
pub const DEFAULT_REGISTRY_TIMEOUT_MS: u64 = 2_000;

/// TTL for cached registry lookups in seconds
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;

/// Minimum interval between repeated lookup warnings per key-pattern
pub const DEFAULT_WARN_INTERVAL_SECS: u64 = 60;

/// Upper bound on cached registry entries before expired entries are evicted
pub const REGISTRY_CACHE_MAX_ENTRIES: usize = 16_384;

// =============================================================================
// Pipeline Defaults
// =============================================================================

/// Default bounded channel capacity between pipeline stages
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1_000;

/// Default reorder buffer depth for delta checks
pub const DELTA_REORDER_CAPACITY: usize = 3;

/// Observation file extension accepted during input discovery
pub const OBSERVATION_FILE_EXTENSION: &str = "csv";

/// Progress reporting update interval (number of processed observations)
pub const PROGRESS_UPDATE_INTERVAL: usize = 1_000;

// =============================================================================
// Bound Names
// =============================================================================

/// Key segment addressing the lower bound leaf
pub const MIN_SEGMENT: &str = "min";

/// Key segment addressing the upper bound leaf
pub const MAX_SEGMENT: &str = "max";
