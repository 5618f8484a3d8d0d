//! Temporal granularity of threshold methods
//!
//! A threshold method's registry entry carries a granularity tag deciding
//! how the lookup instant is folded into the min/max leaf keys: not at all
//! (`single`), or as an hourly, daily, or monthly time suffix.

use chrono::DateTime;

use crate::constants::{granularity_tags, time_formats, HOUR_MS, MINUTE_MS};

/// Temporal resolution of a threshold method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// One threshold pair for all time; leaves carry no suffix
    Single,
    /// Leaf per hour, keyed `YYYY-MM-DDTHH`
    Hour,
    /// Leaf per date, keyed `YYYY-MM-DD`
    Day,
    /// Leaf per month, keyed `YYYY-MM`
    Month,
}

impl Granularity {
    /// Parse a registry granularity tag; unknown tags yield `None` and the
    /// method is skipped
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim() {
            granularity_tags::SINGLE => Some(Granularity::Single),
            granularity_tags::HOUR => Some(Granularity::Hour),
            granularity_tags::DAY => Some(Granularity::Day),
            granularity_tags::MONTH => Some(Granularity::Month),
            _ => None,
        }
    }

    /// Registry tag for this granularity
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Single => granularity_tags::SINGLE,
            Granularity::Hour => granularity_tags::HOUR,
            Granularity::Day => granularity_tags::DAY,
            Granularity::Month => granularity_tags::MONTH,
        }
    }

    /// Derive the leaf key suffix for an instant, in UTC.
    ///
    /// `Single` has no suffix. `Hour` rounds to the nearest hour: minute ≤ 30
    /// floors, anything later carries into the next hour. An instant outside
    /// the representable datetime range yields no suffix, so the lookup
    /// resolves to absent and the method is skipped.
    pub fn suffix(&self, instant_ms: i64) -> Option<String> {
        let format = match self {
            Granularity::Single => return None,
            Granularity::Hour => time_formats::HOUR,
            Granularity::Day => time_formats::DAY,
            Granularity::Month => time_formats::MONTH,
        };

        let anchored_ms = match self {
            Granularity::Hour => round_to_nearest_hour(instant_ms),
            _ => instant_ms,
        };

        let instant = DateTime::from_timestamp_millis(anchored_ms)?;
        Some(instant.format(format).to_string())
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Round an epoch-millisecond instant to the nearest hour boundary: if the
/// minute-of-hour is at most 30 the hour floors, otherwise it ceils.
fn round_to_nearest_hour(instant_ms: i64) -> i64 {
    let floor_hour = instant_ms.div_euclid(HOUR_MS);
    let minute_of_hour = instant_ms.rem_euclid(HOUR_MS) / MINUTE_MS;
    if minute_of_hour <= 30 {
        floor_hour * HOUR_MS
    } else {
        (floor_hour + 1) * HOUR_MS
    }
}
