//! Tumbling window duration classes
//!
//! Window-scoped checks run over event-time tumbling windows of 1h, 12h, and
//! 24h. Threshold lookups address the class by its short name, and a window's
//! actual span is folded into a class with deliberately generous cutoffs so
//! an under-filled window resolves against a smaller bucket instead of
//! raising a false anomaly.

use crate::constants::windows::{
    ONE_HOUR_CUTOFF_MS, ONE_HOUR_MS, TWELVE_HOURS_MS, TWELVE_HOUR_CUTOFF_MS, TWENTY_FOUR_HOURS_MS,
};

/// Duration bucket of a tumbling window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowClass {
    OneHour,
    TwelveHours,
    TwentyFourHours,
}

impl WindowClass {
    /// Every class, in ascending duration order
    pub const ALL: [WindowClass; 3] = [
        WindowClass::OneHour,
        WindowClass::TwelveHours,
        WindowClass::TwentyFourHours,
    ];

    /// Classify a window span in milliseconds.
    ///
    /// Spans below 1.5h are `1h`, below 12.5h are `12h`, everything else is
    /// `24h`. The span unit is milliseconds on the outcome path and on the
    /// event path alike.
    pub fn classify(span_ms: i64) -> WindowClass {
        if span_ms < ONE_HOUR_CUTOFF_MS {
            WindowClass::OneHour
        } else if span_ms < TWELVE_HOUR_CUTOFF_MS {
            WindowClass::TwelveHours
        } else {
            WindowClass::TwentyFourHours
        }
    }

    /// Registry key segment for this class
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowClass::OneHour => "1h",
            WindowClass::TwelveHours => "12h",
            WindowClass::TwentyFourHours => "24h",
        }
    }

    /// Nominal duration of this class in milliseconds
    pub fn duration_ms(&self) -> i64 {
        match self {
            WindowClass::OneHour => ONE_HOUR_MS,
            WindowClass::TwelveHours => TWELVE_HOURS_MS,
            WindowClass::TwentyFourHours => TWENTY_FOUR_HOURS_MS,
        }
    }
}

impl std::fmt::Display for WindowClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Midpoint instant of a window, used to anchor threshold resolution for
/// window-scoped checks
pub fn window_centre(window_start: i64, window_end: i64) -> i64 {
    debug_assert!(window_start <= window_end);
    window_start + (window_end - window_start) / 2
}
