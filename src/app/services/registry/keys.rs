//! Compound registry key construction
//!
//! All registry addressing is centralized here so the colon-delimited key
//! grammar lives in exactly one place. Key parts are joined by the literal
//! `::` separator; a leading or trailing separator is never emitted.

use crate::app::models::{Bound, CheckFamily};
use crate::app::services::thresholds::WindowClass;
use crate::constants::{KEY_SEPARATOR, META_SEGMENT, THRESHOLDS_SEGMENT};

/// Join key parts with the `::` separator.
///
/// Parts must be non-empty; empty parts would produce a doubled or dangling
/// separator and silently address the wrong registry subtree.
pub fn join(parts: &[&str]) -> String {
    debug_assert!(!parts.is_empty(), "registry key needs at least one part");
    debug_assert!(
        parts.iter().all(|p| !p.is_empty()),
        "registry key parts must be non-empty"
    );
    parts.join(KEY_SEPARATOR)
}

/// Method-enumeration key for a threshold family:
/// `<prefix>::thresholds::<family>`
///
/// The stored value enumerates the family's methods as `m1::m2::...`.
pub fn threshold_methods(prefix: &str, family: CheckFamily) -> String {
    let mut parts = vec![prefix, THRESHOLDS_SEGMENT];
    parts.extend_from_slice(family.key_segments());
    join(&parts)
}

/// Base key for a threshold method's granularity tag and min/max leaves:
/// `<prefix>::thresholds::<family>[::<windowDuration>]::<method>`
///
/// The window-duration segment appears only for the sigma family, whose
/// thresholds are parameterized by the tumbling window class.
pub fn threshold_base(
    prefix: &str,
    family: CheckFamily,
    window: Option<WindowClass>,
    method: &str,
) -> String {
    let mut parts = vec![prefix, THRESHOLDS_SEGMENT];
    parts.extend_from_slice(family.key_segments());
    if let Some(window) = window {
        parts.push(window.as_str());
    }
    parts.push(method);
    join(&parts)
}

/// Min/max leaf key under a threshold base:
/// `<base>::<min|max>[::<time-suffix>]`
pub fn threshold_leaf(base: &str, bound: Bound, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => join(&[base, bound.as_str(), suffix]),
        None => join(&[base, bound.as_str()]),
    }
}

/// Null-aggregate threshold key:
/// `<prefix>::thresholds::null::aggregate::<windowDuration>`
pub fn null_aggregate(prefix: &str, window: WindowClass) -> String {
    let mut parts = vec![prefix, THRESHOLDS_SEGMENT];
    parts.extend_from_slice(CheckFamily::NullAggregate.key_segments());
    parts.push(window.as_str());
    join(&parts)
}

/// Null-consecutive threshold key:
/// `<prefix>::thresholds::null::consecutive`
pub fn null_consecutive(prefix: &str) -> String {
    let mut parts = vec![prefix, THRESHOLDS_SEGMENT];
    parts.extend_from_slice(CheckFamily::NullConsecutive.key_segments());
    join(&parts)
}

/// Identity-check enumeration key for a feature:
/// `<feature>::meta::identity`
pub fn meta_identity(feature: &str) -> String {
    join(&[feature, META_SEGMENT, "identity"])
}

/// Identity-check PUID set key:
/// `<feature>::meta::identity::<name>`
pub fn meta_identity_set(feature: &str, name: &str) -> String {
    join(&[feature, META_SEGMENT, "identity", name])
}

/// Value-check enumeration key for a feature:
/// `<feature>::meta::value`
pub fn meta_value(feature: &str) -> String {
    join(&[feature, META_SEGMENT, "value"])
}

/// Intended observation spacing for a PUID prefix:
/// `<prefix>::intendedspacing` (milliseconds)
pub fn intended_spacing(prefix: &str) -> String {
    join(&[prefix, "intendedspacing"])
}
