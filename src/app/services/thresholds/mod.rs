//! Threshold resolution service
//!
//! The crux of the engine: converting a (PUID, family, instant, window
//! duration) request into the registry keys addressing the applicable
//! min/max pair, accounting for each method's temporal granularity.
//!
//! Registry layout consumed here:
//! - `<prefix>::thresholds::<family>` enumerates the family's methods
//! - `<prefix>::thresholds::<family>[::<windowDuration>]::<method>` holds the
//!   granularity tag (`single`, `hour`, `day`, `month`); the window-duration
//!   segment appears for sigma only
//! - `<base>::min[::<suffix>]` / `<base>::max[::<suffix>]` hold the bounds
//!
//! A missing method enumeration, granularity tag, or bound never errors; the
//! affected method or bound simply does not apply.

use tracing::debug;

use crate::app::models::{Bound, CheckFamily, Puid};
use crate::app::services::registry::{keys, RegistryClient};

pub mod granularity;
pub mod window;

#[cfg(test)]
pub mod tests;

// Re-export key types for convenience
pub use granularity::Granularity;
pub use window::{window_centre, WindowClass};

/// One method's applicable bounds at a resolved instant
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedThreshold {
    /// Method name as enumerated in the registry
    pub method: String,

    /// Temporal granularity the method is keyed at
    pub granularity: Granularity,

    /// Lower bound, when defined for the resolved instant
    pub min: Option<f64>,

    /// Upper bound, when defined for the resolved instant
    pub max: Option<f64>,
}

/// Resolves the thresholds applicable to an observation or window instant
#[derive(Debug, Clone)]
pub struct ThresholdResolver {
    registry: RegistryClient,
}

impl ThresholdResolver {
    /// Create a resolver over a registry client
    pub fn new(registry: RegistryClient) -> Self {
        Self { registry }
    }

    /// The underlying registry client, shared with checks that read
    /// non-threshold keys
    pub fn registry(&self) -> &RegistryClient {
        &self.registry
    }

    /// Resolve the thresholds for a PUID-keyed family at an instant.
    ///
    /// `window` must be given for the sigma family and `None` otherwise.
    pub async fn resolve(
        &self,
        puid: &Puid,
        family: CheckFamily,
        instant_ms: i64,
        window: Option<WindowClass>,
    ) -> Vec<ResolvedThreshold> {
        self.resolve_at(&puid.key_prefix(), family, instant_ms, window)
            .await
    }

    /// Resolve thresholds under an arbitrary key prefix.
    ///
    /// Metadata value checks use this to resolve range thresholds of an
    /// associated subject (e.g. a battery) rather than the observation's own
    /// PUID.
    pub async fn resolve_at(
        &self,
        prefix: &str,
        family: CheckFamily,
        instant_ms: i64,
        window: Option<WindowClass>,
    ) -> Vec<ResolvedThreshold> {
        let methods_key = keys::threshold_methods(prefix, family);
        let methods = self.registry.get_list(&methods_key).await;
        if methods.is_empty() {
            return Vec::new();
        }

        let mut resolved = Vec::with_capacity(methods.len());
        for method in methods {
            let base = keys::threshold_base(prefix, family, window, &method);

            let Some(tag) = self.registry.get(&base).await else {
                debug!("method '{method}' under '{prefix}' has no granularity tag, skipping");
                continue;
            };
            let Some(granularity) = Granularity::parse(&tag) else {
                debug!("method '{method}' under '{prefix}' has unknown granularity '{tag}', skipping");
                continue;
            };

            let suffix = granularity.suffix(instant_ms);
            if granularity != Granularity::Single && suffix.is_none() {
                debug!("instant {instant_ms} not representable at {granularity} granularity, skipping '{method}'");
                continue;
            }
            let suffix = suffix.as_deref();

            let min = self
                .registry
                .get_f64(&keys::threshold_leaf(&base, Bound::Min, suffix))
                .await;
            let max = self
                .registry
                .get_f64(&keys::threshold_leaf(&base, Bound::Max, suffix))
                .await;

            resolved.push(ResolvedThreshold {
                method,
                granularity,
                min,
                max,
            });
        }

        resolved
    }
}
