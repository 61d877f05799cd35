//! Interval policy and tier mapping
//!
//! `IntervalPolicy` resolves a `RefreshMode` to the minimum spacing between
//! permitted mutations. `TierMapping` resolves the external analysis-depth
//! tier to a `RefreshMode`. Both are plain configuration.

use crate::error::GuardError;
use crate::types::RefreshMode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Mode → minimum interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalPolicy {
    /// Minimum interval in `Normal` mode
    #[serde(rename = "normal_ms", with = "millis")]
    pub normal: Duration,
    /// Minimum interval in `Fast` mode
    #[serde(rename = "fast_ms", with = "millis")]
    pub fast: Duration,
}

impl IntervalPolicy {
    /// Create policy from explicit intervals
    #[inline]
    #[must_use]
    pub fn new(normal: Duration, fast: Duration) -> Self {
        Self { normal, fast }
    }

    /// With normal-mode interval
    #[inline]
    #[must_use]
    pub fn with_normal(mut self, interval: Duration) -> Self {
        self.normal = interval;
        self
    }

    /// With fast-mode interval
    #[inline]
    #[must_use]
    pub fn with_fast(mut self, interval: Duration) -> Self {
        self.fast = interval;
        self
    }

    /// Resolve the minimum interval for `mode`
    #[inline]
    #[must_use]
    pub fn interval_for(&self, mode: RefreshMode) -> Duration {
        match mode {
            RefreshMode::Normal => self.normal,
            RefreshMode::Fast => self.fast,
        }
    }

    /// Validate the policy
    ///
    /// # Errors
    /// - `GuardError::InvalidPolicy` if an interval is zero or `fast < normal`
    pub fn validate(&self) -> Result<(), GuardError> {
        if self.normal.is_zero() || self.fast.is_zero() {
            return Err(GuardError::InvalidPolicy(
                "intervals must be greater than zero".to_string(),
            ));
        }
        if self.fast < self.normal {
            return Err(GuardError::InvalidPolicy(format!(
                "fast interval ({}ms) must not be shorter than normal interval ({}ms)",
                self.fast.as_millis(),
                self.normal.as_millis()
            )));
        }
        Ok(())
    }
}

impl Default for IntervalPolicy {
    /// 2s normal, 5s fast
    fn default() -> Self {
        Self {
            normal: Duration::from_secs(2),
            fast: Duration::from_secs(5),
        }
    }
}

/// Analysis-depth tier → refresh mode
///
/// Tiers at or below `fast_max_depth` are quick analyses that finish
/// fast and therefore refresh in `Fast` mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierMapping {
    /// Highest depth treated as a quick analysis
    pub fast_max_depth: u32,
}

impl TierMapping {
    /// Create mapping with explicit threshold
    #[inline]
    #[must_use]
    pub fn new(fast_max_depth: u32) -> Self {
        Self { fast_max_depth }
    }

    /// Resolve mode for a depth tier
    #[inline]
    #[must_use]
    pub fn mode_for_depth(&self, depth: u32) -> RefreshMode {
        if depth <= self.fast_max_depth {
            RefreshMode::Fast
        } else {
            RefreshMode::Normal
        }
    }

    /// Resolve mode for an optional depth; unknown depth is `Normal`
    #[inline]
    #[must_use]
    pub fn mode_for(&self, depth: Option<u32>) -> RefreshMode {
        depth.map_or(RefreshMode::Normal, |d| self.mode_for_depth(d))
    }
}

impl Default for TierMapping {
    fn default() -> Self {
        Self { fast_max_depth: 1 }
    }
}

/// Serde helpers: `Duration` as integer milliseconds
pub(crate) mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(crate) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fast_is_longer() {
        let policy = IntervalPolicy::default();
        assert_eq!(policy.interval_for(RefreshMode::Normal), Duration::from_secs(2));
        assert_eq!(policy.interval_for(RefreshMode::Fast), Duration::from_secs(5));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero() {
        let policy = IntervalPolicy::default().with_normal(Duration::ZERO);
        assert!(matches!(policy.validate(), Err(GuardError::InvalidPolicy(_))));
    }

    #[test]
    fn validate_rejects_inverted() {
        let policy = IntervalPolicy::new(Duration::from_secs(5), Duration::from_secs(2));
        assert!(policy.validate().is_err());
    }

    #[test]
    fn equal_intervals_allowed() {
        let policy = IntervalPolicy::new(Duration::from_secs(3), Duration::from_secs(3));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn tier_mapping_defaults() {
        let tiers = TierMapping::default();
        assert_eq!(tiers.mode_for_depth(1), RefreshMode::Fast);
        assert_eq!(tiers.mode_for_depth(2), RefreshMode::Normal);
        assert_eq!(tiers.mode_for_depth(5), RefreshMode::Normal);
        assert_eq!(tiers.mode_for(None), RefreshMode::Normal);
        assert_eq!(tiers.mode_for(Some(1)), RefreshMode::Fast);
    }

    #[test]
    fn tier_mapping_custom_threshold() {
        let tiers = TierMapping::new(2);
        assert_eq!(tiers.mode_for_depth(2), RefreshMode::Fast);
        assert_eq!(tiers.mode_for_depth(3), RefreshMode::Normal);
    }
}
