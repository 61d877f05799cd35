//! Guard configuration
//!
//! Loaded from TOML. All durations are integer milliseconds except
//! `max_duration_secs`.
//!
//! ```toml
//! [intervals]
//! normal_ms = 2000
//! fast_ms = 5000
//!
//! [tiers]
//! fast_max_depth = 1
//!
//! [display]
//! poll_interval_ms = 1000
//! fast_poll_interval_ms = 6000
//! max_duration_secs = 1800
//! ```

use crate::error::GuardError;
use crate::policy::{IntervalPolicy, TierMapping};
use crate::types::RefreshMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Full guard + display configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Mode → minimum mutation interval
    pub intervals: IntervalPolicy,
    /// Depth tier → mode
    pub tiers: TierMapping,
    /// Auto-refresh loop cadence
    pub display: DisplaySettings,
}

impl GuardConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With interval policy
    #[inline]
    #[must_use]
    pub fn with_intervals(mut self, intervals: IntervalPolicy) -> Self {
        self.intervals = intervals;
        self
    }

    /// With tier mapping
    #[inline]
    #[must_use]
    pub fn with_tiers(mut self, tiers: TierMapping) -> Self {
        self.tiers = tiers;
        self
    }

    /// With display settings
    #[inline]
    #[must_use]
    pub fn with_display(mut self, display: DisplaySettings) -> Self {
        self.display = display;
        self
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// - `GuardError::Config` on malformed TOML
    /// - `GuardError::InvalidPolicy` if the parsed values are unusable
    pub fn from_toml_str(source: &str) -> Result<Self, GuardError> {
        let config: Self =
            toml::from_str(source).map_err(|e| GuardError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    /// - `GuardError::Io` if the file cannot be read
    /// - see [`GuardConfig::from_toml_str`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GuardError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.display(), "loaded guard configuration");
        Ok(config)
    }

    /// Serialize as pretty TOML
    ///
    /// # Errors
    /// - `GuardError::Config` if serialization fails
    pub fn to_toml_string(&self) -> Result<String, GuardError> {
        toml::to_string_pretty(self).map_err(|e| GuardError::Config(e.to_string()))
    }

    /// Validate all sections
    ///
    /// # Errors
    /// - `GuardError::InvalidPolicy` on zero or inverted intervals
    pub fn validate(&self) -> Result<(), GuardError> {
        self.intervals.validate()?;
        self.display.validate()
    }
}

/// Auto-refresh loop settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Sleep between polls in `Normal` mode
    pub poll_interval_ms: u64,
    /// Sleep between polls in `Fast` mode
    pub fast_poll_interval_ms: u64,
    /// Stop auto-refreshing after this long
    pub max_duration_secs: u64,
}

impl DisplaySettings {
    /// Poll sleep for `mode`
    #[inline]
    #[must_use]
    pub fn poll_interval_for(&self, mode: RefreshMode) -> Duration {
        match mode {
            RefreshMode::Normal => Duration::from_millis(self.poll_interval_ms),
            RefreshMode::Fast => Duration::from_millis(self.fast_poll_interval_ms),
        }
    }

    /// Auto-refresh time limit
    #[inline]
    #[must_use]
    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }

    fn validate(&self) -> Result<(), GuardError> {
        if self.poll_interval_ms == 0 || self.fast_poll_interval_ms == 0 {
            return Err(GuardError::InvalidPolicy(
                "poll intervals must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            fast_poll_interval_ms: 6_000,
            max_duration_secs: 1_800,
        }
    }
}
