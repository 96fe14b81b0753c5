//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so partial
//! JSON is accepted and missing fields keep their compiled default.

mod context;
mod hierarchy;
mod logging;
mod ranking;
mod upstream;

pub use context::*;
pub use hierarchy::*;
pub use logging::*;
pub use ranking::*;
pub use upstream::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type for the Strata context engine.
///
/// ```json
/// {
///   "ranking": { "timeDecayDays": 14 },
///   "hierarchy": { "maxTokensPerSummary": 400 },
///   "upstream": { "callTimeoutMs": 10000 }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrataSettings {
    /// Settings schema version.
    pub version: String,
    /// Ranker defaults.
    pub ranking: RankingSettings,
    /// Hierarchy compiler settings.
    pub hierarchy: HierarchySettings,
    /// Context compiler settings.
    pub context: ContextSettings,
    /// Deadlines and concurrency for capability calls.
    pub upstream: UpstreamSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for StrataSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            ranking: RankingSettings::default(),
            hierarchy: HierarchySettings::default(),
            context: ContextSettings::default(),
            upstream: UpstreamSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl StrataSettings {
    /// Check cross-field and range constraints after layering.
    pub fn validate(&self) -> Result<()> {
        self.ranking.validate()?;
        self.hierarchy.validate()?;
        self.context.validate()?;
        self.upstream.validate()?;
        Ok(())
    }
}

pub(crate) fn check_unit_interval(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SettingsError::InvalidValue(format!(
            "{name} must be in [0, 1], got {value}"
        )))
    }
}

pub(crate) fn check_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SettingsError::InvalidValue(format!(
            "{name} must be positive, got {value}"
        )))
    }
}
