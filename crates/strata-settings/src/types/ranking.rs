//! Ranker defaults.

use serde::{Deserialize, Serialize};
use strata_core::RankingWeights;

use super::{check_positive, check_unit_interval};
use crate::errors::{Result, SettingsError};

/// Ranking settings applied when a query leaves them unspecified.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RankingSettings {
    /// Default sub-score weights.
    pub weights: RankingWeights,
    /// Half-life in days of the access-time decay.
    pub time_decay_days: f64,
    /// Days after which recency reaches zero.
    pub recency_window_days: f64,
    /// Semantic score used when no similarity can be computed.
    pub neutral_semantic: f64,
    /// Salience assumed for files without one.
    pub neutral_salience: f64,
    /// Result cap when a query sets none (`None` = unlimited).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_limit: Option<usize>,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            weights: RankingWeights::default(),
            time_decay_days: 30.0,
            recency_window_days: 90.0,
            neutral_semantic: 0.5,
            neutral_salience: 0.5,
            default_limit: None,
        }
    }
}

impl RankingSettings {
    pub(crate) fn validate(&self) -> Result<()> {
        self.weights
            .validate()
            .map_err(|e| SettingsError::InvalidValue(e.to_string()))?;
        check_positive("ranking.timeDecayDays", self.time_decay_days)?;
        check_positive("ranking.recencyWindowDays", self.recency_window_days)?;
        check_unit_interval("ranking.neutralSemantic", self.neutral_semantic)?;
        check_unit_interval("ranking.neutralSalience", self.neutral_salience)
    }
}
