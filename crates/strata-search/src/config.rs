//! Ranker configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strata_core::RankingWeights;
use strata_settings::StrataSettings;

/// Defaults applied to queries that leave a parameter unset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankerConfig {
    /// Weights used when the query carries none.
    pub weights: RankingWeights,
    /// Half-life in days of the access-time decay.
    pub time_decay_days: f64,
    /// Days after which recency reaches zero.
    pub recency_window_days: f64,
    /// Semantic score when similarity is unavailable.
    pub neutral_semantic: f64,
    /// Salience assumed for files without one.
    pub neutral_salience: f64,
    /// Result cap when the query sets none.
    pub default_limit: Option<usize>,
    /// Deadline for each vector or embedding call.
    #[serde(with = "duration_ms")]
    pub call_timeout: Duration,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self::from_settings(&StrataSettings::default())
    }
}

impl RankerConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &StrataSettings) -> Self {
        let ranking = &settings.ranking;
        Self {
            weights: ranking.weights,
            time_decay_days: ranking.time_decay_days,
            recency_window_days: ranking.recency_window_days,
            neutral_semantic: ranking.neutral_semantic,
            neutral_salience: ranking.neutral_salience,
            default_limit: ranking.default_limit,
            call_timeout: settings.upstream.call_timeout(),
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_settings_copies_ranking_section() {
        let mut settings = StrataSettings::default();
        settings.ranking.time_decay_days = 7.0;
        settings.upstream.call_timeout_ms = 250;
        let config = RankerConfig::from_settings(&settings);
        assert!((config.time_decay_days - 7.0).abs() < f64::EPSILON);
        assert_eq!(config.call_timeout, Duration::from_millis(250));
        assert_eq!(config.weights, RankingWeights::default());
    }

    #[test]
    fn timeout_serializes_as_millis() {
        let json = serde_json::to_value(RankerConfig::default()).unwrap();
        assert_eq!(json["callTimeout"], 30_000);
        let back: RankerConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back.call_timeout, Duration::from_secs(30));
    }
}
