//! Ranking query and result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, StrataError};
use crate::files::EnhancedFile;

/// Weights applied to each sub-score when computing the combined score.
///
/// Defaults favour semantic similarity, then time decay, with recency,
/// salience, and frequency as tie-shaping signals. They sum to 1.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RankingWeights {
    /// Weight of query/file embedding similarity.
    pub semantic: f64,
    /// Weight of linear recency of the last update.
    pub recency: f64,
    /// Weight of normalized access count.
    pub frequency: f64,
    /// Weight of stored salience.
    pub salience: f64,
    /// Weight of exponential decay since last access.
    pub time_decay: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            semantic: 0.40,
            recency: 0.15,
            frequency: 0.10,
            salience: 0.15,
            time_decay: 0.20,
        }
    }
}

impl RankingWeights {
    /// Sum of all weights.
    pub fn total(&self) -> f64 {
        self.semantic + self.recency + self.frequency + self.salience + self.time_decay
    }

    /// Reject negative, non-finite, or all-zero weights.
    pub fn validate(&self) -> Result<()> {
        let all = [
            ("semantic", self.semantic),
            ("recency", self.recency),
            ("frequency", self.frequency),
            ("salience", self.salience),
            ("timeDecay", self.time_decay),
        ];
        for (name, w) in all {
            if !w.is_finite() || w < 0.0 {
                return Err(StrataError::validation(format!(
                    "ranking weight {name} must be a non-negative number, got {w}"
                )));
            }
        }
        if self.total() <= 0.0 {
            return Err(StrataError::validation("ranking weights sum to zero"));
        }
        Ok(())
    }

    /// Weights scaled to sum to 1, so the combined score stays in `[0, 1]`.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let total = self.total();
        if total <= 0.0 {
            return Self::default();
        }
        Self {
            semantic: self.semantic / total,
            recency: self.recency / total,
            frequency: self.frequency / total,
            salience: self.salience / total,
            time_decay: self.time_decay / total,
        }
    }
}

/// Parameters of a ranking request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Project whose files are ranked.
    pub project_name: String,
    /// Free-text query.
    pub query: String,
    /// Caller weights; ranker defaults when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<RankingWeights>,
    /// Maximum results after sorting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Half-life for the time-decay score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_decay_days: Option<f64>,
    /// Instant ages are measured from; now when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_time: Option<DateTime<Utc>>,
}

impl SearchQuery {
    /// Query with ranker defaults.
    pub fn new(project_name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            query: query.into(),
            weights: None,
            limit: None,
            time_decay_days: None,
            reference_time: None,
        }
    }

    /// Override the weights.
    #[must_use]
    pub fn with_weights(mut self, weights: RankingWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Truncate the sorted result.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Override the decay half-life.
    #[must_use]
    pub fn with_time_decay_days(mut self, days: f64) -> Self {
        self.time_decay_days = Some(days);
        self
    }

    /// Pin the reference instant.
    #[must_use]
    pub fn at(mut self, reference_time: DateTime<Utc>) -> Self {
        self.reference_time = Some(reference_time);
        self
    }
}

/// Per-file sub-scores, each in `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    /// Embedding similarity (neutral when unavailable).
    pub semantic: f64,
    /// Linear decay of the last update over the recency window.
    pub recency: f64,
    /// Log-normalized access count.
    pub frequency: f64,
    /// Stored importance.
    pub salience: f64,
    /// Exponential decay since last access.
    pub time_decay: f64,
    /// Weighted sum.
    pub combined: f64,
}

/// One ranked file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// The file.
    pub file: EnhancedFile,
    /// Score breakdown.
    pub scores: ScoreBreakdown,
    /// Whether `scores.semantic` is the neutral fallback.
    pub semantic_degraded: bool,
}

/// Ranked files for a query.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Results sorted by combined score.
    pub results: Vec<SearchResult>,
    /// Files scored before truncation.
    pub total_candidates: usize,
    /// Whether any candidate fell back to neutral semantic scoring.
    pub degraded: bool,
    /// Normalized weights that were applied.
    pub weights: RankingWeights,
}
