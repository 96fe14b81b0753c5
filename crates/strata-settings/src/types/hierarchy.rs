//! Hierarchy compiler settings.

use serde::{Deserialize, Serialize};
use strata_core::SummaryType;

use super::check_unit_interval;
use crate::errors::{Result, SettingsError};

/// How node summaries are grouped into sections.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClusteringStrategy {
    /// Task, then first tag, then top-level directory, then `general`.
    #[default]
    Metadata,
    /// Top-level directory only.
    Directory,
    /// One section for the whole project.
    Single,
}

/// Hierarchy compiler settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HierarchySettings {
    /// Token cap for every generated summary.
    pub max_tokens_per_summary: usize,
    /// Weighted token churn above which the root is regenerated.
    pub churn_threshold: f64,
    /// Section grouping policy.
    pub clustering: ClusteringStrategy,
    /// Largest number of nodes in one section before it is split.
    pub max_cluster_size: usize,
    /// Production method requested for node summaries.
    pub node_summary_type: SummaryType,
}

impl Default for HierarchySettings {
    fn default() -> Self {
        Self {
            max_tokens_per_summary: 500,
            churn_threshold: 0.2,
            clustering: ClusteringStrategy::default(),
            max_cluster_size: 12,
            node_summary_type: SummaryType::Extractive,
        }
    }
}

impl HierarchySettings {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_tokens_per_summary == 0 {
            return Err(SettingsError::InvalidValue(
                "hierarchy.maxTokensPerSummary must be at least 1".to_string(),
            ));
        }
        if self.max_cluster_size == 0 {
            return Err(SettingsError::InvalidValue(
                "hierarchy.maxClusterSize must be at least 1".to_string(),
            ));
        }
        check_unit_interval("hierarchy.churnThreshold", self.churn_threshold)
    }
}
