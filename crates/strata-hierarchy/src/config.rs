//! Hierarchy compiler configuration.

use std::time::Duration;

use strata_core::SummaryType;
use strata_settings::{ClusteringStrategy, StrataSettings};

/// Tunables for [`HierarchyCompiler`](crate::HierarchyCompiler).
#[derive(Clone, Debug, PartialEq)]
pub struct HierarchyConfig {
    /// Token cap for every generated summary.
    pub max_tokens_per_summary: usize,
    /// Weighted section churn above which `update_hierarchy` regenerates
    /// the project summary.
    pub churn_threshold: f64,
    /// Section grouping policy.
    pub clustering: ClusteringStrategy,
    /// Largest section before it is split.
    pub max_cluster_size: usize,
    /// Production method for node summaries.
    pub node_summary_type: SummaryType,
    /// Deadline per summarize call.
    pub call_timeout: Duration,
    /// Concurrent summarize calls per compilation.
    pub concurrency_limit: usize,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self::from_settings(&StrataSettings::default())
    }
}

impl HierarchyConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &StrataSettings) -> Self {
        let h = &settings.hierarchy;
        Self {
            max_tokens_per_summary: h.max_tokens_per_summary,
            churn_threshold: h.churn_threshold,
            clustering: h.clustering,
            max_cluster_size: h.max_cluster_size.max(1),
            node_summary_type: h.node_summary_type,
            call_timeout: settings.upstream.call_timeout(),
            concurrency_limit: settings.upstream.concurrency_limit.max(1),
        }
    }
}
