//! Coarsest-level summary selection under a token budget.

use serde::{Deserialize, Serialize};
use strata_core::{Summary, SummaryHierarchy, SummaryLevel};

/// Summaries chosen to represent a project within a budget.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarySelection {
    /// Level of the chosen summaries; `None` when nothing fits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<SummaryLevel>,
    /// Chosen summaries, in hierarchy order (or ascending size for a subset).
    pub summaries: Vec<Summary>,
    /// Sum of `tokens` over `summaries`.
    pub total_tokens: usize,
    /// Whether only a subset of the node level was taken.
    pub partial: bool,
}

/// Pick the coarsest complete level costing at most `max_tokens`.
///
/// Tries the project summary, then all sections, then all nodes. When even
/// the node level is too large, returns the largest prefix of nodes sorted
/// by ascending tokens (ties by id) that still fits.
pub fn select_optimal(hierarchy: &SummaryHierarchy, max_tokens: usize) -> SummarySelection {
    for level in [SummaryLevel::Project, SummaryLevel::Section, SummaryLevel::Node] {
        let summaries = hierarchy.summaries_at(level);
        if summaries.is_empty() {
            continue;
        }
        let total: usize = summaries.iter().map(|s| s.tokens()).sum();
        if total <= max_tokens {
            return SummarySelection {
                level: Some(level),
                summaries: summaries.into_iter().cloned().collect(),
                total_tokens: total,
                partial: false,
            };
        }
    }

    let mut nodes: Vec<&Summary> = hierarchy.nodes.iter().collect();
    nodes.sort_by(|a, b| a.tokens().cmp(&b.tokens()).then_with(|| a.id.cmp(&b.id)));

    let mut total_tokens = 0;
    let mut summaries = Vec::new();
    for node in nodes {
        if total_tokens + node.tokens() > max_tokens {
            break;
        }
        total_tokens += node.tokens();
        summaries.push(node.clone());
    }

    SummarySelection {
        level: (!summaries.is_empty()).then_some(SummaryLevel::Node),
        partial: !summaries.is_empty(),
        summaries,
        total_tokens,
    }
}
