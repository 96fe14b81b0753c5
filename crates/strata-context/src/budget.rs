//! Default budgets per context type.
//!
//! Pure and table-driven: a base budget per [`ContextType`], scaled by a
//! coarse query-length signal. `qa` gets a small budget weighted toward raw
//! files, `summarization` a large one weighted toward summaries.

use strata_core::{ContextBudget, ContextType};

/// Budget defaults for one context type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BudgetProfile {
    /// Budget for a short query.
    pub base_tokens: i64,
    /// Share intended for raw files.
    pub search_ratio: f64,
    /// Share intended for summaries.
    pub summary_ratio: f64,
}

impl BudgetProfile {
    /// Profile for `context_type`.
    pub const fn for_type(context_type: ContextType) -> Self {
        match context_type {
            ContextType::Search => Self {
                base_tokens: 4_000,
                search_ratio: 0.7,
                summary_ratio: 0.3,
            },
            ContextType::Summarization => Self {
                base_tokens: 8_000,
                search_ratio: 0.3,
                summary_ratio: 0.7,
            },
            ContextType::Qa => Self {
                base_tokens: 2_000,
                search_ratio: 0.8,
                summary_ratio: 0.2,
            },
        }
    }
}

/// Scale for the number of words in the query.
fn length_factor(query: &str) -> f64 {
    match query.split_whitespace().count() {
        0..=4 => 1.0,
        5..=15 => 1.25,
        _ => 1.5,
    }
}

/// Default budget for `query` and a context type name.
///
/// Unknown type names fall back to `search`.
pub fn recommend_budget(query: &str, context_type: &str) -> ContextBudget {
    recommend_budget_for(query, ContextType::parse_lossy(context_type))
}

/// Default budget for `query` and a typed context type.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn recommend_budget_for(query: &str, context_type: ContextType) -> ContextBudget {
    let profile = BudgetProfile::for_type(context_type);
    let max_tokens = (profile.base_tokens as f64 * length_factor(query)).round() as i64;
    ContextBudget::new(max_tokens).with_allocation(profile.search_ratio, profile.summary_ratio)
}
