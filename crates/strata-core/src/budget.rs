//! Token budgets for context compilation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, StrataError};

/// Kind of context being assembled; selects budget defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextType {
    /// Retrieval of relevant files.
    #[default]
    Search,
    /// Broad overview, weighted toward coarse summaries.
    Summarization,
    /// Small, precise context for answering a question.
    Qa,
}

impl ContextType {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Summarization => "summarization",
            Self::Qa => "qa",
        }
    }

    /// Parse, falling back to [`ContextType::Search`] for unknown names.
    pub fn parse_lossy(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContextType {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "search" => Ok(Self::Search),
            "summarization" | "summary" => Ok(Self::Summarization),
            "qa" => Ok(Self::Qa),
            other => Err(StrataError::validation(format!(
                "unknown context type: {other}"
            ))),
        }
    }
}

/// Token ceiling for an assembled context, with optional allocation hints.
///
/// `max_tokens` is signed because it arrives from callers unvalidated; use
/// [`ContextBudget::validated_max`] before doing arithmetic with it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextBudget {
    /// Hard ceiling on used tokens.
    pub max_tokens: i64,
    /// Share of the budget intended for raw files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_ratio: Option<f64>,
    /// Share of the budget intended for summaries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_ratio: Option<f64>,
}

impl ContextBudget {
    /// Budget without allocation hints.
    pub fn new(max_tokens: i64) -> Self {
        Self {
            max_tokens,
            search_ratio: None,
            summary_ratio: None,
        }
    }

    /// Attach allocation hints.
    #[must_use]
    pub fn with_allocation(mut self, search_ratio: f64, summary_ratio: f64) -> Self {
        self.search_ratio = Some(search_ratio);
        self.summary_ratio = Some(summary_ratio);
        self
    }

    /// `max_tokens` as a count, rejecting zero and negative budgets.
    pub fn validated_max(&self) -> Result<usize> {
        if self.max_tokens <= 0 {
            return Err(StrataError::validation(format!(
                "budget must be positive, got {}",
                self.max_tokens
            )));
        }
        for (name, ratio) in [("searchRatio", self.search_ratio), ("summaryRatio", self.summary_ratio)] {
            if let Some(r) = ratio {
                if !r.is_finite() || !(0.0..=1.0).contains(&r) {
                    return Err(StrataError::validation(format!(
                        "{name} must be within [0, 1], got {r}"
                    )));
                }
            }
        }
        usize::try_from(self.max_tokens)
            .map_err(|_| StrataError::validation("budget exceeds addressable range"))
    }

    /// Tokens intended for raw files (whole budget without a hint).
    pub fn file_allocation(&self, max: usize) -> usize {
        Self::share(max, self.search_ratio)
    }

    /// Tokens intended for summaries (whole budget without a hint).
    pub fn summary_allocation(&self, max: usize) -> usize {
        Self::share(max, self.summary_ratio)
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn share(max: usize, ratio: Option<f64>) -> usize {
        match ratio {
            Some(r) => ((max as f64) * r.clamp(0.0, 1.0)).floor() as usize,
            None => max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn context_type_parse() {
        assert_eq!("qa".parse::<ContextType>().unwrap(), ContextType::Qa);
        assert_eq!(" Summarization ".parse::<ContextType>().unwrap(), ContextType::Summarization);
        assert!("chat".parse::<ContextType>().is_err());
        assert_eq!(ContextType::parse_lossy("chat"), ContextType::Search);
    }

    #[test]
    fn validated_max_rejects_non_positive() {
        assert_matches!(ContextBudget::new(0).validated_max(), Err(StrataError::Validation(_)));
        assert_matches!(ContextBudget::new(-5).validated_max(), Err(StrataError::Validation(_)));
        assert_eq!(ContextBudget::new(250).validated_max().unwrap(), 250);
    }

    #[test]
    fn validated_max_rejects_bad_ratios() {
        let budget = ContextBudget::new(100).with_allocation(1.5, 0.2);
        assert!(budget.validated_max().is_err());
    }

    #[test]
    fn allocations_follow_hints() {
        let budget = ContextBudget::new(1000).with_allocation(0.7, 0.3);
        assert_eq!(budget.file_allocation(1000), 700);
        assert_eq!(budget.summary_allocation(1000), 300);
        let plain = ContextBudget::new(1000);
        assert_eq!(plain.file_allocation(1000), 1000);
        assert_eq!(plain.summary_allocation(1000), 1000);
    }
}
