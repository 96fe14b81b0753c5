//! Output of context compilation.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::SummaryId;
use crate::summary::{StaleHierarchyWarning, SummaryLevel};

/// What a context item or candidate refers to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ItemSource {
    /// A raw project file.
    File {
        /// File name.
        name: String,
    },
    /// A summary from the hierarchy.
    Summary {
        /// Summary id.
        id: SummaryId,
        /// Summary level.
        level: SummaryLevel,
    },
}

impl ItemSource {
    /// Name used for tie-breaking and logs.
    pub fn label(&self) -> &str {
        match self {
            Self::File { name } => name,
            Self::Summary { id, .. } => id.as_str(),
        }
    }
}

impl fmt::Display for ItemSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File { name } => write!(f, "file {name}"),
            Self::Summary { id, level } => write!(f, "{level} summary {id}"),
        }
    }
}

/// One piece of the compiled context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextItem {
    /// Origin.
    pub source: ItemSource,
    /// Included text (compressed when `compressed`).
    pub content: String,
    /// Tokens of `content`.
    pub tokens: usize,
    /// Tokens before compression.
    pub original_tokens: usize,
    /// Combined ranking score.
    pub score: f64,
    /// Whether `content` came from the compression capability.
    pub compressed: bool,
}

/// Why a candidate was left out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum SkipReason {
    /// Compression call failed or timed out.
    CompressionFailed {
        /// Error detail.
        message: String,
    },
    /// Compressed output still exceeded the remaining budget.
    CompressionInsufficient {
        /// Tokens produced.
        achieved: usize,
        /// Tokens that were available.
        target: usize,
    },
    /// Compressed output was too small to be worth including.
    CompressionTooSmall {
        /// Tokens produced.
        achieved: usize,
        /// Smallest useful chunk.
        minimum: usize,
    },
    /// Compression capability reported itself unavailable.
    ServiceUnavailable,
    /// Remaining budget fell below the minimum chunk size.
    BudgetExhausted,
    /// Covered by another candidate for the same file.
    Duplicate,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CompressionFailed { message } => write!(f, "compression failed: {message}"),
            Self::CompressionInsufficient { achieved, target } => {
                write!(f, "compressed to {achieved} tokens, {target} available")
            }
            Self::CompressionTooSmall { achieved, minimum } => {
                write!(f, "compressed to {achieved} tokens, below minimum chunk of {minimum}")
            }
            Self::ServiceUnavailable => f.write_str("compression service unavailable"),
            Self::BudgetExhausted => f.write_str("budget exhausted"),
            Self::Duplicate => f.write_str("duplicate of another candidate"),
        }
    }
}

/// A candidate that did not make it into the context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedCandidate {
    /// Origin.
    pub source: ItemSource,
    /// Uncompressed size.
    pub tokens: usize,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// A compiled, budget-bounded context.
///
/// `used_tokens <= total_tokens` always holds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextCompilation {
    /// Correlates logs for this compilation.
    pub compilation_id: Uuid,
    /// Query the context was compiled for.
    pub query: String,
    /// Selected items in rank order.
    pub items: Vec<ContextItem>,
    /// Tokens across `items`.
    pub used_tokens: usize,
    /// Budget that was available.
    pub total_tokens: usize,
    /// `used_tokens` over the original size of the included candidates.
    pub compression_ratio: f64,
    /// Candidates left out, with reasons.
    pub skipped: Vec<SkippedCandidate>,
    /// Whether any relevant content was left out.
    pub incomplete: bool,
    /// Whether ranking ran without semantic scores for some candidates.
    pub degraded: bool,
    /// Stale parts of the hierarchy that contributed summaries.
    #[serde(default)]
    pub warnings: Vec<StaleHierarchyWarning>,
}

impl ContextCompilation {
    /// A valid compilation with nothing selected.
    pub fn empty(compilation_id: Uuid, query: impl Into<String>, total_tokens: usize) -> Self {
        Self {
            compilation_id,
            query: query.into(),
            items: Vec::new(),
            used_tokens: 0,
            total_tokens,
            compression_ratio: 1.0,
            skipped: Vec::new(),
            incomplete: true,
            degraded: false,
            warnings: Vec::new(),
        }
    }

    /// Concatenated item contents, separated by blank lines.
    pub fn render(&self) -> String {
        self.items
            .iter()
            .map(|item| item.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
