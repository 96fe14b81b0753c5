//! Options passed to the content service.
//!
//! Styles and compression methods are tagged variants interpreted by the
//! service; Strata never branches on them itself.

use serde::{Deserialize, Serialize};

use crate::summary::{SummaryLevel, SummaryType};

/// Output layout requested from summarization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryStyle {
    /// One bullet per point.
    BulletPoints,
    /// Flowing prose.
    #[default]
    Paragraph,
    /// Headed sections.
    Structured,
}

/// Options for [`ContentService::summarize`](crate::capabilities::ContentService::summarize).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeOptions {
    /// Level being produced.
    pub level: SummaryLevel,
    /// Production method.
    #[serde(rename = "type")]
    pub summary_type: SummaryType,
    /// Token cap on the output.
    pub max_tokens: usize,
    /// Output layout.
    pub style: SummaryStyle,
    /// Keep headings and lists from the input.
    pub preserve_structure: bool,
    /// Topics to emphasize.
    #[serde(default)]
    pub focus_areas: Vec<String>,
}

impl SummarizeOptions {
    /// Options with paragraph style and no focus areas.
    pub fn new(level: SummaryLevel, summary_type: SummaryType, max_tokens: usize) -> Self {
        Self {
            level,
            summary_type,
            max_tokens,
            style: SummaryStyle::default(),
            preserve_structure: level != SummaryLevel::Node,
            focus_areas: Vec::new(),
        }
    }
}

/// How hard compression may cut.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMethod {
    /// Drop anything non-essential.
    Aggressive,
    /// Default trade-off.
    #[default]
    Balanced,
    /// Keep as much wording as possible.
    Conservative,
}

/// Size goal for compression.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompressionTarget {
    /// Absolute token count.
    TargetTokens(usize),
    /// Fraction of the input size.
    CompressionRatio(f64),
}

impl CompressionTarget {
    /// Target token count for an input of `tokens_before` tokens.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn resolve(self, tokens_before: usize) -> usize {
        match self {
            Self::TargetTokens(n) => n,
            Self::CompressionRatio(r) => ((tokens_before as f64) * r.clamp(0.0, 1.0)).floor() as usize,
        }
    }
}

/// Options for [`ContentService::compress`](crate::capabilities::ContentService::compress).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressOptions {
    /// Size goal.
    pub target: CompressionTarget,
    /// Terms that must survive compression.
    #[serde(default)]
    pub preserve_keywords: Vec<String>,
    /// Aggressiveness.
    pub method: CompressionMethod,
    /// Keep the output readable as prose.
    pub maintain_coherence: bool,
}

impl CompressOptions {
    /// Compress to at most `target_tokens`.
    pub fn target_tokens(target_tokens: usize) -> Self {
        Self {
            target: CompressionTarget::TargetTokens(target_tokens),
            preserve_keywords: Vec::new(),
            method: CompressionMethod::default(),
            maintain_coherence: true,
        }
    }

    /// Set the method.
    #[must_use]
    pub fn with_method(mut self, method: CompressionMethod) -> Self {
        self.method = method;
        self
    }

    /// Set keywords to preserve.
    #[must_use]
    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.preserve_keywords = keywords;
        self
    }
}

/// Result of a compression call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionOutput {
    /// Shortened text.
    pub compressed_text: String,
    /// Input size reported by the service.
    pub tokens_before: usize,
    /// Output size reported by the service.
    pub tokens_after: usize,
}
