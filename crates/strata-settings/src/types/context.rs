//! Context compiler settings.

use serde::{Deserialize, Serialize};
use strata_core::CompressionMethod;

use super::check_unit_interval;
use crate::errors::{Result, SettingsError};

/// Context compiler settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextSettings {
    /// Smallest chunk worth including; below this, filling stops.
    pub min_chunk_tokens: usize,
    /// Fraction over target that compressed output may exceed before it is
    /// skipped instead of trimmed.
    pub compression_tolerance: f64,
    /// Share of the compression target the output must keep to be worth
    /// including.
    pub min_compression_fraction: f64,
    /// Ranked files considered per compilation (`None` = all).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_limit: Option<usize>,
    /// Compression method requested from the content service.
    pub compression_method: CompressionMethod,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            min_chunk_tokens: 32,
            compression_tolerance: 0.05,
            min_compression_fraction: 0.25,
            candidate_limit: None,
            compression_method: CompressionMethod::Balanced,
        }
    }
}

impl ContextSettings {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.min_chunk_tokens == 0 {
            return Err(SettingsError::InvalidValue(
                "context.minChunkTokens must be at least 1".to_string(),
            ));
        }
        check_unit_interval("context.compressionTolerance", self.compression_tolerance)?;
        check_unit_interval("context.minCompressionFraction", self.min_compression_fraction)
    }
}
