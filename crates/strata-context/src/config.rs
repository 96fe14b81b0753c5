//! Context compiler configuration.

use std::time::Duration;

use strata_core::CompressionMethod;
use strata_settings::StrataSettings;

/// Tunables for [`ContextCompiler`](crate::ContextCompiler).
#[derive(Clone, Debug, PartialEq)]
pub struct ContextConfig {
    /// Smallest chunk worth including.
    pub min_chunk_tokens: usize,
    /// Fraction over target that compressed output may exceed and still be
    /// trimmed locally.
    pub compression_tolerance: f64,
    /// Share of the target compressed output must keep.
    pub min_compression_fraction: f64,
    /// Ranked files considered per compilation (`None` = all).
    pub candidate_limit: Option<usize>,
    /// Default compression method.
    pub compression_method: CompressionMethod,
    /// Deadline per compress call.
    pub call_timeout: Duration,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self::from_settings(&StrataSettings::default())
    }
}

impl ContextConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &StrataSettings) -> Self {
        let c = &settings.context;
        Self {
            min_chunk_tokens: c.min_chunk_tokens.max(1),
            compression_tolerance: c.compression_tolerance.clamp(0.0, 1.0),
            min_compression_fraction: c.min_compression_fraction.clamp(0.0, 1.0),
            candidate_limit: c.candidate_limit,
            compression_method: c.compression_method,
            call_timeout: settings.upstream.call_timeout(),
        }
    }

    /// Largest compressed size accepted for `target` before trimming.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn tolerated(&self, target: usize) -> usize {
        target + ((target as f64) * self.compression_tolerance).ceil() as usize
    }

    /// Smallest compressed size worth keeping for `target`: the minimum
    /// chunk, or the configured share of the target when that is larger.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn compression_floor(&self, target: usize) -> usize {
        let share = ((target as f64) * self.min_compression_fraction).ceil() as usize;
        self.min_chunk_tokens.max(share)
    }
}
