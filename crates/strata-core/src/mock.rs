//! Deterministic [`ContentService`] for tests and offline use.
//!
//! Summaries and compressions are word-boundary truncations, token counts
//! use [`estimate_tokens`], and embeddings are hashed bag-of-words vectors,
//! so identical inputs always produce identical outputs. Failures, outages,
//! and latency can be injected at runtime.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::capabilities::ContentService;
use crate::errors::UpstreamError;
use crate::options::{CompressOptions, CompressionOutput, SummarizeOptions};
use crate::tokens::{estimate_tokens, truncate_to_tokens};
use crate::vector::l2_normalize;

/// Dimensions of the hashed embeddings.
pub const MOCK_EMBEDDING_DIM: usize = 64;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Mock content service with failure injection and call counters.
#[derive(Debug)]
pub struct MockContentService {
    available: AtomicBool,
    embeddings: AtomicBool,
    fail_compress: AtomicBool,
    ignore_limits: AtomicBool,
    summarize_fail_markers: Mutex<Vec<String>>,
    compress_overshoot: Mutex<f64>,
    delay: Mutex<Option<Duration>>,
    summarize_calls: AtomicUsize,
    compress_calls: AtomicUsize,
    embed_calls: AtomicUsize,
}

impl Default for MockContentService {
    fn default() -> Self {
        Self {
            available: AtomicBool::new(true),
            embeddings: AtomicBool::new(false),
            fail_compress: AtomicBool::new(false),
            ignore_limits: AtomicBool::new(false),
            summarize_fail_markers: Mutex::new(Vec::new()),
            compress_overshoot: Mutex::new(1.0),
            delay: Mutex::new(None),
            summarize_calls: AtomicUsize::new(0),
            compress_calls: AtomicUsize::new(0),
            embed_calls: AtomicUsize::new(0),
        }
    }
}

impl MockContentService {
    /// Available service without embedding support.
    pub fn new() -> Self {
        Self::default()
    }

    /// Available service that also offers embeddings.
    pub fn with_embeddings() -> Self {
        let service = Self::default();
        service.embeddings.store(true, Ordering::SeqCst);
        service
    }

    /// Toggle availability. While unavailable every async call fails.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Fail `summarize` for any input containing `marker`.
    pub fn fail_summarize_containing(&self, marker: impl Into<String>) {
        self.summarize_fail_markers.lock().push(marker.into());
    }

    /// Clear all summarize failure markers.
    pub fn clear_summarize_failures(&self) {
        self.summarize_fail_markers.lock().clear();
    }

    /// Make every `compress` call fail.
    pub fn set_fail_compress(&self, fail: bool) {
        self.fail_compress.store(fail, Ordering::SeqCst);
    }

    /// Scale compression output to `factor × target` tokens.
    ///
    /// Values above 1.0 simulate a service that cannot reach its target.
    pub fn set_compress_overshoot(&self, factor: f64) {
        *self.compress_overshoot.lock() = factor.max(0.0);
    }

    /// Return summaries untruncated, ignoring `max_tokens`.
    pub fn set_ignore_limits(&self, ignore: bool) {
        self.ignore_limits.store(ignore, Ordering::SeqCst);
    }

    /// Sleep before answering every async call.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// `summarize` calls received.
    pub fn summarize_calls(&self) -> usize {
        self.summarize_calls.load(Ordering::SeqCst)
    }

    /// `compress` calls received.
    pub fn compress_calls(&self) -> usize {
        self.compress_calls.load(Ordering::SeqCst)
    }

    /// `get_embedding` calls received.
    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    /// Hashed bag-of-words embedding, L2-normalized.
    ///
    /// Texts sharing words get positive cosine similarity.
    pub fn embed_text(text: &str) -> Vec<f32> {
        let mut v = vec![0.0_f32; MOCK_EMBEDDING_DIM];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let idx = usize::try_from(fnv1a(&word.to_lowercase()) % MOCK_EMBEDDING_DIM as u64)
                .unwrap_or_default();
            v[idx] += 1.0;
        }
        l2_normalize(&mut v);
        v
    }

    async fn pre_call(&self, operation: &str) -> Result<(), UpstreamError> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(UpstreamError::Unavailable(format!("mock {operation}")))
        }
    }
}

fn fnv1a(word: &str) -> u64 {
    word.bytes()
        .fold(FNV_OFFSET, |hash, b| (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME))
}

#[async_trait]
impl ContentService for MockContentService {
    async fn summarize(
        &self,
        content: &str,
        opts: &SummarizeOptions,
    ) -> Result<String, UpstreamError> {
        let _ = self.summarize_calls.fetch_add(1, Ordering::SeqCst);
        self.pre_call("summarize").await?;

        let failing = self
            .summarize_fail_markers
            .lock()
            .iter()
            .any(|marker| content.contains(marker.as_str()));
        if failing {
            return Err(UpstreamError::failed("summarize", "injected failure"));
        }

        if self.ignore_limits.load(Ordering::SeqCst) {
            return Ok(format!("{content}\n{content}"));
        }
        Ok(truncate_to_tokens(content.trim(), opts.max_tokens))
    }

    async fn compress(
        &self,
        content: &str,
        opts: &CompressOptions,
    ) -> Result<CompressionOutput, UpstreamError> {
        let _ = self.compress_calls.fetch_add(1, Ordering::SeqCst);
        self.pre_call("compress").await?;
        if self.fail_compress.load(Ordering::SeqCst) {
            return Err(UpstreamError::failed("compress", "injected failure"));
        }

        let tokens_before = estimate_tokens(content);
        let target = opts.target.resolve(tokens_before);
        let factor = *self.compress_overshoot.lock();
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let reach = ((target as f64) * factor).ceil() as usize;

        let compressed_text = truncate_to_tokens(content, reach);
        let tokens_after = estimate_tokens(&compressed_text);
        Ok(CompressionOutput {
            compressed_text,
            tokens_before,
            tokens_after,
        })
    }

    fn count_tokens(&self, content: &str) -> usize {
        estimate_tokens(content)
    }

    fn supports_embedding(&self) -> bool {
        self.embeddings.load(Ordering::SeqCst)
    }

    async fn get_embedding(&self, text: &str) -> Result<Vec<f32>, UpstreamError> {
        let _ = self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if !self.supports_embedding() {
            return Err(UpstreamError::Unsupported("embedding".to_string()));
        }
        self.pre_call("embedding").await?;
        Ok(Self::embed_text(text))
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CompressionTarget;
    use crate::summary::{SummaryLevel, SummaryType};
    use crate::vector::cosine_similarity;
    use assert_matches::assert_matches;

    fn opts(max: usize) -> SummarizeOptions {
        SummarizeOptions::new(SummaryLevel::Node, SummaryType::Extractive, max)
    }

    #[tokio::test]
    async fn summarize_respects_max_tokens() {
        let svc = MockContentService::new();
        let text = "lorem ipsum ".repeat(100);
        let out = svc.summarize(&text, &opts(20)).await.unwrap();
        assert!(svc.count_tokens(&out) <= 20);
        assert_eq!(svc.summarize_calls(), 1);
    }

    #[tokio::test]
    async fn summarize_is_deterministic() {
        let svc = MockContentService::new();
        let a = svc.summarize("the same input", &opts(5)).await.unwrap();
        let b = svc.summarize("the same input", &opts(5)).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn injected_summarize_failure() {
        let svc = MockContentService::new();
        svc.fail_summarize_containing("BROKEN");
        assert_matches!(
            svc.summarize("a BROKEN file", &opts(10)).await,
            Err(UpstreamError::Failed { .. })
        );
        assert!(svc.summarize("fine", &opts(10)).await.is_ok());
        svc.clear_summarize_failures();
        assert!(svc.summarize("a BROKEN file", &opts(10)).await.is_ok());
    }

    #[tokio::test]
    async fn compress_hits_target_and_overshoots_when_asked() {
        let svc = MockContentService::new();
        let text = "word ".repeat(400);
        let out = svc
            .compress(&text, &CompressOptions::target_tokens(50))
            .await
            .unwrap();
        assert!(out.tokens_after <= 50);
        assert_eq!(out.tokens_before, 500);

        svc.set_compress_overshoot(2.0);
        let out = svc
            .compress(&text, &CompressOptions::target_tokens(50))
            .await
            .unwrap();
        assert!(out.tokens_after > 50);
    }

    #[tokio::test]
    async fn compress_by_ratio() {
        let svc = MockContentService::new();
        let text = "word ".repeat(400);
        let opts = CompressOptions {
            target: CompressionTarget::CompressionRatio(0.25),
            ..CompressOptions::target_tokens(0)
        };
        let out = svc.compress(&text, &opts).await.unwrap();
        assert!(out.tokens_after <= 125);
    }

    #[tokio::test]
    async fn unavailable_fails_calls() {
        let svc = MockContentService::new();
        svc.set_available(false);
        assert!(!svc.is_available());
        assert_matches!(
            svc.summarize("x", &opts(5)).await,
            Err(UpstreamError::Unavailable(_))
        );
    }

    #[tokio::test]
    async fn embeddings_are_optional() {
        let plain = MockContentService::new();
        assert!(!plain.supports_embedding());
        assert_matches!(
            plain.get_embedding("x").await,
            Err(UpstreamError::Unsupported(_))
        );

        let svc = MockContentService::with_embeddings();
        let a = svc.get_embedding("rust async runtime").await.unwrap();
        let b = svc.get_embedding("async runtime internals").await.unwrap();
        let c = svc.get_embedding("banana bread recipe").await.unwrap();
        assert_eq!(a.len(), MOCK_EMBEDDING_DIM);
        assert!(cosine_similarity(&a, &b) > cosine_similarity(&a, &c));
    }

    #[tokio::test(start_paused = true)]
    async fn delay_is_applied() {
        let svc = MockContentService::new();
        svc.set_delay(Some(Duration::from_secs(5)));
        let started = tokio::time::Instant::now();
        let _ = svc.summarize("x", &opts(5)).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(5));
    }
}
