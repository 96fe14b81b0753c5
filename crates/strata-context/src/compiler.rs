//! Context compiler: ranked files + hierarchy summaries → bounded context.
//!
//! ## Algorithm
//!
//! 1. Rank the project's files and pick summaries (explicit levels, or the
//!    coarsest level fitting the summary allocation), concurrently.
//! 2. Merge into one candidate list. A file and its own node summary are
//!    never both kept: the raw file wins when files are requested and it
//!    fits the file allocation, otherwise the summary does.
//! 3. Stable sort by combined score, then most recent update, then name.
//! 4. Fill greedily while at least `min_chunk_tokens` remain. A candidate
//!    larger than what remains is compressed to the remaining budget;
//!    output slightly over target is trimmed locally, anything else is
//!    skipped with a reason. A raw file that does not fit and is covered by
//!    a summary still in play (kept, or not yet reached) is a duplicate of
//!    that summary and is not compressed.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strata_core::tokens::truncate_with;
use strata_core::validation::validate_project_name;
use strata_core::{
    CompressOptions, CompressionMethod, ContentService, ContextBudget, ContextCompilation,
    ContextItem, ItemSource, RankingWeights, Result, SearchQuery, SearchResponse, SkipReason,
    SkippedCandidate, StaleHierarchyWarning, StrataError, Summary, SummaryLevel, with_deadline,
};
use strata_hierarchy::HierarchyCompiler;
use strata_search::{RankKey, Ranker};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::config::ContextConfig;

/// Options for [`ContextCompiler::compile_context`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileContextOptions {
    /// Project to draw from.
    pub project_name: String,
    /// Offer raw files as candidates.
    pub include_files: bool,
    /// Offer hierarchy summaries as candidates.
    pub include_summaries: bool,
    /// Summary levels to offer; empty picks the coarsest level that fits.
    pub summary_levels: Vec<SummaryLevel>,
    /// Fail with [`StrataError::BudgetExceeded`] instead of returning an
    /// empty result when the budget is below the minimum chunk.
    pub require_non_empty: bool,
    /// Ranking weights; ranker defaults when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<RankingWeights>,
    /// Ranked files considered; configured default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Instant ranking ages are measured from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_time: Option<DateTime<Utc>>,
    /// Terms compression must keep.
    pub preserve_keywords: Vec<String>,
    /// Compression method; configured default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_method: Option<CompressionMethod>,
}

impl Default for CompileContextOptions {
    fn default() -> Self {
        Self {
            project_name: String::new(),
            include_files: true,
            include_summaries: true,
            summary_levels: Vec::new(),
            require_non_empty: false,
            weights: None,
            limit: None,
            reference_time: None,
            preserve_keywords: Vec::new(),
            compression_method: None,
        }
    }
}

impl CompileContextOptions {
    /// Defaults for `project_name`.
    pub fn for_project(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            ..Self::default()
        }
    }
}

/// One merged candidate.
#[derive(Clone, Debug)]
struct Candidate {
    source: ItemSource,
    content: String,
    tokens: usize,
    score: f64,
    updated: DateTime<Utc>,
    /// Files a summary candidate covers; empty for raw files.
    covers: Vec<String>,
}

impl Candidate {
    fn rank_key(&self) -> RankKey<'_> {
        RankKey {
            combined: self.score,
            updated: self.updated,
            name: self.source.label(),
        }
    }

    fn skipped(&self, reason: SkipReason) -> SkippedCandidate {
        SkippedCandidate {
            source: self.source.clone(),
            tokens: self.tokens,
            reason,
        }
    }
}

/// Summaries offered to the merge, with the warnings of stale ones.
#[derive(Default)]
struct SummaryPick {
    summaries: Vec<Summary>,
    warnings: Vec<StaleHierarchyWarning>,
}

/// Assembles budget-bounded contexts.
pub struct ContextCompiler {
    ranker: Arc<Ranker>,
    hierarchy: Arc<HierarchyCompiler>,
    content: Arc<dyn ContentService>,
    config: ContextConfig,
}

impl ContextCompiler {
    /// Create a compiler over shared components.
    pub fn new(
        ranker: Arc<Ranker>,
        hierarchy: Arc<HierarchyCompiler>,
        content: Arc<dyn ContentService>,
        config: ContextConfig,
    ) -> Self {
        Self {
            ranker,
            hierarchy,
            content,
            config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Compile a context for `query` within `budget`.
    ///
    /// Validation errors (empty query, bad project name, non-positive
    /// budget) are raised before any I/O. Compression failures skip the
    /// candidate and mark the result incomplete.
    pub async fn compile_context(
        &self,
        query: &str,
        budget: &ContextBudget,
        opts: &CompileContextOptions,
    ) -> Result<ContextCompilation> {
        let max_tokens = budget.validated_max()?;
        if query.trim().is_empty() {
            return Err(StrataError::validation("query is empty"));
        }
        validate_project_name(&opts.project_name)?;

        let compilation_id = Uuid::now_v7();
        let span = info_span!(
            "compile_context",
            %compilation_id,
            project = %opts.project_name,
            max_tokens,
        );
        self.compile_inner(compilation_id, query, budget, max_tokens, opts)
            .instrument(span)
            .await
    }

    async fn compile_inner(
        &self,
        compilation_id: Uuid,
        query: &str,
        budget: &ContextBudget,
        max_tokens: usize,
        opts: &CompileContextOptions,
    ) -> Result<ContextCompilation> {
        let min_chunk = self.config.min_chunk_tokens;
        if max_tokens < min_chunk {
            if opts.require_non_empty {
                return Err(StrataError::BudgetExceeded {
                    max_tokens,
                    min_chunk_tokens: min_chunk,
                });
            }
            debug!(min_chunk, "budget below minimum chunk, returning empty context");
            return Ok(ContextCompilation::empty(compilation_id, query, max_tokens));
        }

        let search = SearchQuery {
            project_name: opts.project_name.clone(),
            query: query.to_string(),
            weights: opts.weights,
            limit: None,
            time_decay_days: None,
            reference_time: opts.reference_time,
        };
        let (ranked, picked) = tokio::join!(
            self.ranker.search(&search),
            self.pick_summaries(&opts.project_name, budget.summary_allocation(max_tokens), opts)
        );
        let ranked = ranked?;
        let picked = picked?;

        let mut skipped = Vec::new();
        let candidates = self.merge(
            &ranked,
            picked.summaries,
            budget.file_allocation(max_tokens),
            opts,
            &mut skipped,
        );

        // summaries in play per covered file
        let mut coverage: HashMap<String, usize> = HashMap::new();
        for name in candidates.iter().flat_map(|c| c.covers.iter()) {
            *coverage.entry(name.clone()).or_default() += 1;
        }

        let mut items = Vec::new();
        let mut remaining = max_tokens;
        for candidate in candidates {
            if remaining < min_chunk {
                skipped.push(candidate.skipped(SkipReason::BudgetExhausted));
                continue;
            }
            if candidate.tokens > remaining {
                if let ItemSource::File { name } = &candidate.source {
                    if coverage.get(name).is_some_and(|n| *n > 0) {
                        debug!(file = %name, "file covered by a summary, not compressing");
                        skipped.push(candidate.skipped(SkipReason::Duplicate));
                        continue;
                    }
                }
            }
            if candidate.tokens <= remaining {
                remaining -= candidate.tokens;
                items.push(ContextItem {
                    source: candidate.source,
                    tokens: candidate.tokens,
                    original_tokens: candidate.tokens,
                    content: candidate.content,
                    score: candidate.score,
                    compressed: false,
                });
                continue;
            }
            match self.compress_to_fit(&candidate, remaining, opts).await {
                Ok(item) => {
                    remaining -= item.tokens;
                    items.push(item);
                }
                Err(reason) => {
                    warn!(candidate = %candidate.source, %reason, "skipping candidate");
                    for name in &candidate.covers {
                        if let Some(n) = coverage.get_mut(name) {
                            *n = n.saturating_sub(1);
                        }
                    }
                    skipped.push(candidate.skipped(reason));
                }
            }
        }

        let used_tokens = max_tokens - remaining;
        let original: usize = items.iter().map(|i| i.original_tokens).sum();
        #[allow(clippy::cast_precision_loss)]
        let compression_ratio = if original == 0 {
            1.0
        } else {
            used_tokens as f64 / original as f64
        };
        let incomplete = items.is_empty()
            || skipped.iter().any(|s| s.reason != SkipReason::Duplicate);

        info!(
            items = items.len(),
            used_tokens,
            skipped = skipped.len(),
            incomplete,
            degraded = ranked.degraded,
            "context compiled"
        );
        Ok(ContextCompilation {
            compilation_id,
            query: query.to_string(),
            items,
            used_tokens,
            total_tokens: max_tokens,
            compression_ratio,
            skipped,
            incomplete,
            degraded: ranked.degraded,
            warnings: picked.warnings,
        })
    }

    async fn pick_summaries(
        &self,
        project_name: &str,
        allocation: usize,
        opts: &CompileContextOptions,
    ) -> Result<SummaryPick> {
        if !opts.include_summaries {
            return Ok(SummaryPick::default());
        }

        if opts.summary_levels.is_empty() {
            if allocation == 0 {
                return Ok(SummaryPick::default());
            }
            let selection = self
                .hierarchy
                .get_optimal_summary_level(project_name, allocation)
                .await?;
            let warnings = selection
                .summaries
                .iter()
                .filter(|s| s.is_stale())
                .map(|s| StaleHierarchyWarning {
                    summary_id: s.id.clone(),
                    source_file: (s.level() == SummaryLevel::Node)
                        .then(|| s.metadata.source_files.first().cloned())
                        .flatten(),
                    reason: "summary is out of date with its sources".to_string(),
                })
                .collect();
            return Ok(SummaryPick {
                summaries: selection.summaries,
                warnings,
            });
        }

        let hierarchy = match self.hierarchy.get_hierarchy(project_name).await {
            Ok(h) => h,
            Err(StrataError::NotFound { .. }) => return Ok(SummaryPick::default()),
            Err(e) => return Err(e),
        };
        let mut summaries = Vec::new();
        for level in &opts.summary_levels {
            summaries.extend(hierarchy.summaries_at(*level).into_iter().cloned());
        }
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries.dedup_by(|a, b| a.id == b.id);
        let warnings = hierarchy
            .warnings
            .into_iter()
            .filter(|w| summaries.iter().any(|s| s.id == w.summary_id))
            .collect();
        Ok(SummaryPick {
            summaries,
            warnings,
        })
    }

    /// Merge, deduplicate, and sort candidates.
    fn merge(
        &self,
        ranked: &SearchResponse,
        summaries: Vec<Summary>,
        file_allocation: usize,
        opts: &CompileContextOptions,
        skipped: &mut Vec<SkippedCandidate>,
    ) -> Vec<Candidate> {
        let scores: HashMap<&str, f64> = ranked
            .results
            .iter()
            .map(|r| (r.file.name.as_str(), r.scores.combined))
            .collect();

        let limit = opts.limit.or(self.config.candidate_limit).unwrap_or(usize::MAX);
        let mut files: BTreeMap<String, Candidate> = BTreeMap::new();
        if opts.include_files {
            for result in ranked.results.iter().take(limit) {
                if result.file.content.trim().is_empty() {
                    continue;
                }
                let _ = files.insert(
                    result.file.name.clone(),
                    Candidate {
                        source: ItemSource::File {
                            name: result.file.name.clone(),
                        },
                        tokens: self.content.count_tokens(&result.file.content),
                        content: result.file.content.clone(),
                        score: result.scores.combined,
                        updated: result.file.metadata.updated,
                        covers: Vec::new(),
                    },
                );
            }
        }

        let mut candidates = Vec::new();
        for summary in summaries {
            if summary.content.trim().is_empty() {
                continue;
            }
            let score = summary
                .metadata
                .source_files
                .iter()
                .filter_map(|f| scores.get(f.as_str()).copied())
                .fold(0.0_f64, f64::max);
            let candidate = Candidate {
                source: ItemSource::Summary {
                    id: summary.id.clone(),
                    level: summary.level(),
                },
                tokens: summary.tokens(),
                score,
                updated: summary.metadata.updated,
                covers: summary.metadata.source_files.clone(),
                content: summary.content,
            };

            let own_file = match summary.metadata.level {
                SummaryLevel::Node => summary.metadata.source_files.first(),
                _ => None,
            };
            let own_file_tokens = own_file.and_then(|name| files.get(name)).map(|f| f.tokens);
            if let Some(file_tokens) = own_file_tokens {
                if file_tokens <= file_allocation {
                    skipped.push(candidate.skipped(SkipReason::Duplicate));
                    continue;
                }
                if let Some(file) = own_file.and_then(|name| files.remove(name)) {
                    skipped.push(file.skipped(SkipReason::Duplicate));
                }
            }
            candidates.push(candidate);
        }
        candidates.extend(files.into_values());
        candidates.sort_by(|a, b| a.rank_key().cmp_rank(&b.rank_key()));
        candidates
    }

    /// Compress `candidate` to at most `target` tokens.
    async fn compress_to_fit(
        &self,
        candidate: &Candidate,
        target: usize,
        opts: &CompileContextOptions,
    ) -> std::result::Result<ContextItem, SkipReason> {
        if !self.content.is_available() {
            return Err(SkipReason::ServiceUnavailable);
        }
        let compress = CompressOptions::target_tokens(target)
            .with_method(opts.compression_method.unwrap_or(self.config.compression_method))
            .with_keywords(opts.preserve_keywords.clone());

        let output = with_deadline(
            "compress",
            self.config.call_timeout,
            self.content.compress(&candidate.content, &compress),
        )
        .await
        .map_err(|e| SkipReason::CompressionFailed {
            message: e.to_string(),
        })?;

        let count = |s: &str| self.content.count_tokens(s);
        let achieved = count(&output.compressed_text);
        if achieved > self.config.tolerated(target) {
            return Err(SkipReason::CompressionInsufficient { achieved, target });
        }
        let content = if achieved > target {
            truncate_with(&output.compressed_text, target, count)
        } else {
            output.compressed_text
        };
        let tokens = count(&content);
        let minimum = self.config.compression_floor(target);
        if tokens < minimum {
            return Err(SkipReason::CompressionTooSmall {
                achieved: tokens,
                minimum,
            });
        }

        debug!(
            candidate = %candidate.source,
            before = candidate.tokens,
            after = tokens,
            target,
            "compressed candidate"
        );
        Ok(ContextItem {
            source: candidate.source.clone(),
            content,
            tokens,
            original_tokens: candidate.tokens,
            score: candidate.score,
            compressed: true,
        })
    }
}
