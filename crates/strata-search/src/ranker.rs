//! Ranker: scores every file of a project against a query.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use strata_core::validation::validate_project_name;
use strata_core::vector::cosine_similarity;
use strata_core::{
    ContentService, EnhancedFile, FileStore, Result, ScoreBreakdown, SearchQuery, SearchResponse,
    SearchResult, StrataError, VectorFilters, VectorRepository, with_deadline,
};
use tracing::{debug, instrument, warn};

use crate::config::RankerConfig;
use crate::scoring::{self, RankKey};

/// Multi-factor scorer over a project's files.
///
/// The ranker never mutates files; access counts and timestamps are read
/// from metadata as stored.
pub struct Ranker {
    files: Arc<dyn FileStore>,
    vectors: Arc<dyn VectorRepository>,
    content: Arc<dyn ContentService>,
    config: RankerConfig,
}

/// Semantic signal for one query, resolved once per search.
struct SemanticSource {
    query_embedding: Option<Vec<f32>>,
    similarities: HashMap<String, f32>,
}

impl Ranker {
    /// Create a ranker over injected capabilities.
    pub fn new(
        files: Arc<dyn FileStore>,
        vectors: Arc<dyn VectorRepository>,
        content: Arc<dyn ContentService>,
        config: RankerConfig,
    ) -> Self {
        Self {
            files,
            vectors,
            content,
            config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &RankerConfig {
        &self.config
    }

    /// Rank every file of `query.project_name`.
    ///
    /// Upstream failures (embedding, vector search) degrade semantic scoring
    /// to the neutral value; only validation and file listing errors
    /// propagate.
    #[instrument(skip_all, fields(project = %query.project_name))]
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        validate_project_name(&query.project_name)?;
        let weights = match query.weights {
            Some(w) => {
                w.validate()?;
                w.normalized()
            }
            None => self.config.weights.normalized(),
        };
        let half_life = query.time_decay_days.unwrap_or(self.config.time_decay_days);
        if !half_life.is_finite() || half_life <= 0.0 {
            return Err(StrataError::validation(format!(
                "timeDecayDays must be positive, got {half_life}"
            )));
        }

        let files = self
            .files
            .list_files(&query.project_name)
            .await
            .map_err(|e| e.with_context(format!("project {}", query.project_name)))?;
        let total_candidates = files.len();

        let semantic = self.semantic_source(query, total_candidates).await;
        let now = query.reference_time.unwrap_or_else(Utc::now);
        let max_frequency = files
            .iter()
            .filter_map(|f| f.metadata.frequency)
            .max()
            .unwrap_or(0);

        let mut degraded = false;
        let mut results: Vec<SearchResult> = files
            .into_iter()
            .map(|file| {
                let (semantic_score, semantic_degraded) = self.semantic_score(&file, &semantic);
                degraded |= semantic_degraded;
                let meta = &file.metadata;
                let mut scores = ScoreBreakdown {
                    semantic: semantic_score,
                    recency: scoring::recency(meta.updated, now, self.config.recency_window_days),
                    frequency: scoring::frequency(meta.frequency.unwrap_or(0), max_frequency),
                    salience: scoring::salience(meta.salience, self.config.neutral_salience),
                    time_decay: scoring::time_decay(
                        meta.last_accessed.unwrap_or(meta.updated),
                        now,
                        half_life,
                    ),
                    combined: 0.0,
                };
                scores.combined = scoring::combine(&weights, &scores);
                SearchResult {
                    file,
                    scores,
                    semantic_degraded,
                }
            })
            .collect();

        results.sort_by(|a, b| rank_key(a).cmp_rank(&rank_key(b)));
        if let Some(limit) = query.limit.or(self.config.default_limit) {
            results.truncate(limit);
        }

        debug!(
            candidates = total_candidates,
            returned = results.len(),
            degraded,
            "ranked project files"
        );
        Ok(SearchResponse {
            results,
            total_candidates,
            degraded,
            weights,
        })
    }

    /// Embed the query and fetch repository similarities. Every failure here
    /// is soft and leaves the corresponding field empty.
    async fn semantic_source(&self, query: &SearchQuery, candidates: usize) -> SemanticSource {
        let mut source = SemanticSource {
            query_embedding: None,
            similarities: HashMap::new(),
        };
        if candidates == 0 || query.query.trim().is_empty() {
            return source;
        }
        if !self.content.supports_embedding() || !self.content.is_available() {
            debug!("content service cannot embed, semantic scores will be neutral");
            return source;
        }

        let embedding = match with_deadline(
            "embedding",
            self.config.call_timeout,
            self.content.get_embedding(&query.query),
        )
        .await
        {
            Ok(v) if !v.is_empty() => v,
            Ok(_) => {
                warn!("empty query embedding, semantic scores will be neutral");
                return source;
            }
            Err(error) => {
                warn!(%error, "query embedding failed, semantic scores will be neutral");
                return source;
            }
        };

        match with_deadline(
            "vector search",
            self.config.call_timeout,
            self.vectors.search(
                &embedding,
                &VectorFilters::project(&query.project_name),
                candidates,
            ),
        )
        .await
        {
            Ok(matches) => {
                source.similarities = matches
                    .into_iter()
                    .filter(|m| m.project_name == query.project_name)
                    .map(|m| (m.file_name, m.similarity))
                    .collect();
            }
            Err(error) => {
                warn!(%error, "vector search failed, falling back to stored embeddings");
            }
        }
        source.query_embedding = Some(embedding);
        source
    }

    /// Semantic score for one file and whether it is the neutral fallback.
    fn semantic_score(&self, file: &EnhancedFile, source: &SemanticSource) -> (f64, bool) {
        if let Some(similarity) = source.similarities.get(&file.name) {
            return (scoring::semantic(f64::from(*similarity)), false);
        }
        if let (Some(query), Some(embedding)) = (&source.query_embedding, &file.embedding) {
            if query.len() == embedding.len() {
                return (
                    scoring::semantic(f64::from(cosine_similarity(query, embedding))),
                    false,
                );
            }
        }
        (self.config.neutral_semantic.clamp(0.0, 1.0), true)
    }
}

fn rank_key(result: &SearchResult) -> RankKey<'_> {
    RankKey {
        combined: result.scores.combined,
        updated: result.file.metadata.updated,
        name: &result.file.name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{DateTime, Duration, TimeZone};
    use strata_core::RankingWeights;
    use strata_core::in_memory::{InMemoryFileStore, InMemoryVectorRepository};
    use strata_core::mock::MockContentService;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    struct Fixture {
        files: Arc<InMemoryFileStore>,
        vectors: Arc<InMemoryVectorRepository>,
        content: Arc<MockContentService>,
    }

    impl Fixture {
        fn new(content: MockContentService) -> Self {
            Self {
                files: Arc::new(InMemoryFileStore::new()),
                vectors: Arc::new(InMemoryVectorRepository::new()),
                content: Arc::new(content),
            }
        }

        fn ranker(&self) -> Ranker {
            Ranker::new(
                self.files.clone(),
                self.vectors.clone(),
                self.content.clone(),
                RankerConfig::default(),
            )
        }

        async fn add(&self, file: EnhancedFile) {
            if self.content.supports_embedding() {
                let embedding = MockContentService::embed_text(&file.content);
                self.vectors.upsert(&file, &embedding).await.unwrap();
            }
            self.files.insert(file);
        }
    }

    fn file(name: &str, content: &str, age_days: i64) -> EnhancedFile {
        EnhancedFile::new("proj", name, content, now() - Duration::days(age_days))
    }

    fn query(text: &str) -> SearchQuery {
        SearchQuery::new("proj", text).at(now())
    }

    #[tokio::test]
    async fn semantic_match_ranks_first() {
        let fx = Fixture::new(MockContentService::with_embeddings());
        fx.add(file("rust.md", "tokio async runtime scheduler", 10)).await;
        fx.add(file("bread.md", "banana bread recipe oven", 10)).await;

        let response = fx.ranker().search(&query("async runtime")).await.unwrap();
        assert!(!response.degraded);
        assert_eq!(response.total_candidates, 2);
        assert_eq!(response.results[0].file.name, "rust.md");
        assert!(response.results[0].scores.semantic > response.results[1].scores.semantic);
    }

    #[tokio::test]
    async fn scores_are_normalized() {
        let fx = Fixture::new(MockContentService::with_embeddings());
        fx.add(file("a.md", "alpha", 0).with_frequency(100).with_salience(3.0)).await;
        fx.add(file("b.md", "beta", 500).with_frequency(1)).await;

        let response = fx.ranker().search(&query("alpha")).await.unwrap();
        for r in &response.results {
            let s = r.scores;
            for v in [s.semantic, s.recency, s.frequency, s.salience, s.time_decay, s.combined] {
                assert!((0.0..=1.0).contains(&v), "{v} out of range for {}", r.file.name);
            }
        }
        assert!((response.weights.total() - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn no_embedding_capability_is_degraded_not_error() {
        let fx = Fixture::new(MockContentService::new());
        fx.add(file("a.md", "alpha", 1)).await;
        fx.add(file("b.md", "beta", 2)).await;

        let response = fx.ranker().search(&query("alpha")).await.unwrap();
        assert!(response.degraded);
        for r in &response.results {
            assert!(r.semantic_degraded);
            assert!((r.scores.semantic - 0.5).abs() < 1e-9);
        }
        assert_eq!(response.results[0].file.name, "a.md");
    }

    #[tokio::test]
    async fn vector_outage_falls_back_to_stored_embeddings() {
        let fx = Fixture::new(MockContentService::with_embeddings());
        fx.files.insert(
            file("a.md", "alpha beta", 1)
                .with_embedding(MockContentService::embed_text("alpha beta")),
        );
        fx.files.insert(file("b.md", "gamma", 1));
        fx.vectors.set_available(false);

        let response = fx.ranker().search(&query("alpha beta")).await.unwrap();
        let a = response.results.iter().find(|r| r.file.name == "a.md").unwrap();
        let b = response.results.iter().find(|r| r.file.name == "b.md").unwrap();
        assert!(!a.semantic_degraded);
        assert!((a.scores.semantic - 1.0).abs() < 1e-5);
        assert!(b.semantic_degraded);
        assert!(response.degraded);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_embedding_times_out_softly() {
        let content = MockContentService::with_embeddings();
        content.set_delay(Some(std::time::Duration::from_secs(120)));
        let fx = Fixture::new(content);
        fx.files.insert(file("a.md", "alpha", 1));

        let response = fx.ranker().search(&query("alpha")).await.unwrap();
        assert!(response.degraded);
        assert_eq!(response.results.len(), 1);
    }

    #[tokio::test]
    async fn ties_break_by_updated_then_name() {
        let fx = Fixture::new(MockContentService::new());
        let weights = RankingWeights {
            semantic: 1.0,
            recency: 0.0,
            frequency: 0.0,
            salience: 0.0,
            time_decay: 0.0,
        };
        fx.add(file("c.md", "x", 5)).await;
        fx.add(file("b.md", "x", 1)).await;
        fx.add(file("a.md", "x", 5)).await;

        let q = query("x").with_weights(weights);
        let response = fx.ranker().search(&q).await.unwrap();
        let names: Vec<_> = response.results.iter().map(|r| r.file.name.as_str()).collect();
        assert_eq!(names, vec!["b.md", "a.md", "c.md"]);
    }

    #[tokio::test]
    async fn limit_truncates_after_sorting() {
        let fx = Fixture::new(MockContentService::new());
        for (i, name) in ["a.md", "b.md", "c.md", "d.md"].iter().enumerate() {
            fx.add(file(name, "x", i64::try_from(i).unwrap() * 10)).await;
        }
        let response = fx.ranker().search(&query("x").with_limit(2)).await.unwrap();
        let names: Vec<_> = response.results.iter().map(|r| r.file.name.as_str()).collect();
        assert_eq!(names, vec!["a.md", "b.md"]);
        assert_eq!(response.total_candidates, 4);
    }

    #[tokio::test]
    async fn unknown_project_is_not_found() {
        let fx = Fixture::new(MockContentService::new());
        assert_matches!(
            fx.ranker().search(&query("x")).await,
            Err(StrataError::NotFound { kind: "project", .. })
        );
    }

    #[tokio::test]
    async fn invalid_inputs_are_rejected_before_io() {
        let fx = Fixture::new(MockContentService::new());
        let bad_project = SearchQuery::new("a/b", "x");
        assert_matches!(fx.ranker().search(&bad_project).await, Err(StrataError::Validation(_)));

        let bad_weights = query("x").with_weights(RankingWeights {
            semantic: -1.0,
            ..RankingWeights::default()
        });
        assert_matches!(fx.ranker().search(&bad_weights).await, Err(StrataError::Validation(_)));

        let bad_decay = query("x").with_time_decay_days(0.0);
        assert_matches!(fx.ranker().search(&bad_decay).await, Err(StrataError::Validation(_)));
    }

    #[tokio::test]
    async fn empty_project_yields_empty_response() {
        let fx = Fixture::new(MockContentService::with_embeddings());
        fx.files.create_project("proj");
        let response = fx.ranker().search(&query("anything")).await.unwrap();
        assert!(response.results.is_empty());
        assert_eq!(response.total_candidates, 0);
        assert_eq!(fx.content.embed_calls(), 0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn rank(files: &[(i64, u64, f64)]) -> SearchResponse {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async {
                let fx = Fixture::new(MockContentService::new());
                fx.files.create_project("proj");
                for (i, (age, freq, sal)) in files.iter().enumerate() {
                    fx.add(
                        file(&format!("f{:02}.md", i % 7), "x", *age)
                            .with_frequency(*freq)
                            .with_salience(*sal),
                    )
                    .await;
                }
                fx.ranker().search(&query("x")).await.unwrap()
            })
        }

        proptest! {
            #[test]
            fn results_sorted_and_deterministic(
                files in proptest::collection::vec((0i64..200, 0u64..50, 0.0f64..1.0), 0..20),
            ) {
                let first = rank(&files);
                let second = rank(&files);
                prop_assert_eq!(&first, &second);
                for pair in first.results.windows(2) {
                    let ord = rank_key(&pair[0]).cmp_rank(&rank_key(&pair[1]));
                    prop_assert_ne!(ord, std::cmp::Ordering::Greater);
                }
            }
        }
    }
}
