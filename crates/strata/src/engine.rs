//! Component wiring.
//!
//! Every capability is injected explicitly; the engine holds no global
//! state and builds each component's config from the settings it is given.

use std::sync::Arc;

use strata_context::{CompileContextOptions, ContextCompiler, ContextConfig, recommend_budget};
use strata_core::in_memory::{InMemoryFileStore, InMemorySummaryRepository, InMemoryVectorRepository};
use strata_core::mock::MockContentService;
use strata_core::{
    ContentService, ContextBudget, ContextCompilation, FileStore, Result, SearchQuery,
    SearchResponse, SummaryHierarchy, SummaryRepository, VectorRepository,
};
use strata_hierarchy::{CompileOptions, HierarchyCompiler, HierarchyConfig, SummarySelection};
use strata_search::{Ranker, RankerConfig};
use strata_settings::StrataSettings;
use tracing::info;

/// Capabilities the engine consumes.
#[derive(Clone)]
pub struct StrataDeps {
    /// Project file storage (read-only here).
    pub files: Arc<dyn FileStore>,
    /// Embedding index used for semantic scores.
    pub vectors: Arc<dyn VectorRepository>,
    /// Summary arena owned by the hierarchy compiler.
    pub summaries: Arc<dyn SummaryRepository>,
    /// Summarization, compression, and token counting.
    pub content: Arc<dyn ContentService>,
}

/// Concrete handles to in-memory capabilities, for seeding and inspection.
#[derive(Clone, Default)]
pub struct InMemoryDeps {
    /// File store.
    pub files: Arc<InMemoryFileStore>,
    /// Vector index.
    pub vectors: Arc<InMemoryVectorRepository>,
    /// Summary arena.
    pub summaries: Arc<InMemorySummaryRepository>,
    /// Deterministic content service.
    pub content: Arc<MockContentService>,
}

impl InMemoryDeps {
    /// Fresh in-memory capabilities with a mock service that embeds.
    pub fn new() -> Self {
        Self {
            content: Arc::new(MockContentService::with_embeddings()),
            ..Self::default()
        }
    }

    /// Type-erased handles for [`StrataEngine::new`].
    pub fn to_deps(&self) -> StrataDeps {
        StrataDeps {
            files: self.files.clone(),
            vectors: self.vectors.clone(),
            summaries: self.summaries.clone(),
            content: self.content.clone(),
        }
    }
}

/// Entry point for every public operation.
pub struct StrataEngine {
    ranker: Arc<Ranker>,
    hierarchy: Arc<HierarchyCompiler>,
    context: ContextCompiler,
    settings: StrataSettings,
}

impl StrataEngine {
    /// Wire all components from `deps` and `settings`.
    pub fn new(deps: StrataDeps, settings: &StrataSettings) -> Self {
        let ranker = Arc::new(Ranker::new(
            deps.files.clone(),
            deps.vectors,
            deps.content.clone(),
            RankerConfig::from_settings(settings),
        ));
        let hierarchy = Arc::new(HierarchyCompiler::new(
            deps.files,
            deps.summaries,
            deps.content.clone(),
            HierarchyConfig::from_settings(settings),
        ));
        let context = ContextCompiler::new(
            ranker.clone(),
            hierarchy.clone(),
            deps.content,
            ContextConfig::from_settings(settings),
        );
        info!(version = %settings.version, "strata engine ready");
        Self {
            ranker,
            hierarchy,
            context,
            settings: settings.clone(),
        }
    }

    /// Engine over fresh in-memory capabilities, plus handles to them.
    pub fn in_memory(settings: &StrataSettings) -> (Self, InMemoryDeps) {
        let deps = InMemoryDeps::new();
        (Self::new(deps.to_deps(), settings), deps)
    }

    /// Settings the engine was built from.
    pub fn settings(&self) -> &StrataSettings {
        &self.settings
    }

    /// Rank a project's files.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        self.ranker.search(query).await
    }

    /// Build or refresh a project's summary tree.
    pub async fn compile_project(
        &self,
        project_name: &str,
        opts: &CompileOptions,
    ) -> Result<SummaryHierarchy> {
        self.hierarchy.compile_project(project_name, opts).await
    }

    /// Propagate file changes through the summary tree.
    pub async fn update_hierarchy(
        &self,
        project_name: &str,
        changed_files: &[String],
    ) -> Result<SummaryHierarchy> {
        self.hierarchy.update_hierarchy(project_name, changed_files).await
    }

    /// Current summary tree.
    pub async fn get_hierarchy(&self, project_name: &str) -> Result<SummaryHierarchy> {
        self.hierarchy.get_hierarchy(project_name).await
    }

    /// Coarsest summary level fitting `max_tokens`.
    pub async fn get_optimal_summary_level(
        &self,
        project_name: &str,
        max_tokens: usize,
    ) -> Result<SummarySelection> {
        self.hierarchy
            .get_optimal_summary_level(project_name, max_tokens)
            .await
    }

    /// Delete a project's summaries.
    pub async fn remove_project(&self, project_name: &str) -> Result<usize> {
        self.hierarchy.remove_project(project_name).await
    }

    /// Default budget for a query and context type name.
    pub fn recommend_budget(&self, query: &str, context_type: &str) -> ContextBudget {
        recommend_budget(query, context_type)
    }

    /// Compile a bounded context.
    pub async fn compile_context(
        &self,
        query: &str,
        budget: &ContextBudget,
        opts: &CompileContextOptions,
    ) -> Result<ContextCompilation> {
        self.context.compile_context(query, budget, opts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use strata_core::{EnhancedFile, SummaryLevel};

    fn settings(cap: usize) -> StrataSettings {
        let mut s = StrataSettings::default();
        s.hierarchy.max_tokens_per_summary = cap;
        s
    }

    #[tokio::test]
    async fn in_memory_engine_shares_its_handles() {
        let (engine, deps) = StrataEngine::in_memory(&settings(20));
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        deps.files
            .insert(EnhancedFile::new("p", "a.md", "word ".repeat(200), at));

        let tree = engine
            .compile_project("p", &CompileOptions::default())
            .await
            .unwrap();
        assert_eq!(tree.nodes.len(), 1);
        assert!(tree.level_tokens(SummaryLevel::Node) <= 20);
        assert_eq!(deps.content.summarize_calls(), 3);
        assert_eq!(deps.summaries.len(), 3);
    }

    #[test]
    fn settings_are_kept() {
        let (engine, _) = StrataEngine::in_memory(&settings(77));
        assert_eq!(engine.settings().hierarchy.max_tokens_per_summary, 77);
        assert_eq!(engine.recommend_budget("q", "qa").max_tokens, 2_000);
    }

    #[tokio::test]
    async fn removing_an_unknown_project_is_a_no_op() {
        let (engine, _) = StrataEngine::in_memory(&StrataSettings::default());
        assert_eq!(engine.remove_project("ghost").await.unwrap(), 0);
    }
}
