//! End-to-end behavior of the wired engine over in-memory capabilities.

use assert_matches::assert_matches;
use chrono::{DateTime, TimeZone, Utc};
use strata::{
    CompileContextOptions, CompileOptions, ContextBudget, EnhancedFile, InMemoryDeps, ItemSource,
    SearchQuery, StrataEngine, StrataError, StrataSettings, SummaryLevel, load_settings_from_path,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
}

/// Roughly `tokens` tokens of distinct words starting with `seed`.
fn text(seed: &str, tokens: usize) -> String {
    let mut out = String::new();
    let mut i = 0;
    while out.len() < tokens * 4 {
        out.push_str(&format!("{seed}{i} "));
        i += 1;
    }
    out.truncate(tokens * 4);
    out
}

fn capped(cap: usize) -> StrataSettings {
    let mut settings = StrataSettings::default();
    settings.hierarchy.max_tokens_per_summary = cap;
    settings
}

/// `a.md` (500), `b.md` (300), `docs/c.md` (200) under project `p`.
fn seeded(settings: &StrataSettings) -> (StrataEngine, InMemoryDeps) {
    let (engine, deps) = StrataEngine::in_memory(settings);
    for (name, seed, tokens, salience) in [
        ("a.md", "alpha", 500, 0.9),
        ("b.md", "beta", 300, 0.5),
        ("docs/c.md", "gamma", 200, 0.1),
    ] {
        deps.files
            .insert(EnhancedFile::new("p", name, text(seed, tokens), now()).with_salience(salience));
    }
    (engine, deps)
}

#[tokio::test]
async fn every_summary_respects_the_cap() {
    let (engine, _) = seeded(&capped(100));
    let tree = engine
        .compile_project("p", &CompileOptions::default())
        .await
        .unwrap();

    assert_eq!(tree.nodes.len(), 3);
    assert!(!tree.sections.is_empty());
    let root = tree.root_summary.as_ref().unwrap();
    assert!(root.tokens() <= 100);
    for summary in tree.sections.iter().chain(tree.nodes.iter()) {
        assert!(summary.tokens() <= 100, "{} has {} tokens", summary.id, summary.tokens());
    }
    assert!(tree.validate_links().is_ok());
    assert!(!tree.stale);
}

#[tokio::test]
async fn small_budget_returns_the_project_summary() {
    let (engine, _) = seeded(&capped(100));
    let _ = engine
        .compile_project("p", &CompileOptions::default())
        .await
        .unwrap();

    let context = engine
        .compile_context(
            "overview",
            &ContextBudget::new(250),
            &CompileContextOptions::for_project("p"),
        )
        .await
        .unwrap();
    assert_eq!(context.items.len(), 1);
    assert_matches!(
        context.items[0].source,
        ItemSource::Summary { level: SummaryLevel::Project, .. }
    );
    assert!(context.used_tokens <= 100);
    assert!(!context.incomplete);
    assert!(context.items.iter().all(|i| !i.compressed));
}

#[tokio::test]
async fn edited_file_is_reported_stale_until_updated() {
    let (engine, deps) = seeded(&capped(100));
    let _ = engine
        .compile_project("p", &CompileOptions::default())
        .await
        .unwrap();
    deps.files
        .insert(EnhancedFile::new("p", "b.md", text("omega", 300), now()).with_salience(0.5));

    let tree = engine.get_hierarchy("p").await.unwrap();
    assert!(tree.stale);
    assert!(tree
        .warnings
        .iter()
        .any(|w| w.source_file.as_deref() == Some("b.md")));

    let tree = engine
        .update_hierarchy("p", &["b.md".to_string()])
        .await
        .unwrap();
    assert!(!tree.stale);
}

#[tokio::test]
async fn oversized_file_is_compressed_into_the_budget() {
    let (engine, deps) = StrataEngine::in_memory(&StrataSettings::default());
    deps.files
        .insert(EnhancedFile::new("q", "big.md", text("delta", 200), now()));

    let opts = CompileContextOptions {
        include_summaries: false,
        reference_time: Some(now()),
        ..CompileContextOptions::for_project("q")
    };
    let context = engine
        .compile_context("delta", &ContextBudget::new(50), &opts)
        .await
        .unwrap();

    assert_eq!(context.items.len(), 1);
    let item = &context.items[0];
    assert!(item.compressed);
    assert_eq!(item.original_tokens, 200);
    assert!(item.tokens <= 50);
    assert!(item.tokens >= 32);
    assert!(context.used_tokens <= 50);
    assert_eq!(deps.content.compress_calls(), 1);
}

#[tokio::test]
async fn used_tokens_stay_within_every_budget() {
    let (engine, _) = seeded(&capped(100));
    let _ = engine
        .compile_project("p", &CompileOptions::default())
        .await
        .unwrap();

    for max in [40, 90, 150, 333, 640, 999, 1_200, 5_000] {
        let context = engine
            .compile_context(
                "alpha beta",
                &ContextBudget::new(max),
                &CompileContextOptions::for_project("p"),
            )
            .await
            .unwrap();
        assert!(context.used_tokens <= usize::try_from(max).unwrap());
        assert_eq!(
            context.used_tokens,
            context.items.iter().map(|i| i.tokens).sum::<usize>()
        );
    }
}

#[tokio::test]
async fn repeated_update_changes_nothing() {
    let (engine, deps) = seeded(&capped(100));
    let first = engine
        .compile_project("p", &CompileOptions::default())
        .await
        .unwrap();
    let calls = deps.content.summarize_calls();

    let changed = vec!["a.md".to_string()];
    let second = engine.update_hierarchy("p", &changed).await.unwrap();
    let third = engine.update_hierarchy("p", &changed).await.unwrap();

    assert_eq!(deps.content.summarize_calls(), calls);
    assert_eq!(first.root_summary, second.root_summary);
    assert_eq!(second, third);
}

#[tokio::test]
async fn ranking_is_deterministic() {
    let (engine, _) = seeded(&StrataSettings::default());
    let query = SearchQuery::new("p", "alpha").at(now());

    let first = engine.search(&query).await.unwrap();
    let second = engine.search(&query).await.unwrap();
    let names = |r: &strata::SearchResponse| {
        r.results.iter().map(|x| x.file.name.clone()).collect::<Vec<_>>()
    };
    assert_eq!(names(&first), names(&second));
    assert_eq!(names(&first), vec!["a.md", "b.md", "docs/c.md"]);
    assert!(first
        .results
        .iter()
        .all(|r| (0.0..=1.0).contains(&r.scores.combined)));
}

#[tokio::test]
async fn optimal_level_follows_the_budget() {
    let (engine, _) = seeded(&capped(100));
    let tree = engine
        .compile_project("p", &CompileOptions::default())
        .await
        .unwrap();

    let roomy = engine.get_optimal_summary_level("p", 10_000).await.unwrap();
    assert_eq!(roomy.level, Some(SummaryLevel::Project));

    let root_tokens = tree.level_tokens(SummaryLevel::Project);
    let tight = engine
        .get_optimal_summary_level("p", root_tokens - 1)
        .await
        .unwrap();
    assert_ne!(tight.level, Some(SummaryLevel::Project));
    assert!(tight.total_tokens < root_tokens);
}

#[tokio::test]
async fn unknown_project_is_not_found() {
    let (engine, _) = StrataEngine::in_memory(&StrataSettings::default());
    let err = engine
        .search(&SearchQuery::new("nowhere", "q"))
        .await
        .unwrap_err();
    assert_matches!(err, StrataError::NotFound { .. });

    let err = engine.get_hierarchy("nowhere").await.unwrap_err();
    assert_matches!(err, StrataError::NotFound { .. });
}

#[tokio::test]
async fn settings_file_configures_the_engine() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let json = serde_json::json!({
        "hierarchy": { "maxTokensPerSummary": 40, "clustering": "single" },
        "context": { "minChunkTokens": 16 }
    });
    std::fs::write(&path, json.to_string()).unwrap();

    let settings = load_settings_from_path(&path).unwrap();
    assert_eq!(settings.hierarchy.max_tokens_per_summary, 40);
    assert_eq!(settings.context.min_chunk_tokens, 16);
    assert!((settings.ranking.weights.semantic - 0.40).abs() < 1e-9);

    let (engine, _) = seeded(&settings);
    let tree = engine
        .compile_project("p", &CompileOptions::default())
        .await
        .unwrap();
    assert_eq!(tree.sections.len(), 1);
    assert!(tree.nodes.iter().all(|n| n.tokens() <= 40));
}
