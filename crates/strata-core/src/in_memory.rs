//! In-memory capability implementations.
//!
//! Suitable for tests, local tooling, and as the default wiring when no
//! persistent store is configured. All state is guarded by
//! [`parking_lot::RwLock`]; no lock is held across an `.await`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::capabilities::{FileStore, SummaryRepository, VectorFilters, VectorMatch, VectorRepository};
use crate::errors::{Result, StrataError, UpstreamError};
use crate::files::EnhancedFile;
use crate::ids::SummaryId;
use crate::summary::{Summary, SummaryLevel};
use crate::vector::cosine_similarity;

// ─────────────────────────────────────────────────────────────────────────────
// File store
// ─────────────────────────────────────────────────────────────────────────────

/// File store backed by nested sorted maps (`project → name → file`).
#[derive(Debug, Default)]
pub struct InMemoryFileStore {
    projects: RwLock<BTreeMap<String, BTreeMap<String, EnhancedFile>>>,
}

impl InMemoryFileStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a file, creating its project on first use.
    pub fn insert(&self, file: EnhancedFile) {
        let _ = self
            .projects
            .write()
            .entry(file.project_name.clone())
            .or_default()
            .insert(file.name.clone(), file);
    }

    /// Remove a file, returning it when present.
    pub fn remove(&self, project_name: &str, file_name: &str) -> Option<EnhancedFile> {
        self.projects
            .write()
            .get_mut(project_name)
            .and_then(|files| files.remove(file_name))
    }

    /// Create an empty project.
    pub fn create_project(&self, project_name: &str) {
        let _ = self
            .projects
            .write()
            .entry(project_name.to_string())
            .or_default();
    }
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn list_files(&self, project_name: &str) -> Result<Vec<EnhancedFile>> {
        self.projects
            .read()
            .get(project_name)
            .map(|files| files.values().cloned().collect())
            .ok_or_else(|| StrataError::not_found("project", project_name))
    }

    async fn read_file(&self, project_name: &str, file_name: &str) -> Result<EnhancedFile> {
        let projects = self.projects.read();
        let files = projects
            .get(project_name)
            .ok_or_else(|| StrataError::not_found("project", project_name))?;
        files
            .get(file_name)
            .cloned()
            .ok_or_else(|| StrataError::not_found("file", format!("{project_name}/{file_name}")))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Vector repository
// ─────────────────────────────────────────────────────────────────────────────

/// Vector repository with brute-force cosine KNN.
#[derive(Debug)]
pub struct InMemoryVectorRepository {
    vectors: RwLock<BTreeMap<(String, String), Vec<f32>>>,
    available: AtomicBool,
    search_calls: AtomicUsize,
}

impl Default for InMemoryVectorRepository {
    fn default() -> Self {
        Self {
            vectors: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
            search_calls: AtomicUsize::new(0),
        }
    }
}

impl InMemoryVectorRepository {
    /// Empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every call fails with `Unavailable` while false.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of stored vectors.
    pub fn count(&self) -> usize {
        self.vectors.read().len()
    }

    /// Number of `search` calls served.
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> std::result::Result<(), UpstreamError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(UpstreamError::Unavailable("vector repository".to_string()))
        }
    }

    fn rank_results(rows: Vec<(String, String, f32)>, limit: usize) -> Vec<VectorMatch> {
        let mut results: Vec<VectorMatch> = rows
            .into_iter()
            .map(|(project_name, file_name, similarity)| VectorMatch {
                project_name,
                file_name,
                similarity,
            })
            .collect();
        results.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.file_name.cmp(&b.file_name))
        });
        results.truncate(limit);
        results
    }
}

#[async_trait]
impl VectorRepository for InMemoryVectorRepository {
    async fn search(
        &self,
        query: &[f32],
        filters: &VectorFilters,
        limit: usize,
    ) -> std::result::Result<Vec<VectorMatch>, UpstreamError> {
        self.check_available()?;
        let _ = self.search_calls.fetch_add(1, Ordering::SeqCst);
        let limit = if limit == 0 { 10 } else { limit };

        let rows: Vec<(String, String, f32)> = self
            .vectors
            .read()
            .iter()
            .filter(|((project, _), _)| {
                filters.project_name.as_ref().is_none_or(|p| p == project)
            })
            .filter(|((_, name), _)| {
                filters
                    .file_names
                    .as_ref()
                    .is_none_or(|names| names.iter().any(|n| n == name))
            })
            .filter(|(_, embedding)| embedding.len() == query.len())
            .map(|((project, name), embedding)| {
                (project.clone(), name.clone(), cosine_similarity(query, embedding))
            })
            .collect();

        Ok(Self::rank_results(rows, limit))
    }

    async fn upsert(
        &self,
        file: &EnhancedFile,
        embedding: &[f32],
    ) -> std::result::Result<(), UpstreamError> {
        self.check_available()?;
        if embedding.is_empty() {
            return Err(UpstreamError::failed("upsert", "empty embedding"));
        }
        let _ = self.vectors.write().insert(
            (file.project_name.clone(), file.name.clone()),
            embedding.to_vec(),
        );
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Summary repository
// ─────────────────────────────────────────────────────────────────────────────

type SummaryKey = (String, SummaryLevel, SummaryId);

/// Summary arena keyed by `(project, level, id)`.
#[derive(Debug, Default)]
pub struct InMemorySummaryRepository {
    summaries: RwLock<BTreeMap<SummaryKey, Summary>>,
    writes: AtomicUsize,
}

impl InMemorySummaryRepository {
    /// Empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `put` calls served (for idempotency checks).
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of stored summaries across all projects.
    pub fn len(&self) -> usize {
        self.summaries.read().len()
    }

    /// Whether no summaries are stored.
    pub fn is_empty(&self) -> bool {
        self.summaries.read().is_empty()
    }

    fn key(project_name: &str, level: SummaryLevel, id: &SummaryId) -> SummaryKey {
        (project_name.to_string(), level, id.clone())
    }
}

#[async_trait]
impl SummaryRepository for InMemorySummaryRepository {
    async fn get(
        &self,
        project_name: &str,
        level: SummaryLevel,
        id: &SummaryId,
    ) -> Result<Option<Summary>> {
        Ok(self
            .summaries
            .read()
            .get(&Self::key(project_name, level, id))
            .cloned())
    }

    async fn put(&self, summary: Summary) -> Result<()> {
        let key = Self::key(&summary.project_name, summary.level(), &summary.id);
        let _ = self.summaries.write().insert(key, summary);
        let _ = self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(
        &self,
        project_name: &str,
        level: SummaryLevel,
        id: &SummaryId,
    ) -> Result<bool> {
        Ok(self
            .summaries
            .write()
            .remove(&Self::key(project_name, level, id))
            .is_some())
    }

    async fn list_children(
        &self,
        project_name: &str,
        parent_id: &SummaryId,
    ) -> Result<Vec<Summary>> {
        Ok(self
            .summaries
            .read()
            .values()
            .filter(|s| {
                s.project_name == project_name
                    && s.metadata.parent_summary_id.as_ref() == Some(parent_id)
            })
            .cloned()
            .collect())
    }

    async fn list_level(&self, project_name: &str, level: SummaryLevel) -> Result<Vec<Summary>> {
        Ok(self
            .summaries
            .read()
            .iter()
            .filter(|((project, lvl, _), _)| project == project_name && *lvl == level)
            .map(|(_, s)| s.clone())
            .collect())
    }

    async fn delete_project(&self, project_name: &str) -> Result<usize> {
        let mut summaries = self.summaries.write();
        let before = summaries.len();
        summaries.retain(|(project, _, _), _| project != project_name);
        Ok(before - summaries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{SummaryMetadata, SummaryStatus, SummaryType};
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    fn file(project: &str, name: &str) -> EnhancedFile {
        EnhancedFile::new(
            project,
            name,
            format!("content of {name}"),
            Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
        )
    }

    fn summary(project: &str, id: SummaryId, level: SummaryLevel, parent: Option<SummaryId>) -> Summary {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        Summary {
            id,
            project_name: project.into(),
            content: "s".into(),
            metadata: SummaryMetadata {
                level,
                summary_type: SummaryType::Extractive,
                source_files: vec![],
                tokens: 1,
                input_tokens: 1,
                compression_ratio: 1.0,
                created: at,
                updated: at,
                parent_summary_id: parent,
                child_summary_ids: vec![],
                status: SummaryStatus::Compiled,
                source_hashes: BTreeMap::new(),
                cluster_key: None,
            },
            embedding: None,
        }
    }

    #[tokio::test]
    async fn file_store_lists_sorted_and_reports_missing() {
        let store = InMemoryFileStore::new();
        store.insert(file("p", "b.md"));
        store.insert(file("p", "a.md"));
        let files = store.list_files("p").await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.md", "b.md"]);

        assert_matches!(store.list_files("q").await, Err(StrataError::NotFound { kind: "project", .. }));
        assert_matches!(store.read_file("p", "c.md").await, Err(StrataError::NotFound { kind: "file", .. }));
        assert!(store.remove("p", "a.md").is_some());
        assert_eq!(store.list_files("p").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_project_lists_nothing() {
        let store = InMemoryFileStore::new();
        store.create_project("p");
        assert!(store.list_files("p").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn vector_search_ranks_and_filters() {
        let repo = InMemoryVectorRepository::new();
        repo.upsert(&file("p", "x"), &[1.0, 0.0]).await.unwrap();
        repo.upsert(&file("p", "y"), &[0.7, 0.7]).await.unwrap();
        repo.upsert(&file("q", "z"), &[1.0, 0.0]).await.unwrap();
        repo.upsert(&file("p", "bad-dims"), &[1.0, 0.0, 0.0]).await.unwrap();

        let results = repo
            .search(&[1.0, 0.0], &VectorFilters::project("p"), 10)
            .await
            .unwrap();
        let names: Vec<_> = results.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["x", "y"]);
        assert!(results[0].similarity > results[1].similarity);
        assert_eq!(repo.search_calls(), 1);
    }

    #[tokio::test]
    async fn vector_outage_is_upstream_error() {
        let repo = InMemoryVectorRepository::new();
        repo.set_available(false);
        let err = repo
            .search(&[1.0], &VectorFilters::default(), 5)
            .await
            .unwrap_err();
        assert_matches!(err, UpstreamError::Unavailable(_));
    }

    #[tokio::test]
    async fn summary_repo_crud_and_children() {
        let repo = InMemorySummaryRepository::new();
        let root = SummaryId::project("p");
        let sec = SummaryId::section("p", "docs");
        repo.put(summary("p", root.clone(), SummaryLevel::Project, None)).await.unwrap();
        repo.put(summary("p", sec.clone(), SummaryLevel::Section, Some(root.clone()))).await.unwrap();
        repo.put(summary("q", SummaryId::project("q"), SummaryLevel::Project, None)).await.unwrap();

        let got = repo.get("p", SummaryLevel::Section, &sec).await.unwrap();
        assert!(got.is_some());
        assert!(repo.get("p", SummaryLevel::Node, &sec).await.unwrap().is_none());

        let children = repo.list_children("p", &root).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, sec);

        assert_eq!(repo.list_level("p", SummaryLevel::Project).await.unwrap().len(), 1);
        assert!(repo.delete("p", SummaryLevel::Section, &sec).await.unwrap());
        assert!(!repo.delete("p", SummaryLevel::Section, &sec).await.unwrap());

        assert_eq!(repo.delete_project("p").await.unwrap(), 1);
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.write_count(), 3);
    }
}
