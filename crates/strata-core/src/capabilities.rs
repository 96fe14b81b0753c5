//! Capabilities consumed by Strata components.
//!
//! Every component receives these as `Arc<dyn Trait>` through its
//! constructor; there is no ambient registry. Implementations may be real
//! clients or the in-memory/mock doubles in this crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, UpstreamError};
use crate::files::EnhancedFile;
use crate::ids::SummaryId;
use crate::options::{CompressOptions, CompressionOutput, SummarizeOptions};
use crate::summary::{Summary, SummaryLevel};

/// Filters applied to a vector search.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorFilters {
    /// Restrict to one project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    /// Restrict to these files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_names: Option<Vec<String>>,
}

impl VectorFilters {
    /// Filter to one project.
    pub fn project(project_name: impl Into<String>) -> Self {
        Self {
            project_name: Some(project_name.into()),
            file_names: None,
        }
    }
}

/// One vector search hit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorMatch {
    /// Project of the matched file.
    pub project_name: String,
    /// Matched file.
    pub file_name: String,
    /// Cosine similarity (higher = more similar).
    pub similarity: f32,
}

/// Similarity search over file embeddings.
#[async_trait]
pub trait VectorRepository: Send + Sync {
    /// Nearest files to `query`, most similar first.
    async fn search(
        &self,
        query: &[f32],
        filters: &VectorFilters,
        limit: usize,
    ) -> std::result::Result<Vec<VectorMatch>, UpstreamError>;

    /// Store or replace the embedding for `file`.
    async fn upsert(
        &self,
        file: &EnhancedFile,
        embedding: &[f32],
    ) -> std::result::Result<(), UpstreamError>;
}

/// Id-indexed arena of summaries, keyed by `(project, level, id)`.
#[async_trait]
pub trait SummaryRepository: Send + Sync {
    /// Fetch one summary.
    async fn get(
        &self,
        project_name: &str,
        level: SummaryLevel,
        id: &SummaryId,
    ) -> Result<Option<Summary>>;

    /// Insert or replace a summary.
    async fn put(&self, summary: Summary) -> Result<()>;

    /// Delete a summary; returns whether it existed.
    async fn delete(&self, project_name: &str, level: SummaryLevel, id: &SummaryId)
    -> Result<bool>;

    /// Summaries whose parent is `parent_id`, sorted by id.
    async fn list_children(&self, project_name: &str, parent_id: &SummaryId)
    -> Result<Vec<Summary>>;

    /// Every summary of a project at `level`, sorted by id.
    async fn list_level(&self, project_name: &str, level: SummaryLevel) -> Result<Vec<Summary>>;

    /// Delete every summary of a project; returns how many were removed.
    async fn delete_project(&self, project_name: &str) -> Result<usize>;
}

/// Summarization, compression, and token counting.
///
/// Embedding is an optional capability: check
/// [`supports_embedding`](Self::supports_embedding) before calling
/// [`get_embedding`](Self::get_embedding).
#[async_trait]
pub trait ContentService: Send + Sync {
    /// Summarize `content` within `opts.max_tokens`.
    async fn summarize(
        &self,
        content: &str,
        opts: &SummarizeOptions,
    ) -> std::result::Result<String, UpstreamError>;

    /// Shorten `content` toward `opts.target`.
    async fn compress(
        &self,
        content: &str,
        opts: &CompressOptions,
    ) -> std::result::Result<CompressionOutput, UpstreamError>;

    /// Tokens in `content` as the downstream model counts them.
    fn count_tokens(&self, content: &str) -> usize;

    /// Whether [`get_embedding`](Self::get_embedding) is offered.
    fn supports_embedding(&self) -> bool;

    /// Embed `text`.
    async fn get_embedding(&self, text: &str) -> std::result::Result<Vec<f32>, UpstreamError> {
        let _ = text;
        Err(UpstreamError::Unsupported("embedding".to_string()))
    }

    /// Whether the service currently accepts calls.
    fn is_available(&self) -> bool;
}

/// Read access to project files. Writing belongs to file storage.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Every file of a project, sorted by name.
    async fn list_files(&self, project_name: &str) -> Result<Vec<EnhancedFile>>;

    /// One file; [`StrataError::NotFound`](crate::StrataError::NotFound) when absent.
    async fn read_file(&self, project_name: &str, file_name: &str) -> Result<EnhancedFile>;
}
