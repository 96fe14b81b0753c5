//! Project files as seen by the ranking and summarization layers.
//!
//! Files are owned by external file storage; Strata only reads them. The
//! content hash drives staleness detection in the summary hierarchy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `content`.
pub fn hash_content(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

/// Ranking-relevant metadata attached to a file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// Last modification time.
    pub updated: DateTime<Utc>,
    /// Task the file belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    /// Stored importance in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salience: Option<f64>,
    /// Access count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u64>,
    /// Last access time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<DateTime<Utc>>,
}

impl FileMetadata {
    /// Metadata for a file created and last updated at `at`.
    #[must_use]
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            tags: Vec::new(),
            created: at,
            updated: at,
            task: None,
            salience: None,
            frequency: None,
            last_accessed: None,
        }
    }
}

/// A project file with ranking metadata and an optional embedding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedFile {
    /// File name, unique within the project.
    pub name: String,
    /// Owning project.
    pub project_name: String,
    /// Raw content.
    pub content: String,
    /// Ranking metadata.
    pub metadata: FileMetadata,
    /// Embedding of the content, when one has been computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Hash of the content as recorded by file storage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl EnhancedFile {
    /// Create a file with default metadata stamped at `at`.
    pub fn new(
        project_name: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            project_name: project_name.into(),
            content: content.into(),
            metadata: FileMetadata::new(at),
            embedding: None,
            content_hash: None,
        }
    }

    /// Set tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the owning task.
    #[must_use]
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.metadata.task = Some(task.into());
        self
    }

    /// Set stored salience.
    #[must_use]
    pub fn with_salience(mut self, salience: f64) -> Self {
        self.metadata.salience = Some(salience);
        self
    }

    /// Set access frequency.
    #[must_use]
    pub fn with_frequency(mut self, frequency: u64) -> Self {
        self.metadata.frequency = Some(frequency);
        self
    }

    /// Set the last-updated time.
    #[must_use]
    pub fn updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.metadata.updated = at;
        self
    }

    /// Set the last-accessed time.
    #[must_use]
    pub fn accessed_at(mut self, at: DateTime<Utc>) -> Self {
        self.metadata.last_accessed = Some(at);
        self
    }

    /// Attach an embedding.
    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Hash used for staleness detection.
    ///
    /// Prefers the hash recorded by storage and falls back to hashing the
    /// content.
    pub fn effective_hash(&self) -> String {
        self.content_hash
            .clone()
            .unwrap_or_else(|| hash_content(&self.content))
    }

    /// `project/name`, used in log fields and error context.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.project_name, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn hash_is_stable_sha256() {
        assert_eq!(
            hash_content(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(hash_content("abc"), hash_content("abc"));
        assert_ne!(hash_content("abc"), hash_content("abd"));
    }

    #[test]
    fn effective_hash_prefers_stored() {
        let mut file = EnhancedFile::new("p", "a.md", "hello", at());
        assert_eq!(file.effective_hash(), hash_content("hello"));
        file.content_hash = Some("stored".into());
        assert_eq!(file.effective_hash(), "stored");
    }

    #[test]
    fn builders_set_metadata() {
        let file = EnhancedFile::new("p", "a.md", "x", at())
            .with_tags(["docs", "api"])
            .with_task("release")
            .with_salience(0.9)
            .with_frequency(7);
        assert_eq!(file.metadata.tags, vec!["docs", "api"]);
        assert_eq!(file.metadata.task.as_deref(), Some("release"));
        assert_eq!(file.metadata.salience, Some(0.9));
        assert_eq!(file.metadata.frequency, Some(7));
        assert_eq!(file.qualified_name(), "p/a.md");
    }

    #[test]
    fn serde_camel_case() {
        let file = EnhancedFile::new("p", "a.md", "x", at()).accessed_at(at());
        let value = serde_json::to_value(&file).unwrap();
        assert!(value.get("projectName").is_some());
        assert!(value["metadata"].get("lastAccessed").is_some());
        assert!(value.get("embedding").is_none());
    }
}
