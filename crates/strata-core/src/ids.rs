//! Summary identifiers.
//!
//! Summary ids are derived from what a summary covers rather than generated
//! randomly: recompiling the same file or cluster always writes to the same
//! id, which keeps `update_hierarchy` idempotent and the arena free of
//! duplicates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a [`Summary`](crate::summary::Summary) in the summary arena.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SummaryId(String);

impl SummaryId {
    /// Id of the node summary for one file.
    #[must_use]
    pub fn node(project_name: &str, file_name: &str) -> Self {
        Self(format!("node:{project_name}:{file_name}"))
    }

    /// Id of the section summary for one cluster.
    #[must_use]
    pub fn section(project_name: &str, cluster_key: &str) -> Self {
        Self(format!("section:{project_name}:{cluster_key}"))
    }

    /// Id of the project (root) summary.
    #[must_use]
    pub fn project(project_name: &str) -> Self {
        Self(format!("project:{project_name}"))
    }

    /// Create from an existing string value.
    #[must_use]
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    /// Return the inner string as a slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for SummaryId {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SummaryId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SummaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SummaryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SummaryId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}
