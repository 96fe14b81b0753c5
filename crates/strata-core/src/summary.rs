//! Summary tree types.
//!
//! Summaries live in an id-indexed arena (the summary repository). Parent and
//! child links are [`SummaryId`]s, never owning pointers, so the tree cannot
//! form an ownership cycle.
//!
//! Levels strictly increase along any parent chain:
//! `node` (one file) → `section` (one cluster) → `project` (root).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::files::hash_content;
use crate::ids::SummaryId;

/// Granularity of a summary.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLevel {
    /// One file.
    Node,
    /// A cluster of related nodes.
    Section,
    /// The whole project.
    Project,
}

impl SummaryLevel {
    /// All levels, finest first.
    pub const ALL: [Self; 3] = [Self::Node, Self::Section, Self::Project];

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Section => "section",
            Self::Project => "project",
        }
    }

    /// Level of this level's parent, `None` for the root.
    pub fn parent(self) -> Option<Self> {
        match self {
            Self::Node => Some(Self::Section),
            Self::Section => Some(Self::Project),
            Self::Project => None,
        }
    }
}

impl fmt::Display for SummaryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a summary was produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryType {
    /// Selected sentences from the source.
    #[default]
    Extractive,
    /// Rewritten in new words.
    Abstractive,
    /// Built from lower-level summaries.
    Hierarchical,
}

/// Compilation state of a summary.
///
/// `absent → pending → compiled → stale → pending → compiled`. Absent means
/// no record in the repository.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    /// Being (re)compiled.
    #[default]
    Pending,
    /// Up to date with its sources.
    Compiled,
    /// A source changed, or the last recompilation failed.
    Stale,
}

/// Bookkeeping for a summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryMetadata {
    /// Granularity.
    pub level: SummaryLevel,
    /// Production method.
    #[serde(rename = "type")]
    pub summary_type: SummaryType,
    /// Files covered, sorted.
    pub source_files: Vec<String>,
    /// Token count of `content`.
    pub tokens: usize,
    /// Token count of the summarized input.
    pub input_tokens: usize,
    /// `tokens / input_tokens`.
    pub compression_ratio: f64,
    /// First compilation time.
    pub created: DateTime<Utc>,
    /// Last write time.
    pub updated: DateTime<Utc>,
    /// Parent summary (weak reference).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_summary_id: Option<SummaryId>,
    /// Child summaries (weak references), sorted.
    #[serde(default)]
    pub child_summary_ids: Vec<SummaryId>,
    /// Compilation state.
    #[serde(default)]
    pub status: SummaryStatus,
    /// Hash of every input at compile time, keyed by file name (nodes) or
    /// child id (sections, project).
    #[serde(default)]
    pub source_hashes: BTreeMap<String, String>,
    /// Cluster a node was assigned to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_key: Option<String>,
}

/// A summary at any level of the hierarchy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Arena id.
    pub id: SummaryId,
    /// Owning project.
    pub project_name: String,
    /// Summary text.
    pub content: String,
    /// Bookkeeping.
    pub metadata: SummaryMetadata,
    /// Embedding of `content`, when computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Summary {
    /// Granularity.
    pub fn level(&self) -> SummaryLevel {
        self.metadata.level
    }

    /// Token count.
    pub fn tokens(&self) -> usize {
        self.metadata.tokens
    }

    /// Whether the summary needs recompilation.
    pub fn is_stale(&self) -> bool {
        self.metadata.status == SummaryStatus::Stale
    }

    /// Hash of `content`, recorded by parents as their source hash.
    pub fn content_hash(&self) -> String {
        hash_content(&self.content)
    }
}

/// Informational marker that part of a hierarchy is out of date.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaleHierarchyWarning {
    /// Summary that could not be refreshed.
    pub summary_id: SummaryId,
    /// Source file involved, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    /// Why it is stale.
    pub reason: String,
}

/// Per-project view of the summary tree.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryHierarchy {
    /// Owning project.
    pub project_name: String,
    /// Root summary (level = project).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_summary: Option<Summary>,
    /// Section summaries, sorted by id.
    pub sections: Vec<Summary>,
    /// Node summaries, sorted by id.
    pub nodes: Vec<Summary>,
    /// Tokens across every summary in the tree.
    pub total_tokens: usize,
    /// Root tokens over the node-level input tokens.
    pub compression_ratio: f64,
    /// Most recent write to any summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    /// Whether any summary is stale.
    pub stale: bool,
    /// Details for each stale summary.
    #[serde(default)]
    pub warnings: Vec<StaleHierarchyWarning>,
}

impl SummaryHierarchy {
    /// Assemble the view from every summary stored for a project.
    ///
    /// Summaries whose `project_name` differs are ignored. Stale summaries
    /// mark the hierarchy stale and contribute a warning.
    pub fn assemble(project_name: &str, summaries: Vec<Summary>) -> Self {
        let mut root_summary = None;
        let mut sections = Vec::new();
        let mut nodes = Vec::new();

        for summary in summaries {
            if summary.project_name != project_name {
                continue;
            }
            match summary.level() {
                SummaryLevel::Project => root_summary = Some(summary),
                SummaryLevel::Section => sections.push(summary),
                SummaryLevel::Node => nodes.push(summary),
            }
        }
        sections.sort_by(|a, b| a.id.cmp(&b.id));
        nodes.sort_by(|a, b| a.id.cmp(&b.id));

        let all = || root_summary.iter().chain(sections.iter()).chain(nodes.iter());

        let total_tokens = all().map(Summary::tokens).sum();
        let last_updated = all().map(|s| s.metadata.updated).max();
        let warnings: Vec<StaleHierarchyWarning> = all()
            .filter(|s| s.is_stale())
            .map(|s| StaleHierarchyWarning {
                summary_id: s.id.clone(),
                source_file: (s.level() == SummaryLevel::Node)
                    .then(|| s.metadata.source_files.first().cloned())
                    .flatten(),
                reason: "summary is out of date with its sources".to_string(),
            })
            .collect();

        let input_tokens: usize = nodes.iter().map(|n| n.metadata.input_tokens).sum();
        let compression_ratio = match (&root_summary, input_tokens) {
            #[allow(clippy::cast_precision_loss)]
            (Some(root), n) if n > 0 => root.tokens() as f64 / n as f64,
            _ => 1.0,
        };

        Self {
            project_name: project_name.to_string(),
            root_summary,
            sections,
            nodes,
            total_tokens,
            compression_ratio,
            last_updated,
            stale: !warnings.is_empty(),
            warnings,
        }
    }

    /// Whether the project has no summaries at all.
    pub fn is_empty(&self) -> bool {
        self.root_summary.is_none() && self.sections.is_empty() && self.nodes.is_empty()
    }

    /// Summaries at `level`.
    pub fn summaries_at(&self, level: SummaryLevel) -> Vec<&Summary> {
        match level {
            SummaryLevel::Project => self.root_summary.iter().collect(),
            SummaryLevel::Section => self.sections.iter().collect(),
            SummaryLevel::Node => self.nodes.iter().collect(),
        }
    }

    /// Total tokens of the summaries at `level`.
    pub fn level_tokens(&self, level: SummaryLevel) -> usize {
        self.summaries_at(level).iter().map(|s| s.tokens()).sum()
    }

    /// Find a summary by id at any level.
    pub fn find(&self, id: &SummaryId) -> Option<&Summary> {
        self.root_summary
            .iter()
            .chain(self.sections.iter())
            .chain(self.nodes.iter())
            .find(|s| &s.id == id)
    }

    /// Mark summaries whose source files changed after compilation.
    ///
    /// `current_hash` returns the present hash of a file, or `None` when the
    /// file is gone. A changed node makes every ancestor stale too. Nodes
    /// already stale keep the warning they carry. Returns how many summaries
    /// were marked.
    pub fn mark_changed_sources<F>(&mut self, current_hash: F) -> usize
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut flagged: BTreeMap<SummaryId, (String, &'static str)> = BTreeMap::new();
        for node in self.nodes.iter().filter(|n| !n.is_stale()) {
            let Some(file) = node.metadata.source_files.first() else {
                continue;
            };
            let Some(recorded) = node.metadata.source_hashes.get(file) else {
                continue;
            };
            let reason = match current_hash(file) {
                None => "source file no longer exists",
                Some(hash) if &hash != recorded => {
                    "source file changed since the summary was compiled"
                }
                Some(_) => continue,
            };
            let _ = flagged.insert(node.id.clone(), (file.clone(), reason));

            let mut parent = node.metadata.parent_summary_id.clone();
            while let Some(id) = parent {
                if flagged.contains_key(&id) {
                    break;
                }
                let Some(summary) = self.find(&id) else {
                    break;
                };
                parent = summary.metadata.parent_summary_id.clone();
                let _ = flagged.insert(id, (file.clone(), "a summary below it is out of date"));
            }
        }

        let mut marked = 0;
        let all = self
            .root_summary
            .iter_mut()
            .chain(self.sections.iter_mut())
            .chain(self.nodes.iter_mut());
        for summary in all {
            let Some((file, reason)) = flagged.get(&summary.id) else {
                continue;
            };
            if summary.is_stale() {
                continue;
            }
            summary.metadata.status = SummaryStatus::Stale;
            self.warnings.push(StaleHierarchyWarning {
                summary_id: summary.id.clone(),
                source_file: Some(file.clone()),
                reason: (*reason).to_string(),
            });
            marked += 1;
        }
        self.stale = !self.warnings.is_empty();
        marked
    }

    /// Check the tree invariants.
    ///
    /// - the root is the only summary without a parent
    /// - every parent is exactly one level above its child
    /// - each parent's `child_summary_ids` equals the set of summaries
    ///   pointing at it (no orphans, no dangling ids, no duplicates)
    pub fn validate_links(&self) -> Result<(), String> {
        let Some(root) = &self.root_summary else {
            if self.sections.is_empty() && self.nodes.is_empty() {
                return Ok(());
            }
            return Err("summaries exist without a project root".to_string());
        };
        if root.level() != SummaryLevel::Project {
            return Err(format!("root {} is not project level", root.id));
        }
        if root.metadata.parent_summary_id.is_some() {
            return Err(format!("root {} has a parent", root.id));
        }

        let parents: BTreeMap<&SummaryId, &Summary> = std::iter::once(root)
            .chain(self.sections.iter())
            .map(|s| (&s.id, s))
            .collect();

        let mut expected_children: BTreeMap<&SummaryId, BTreeSet<&SummaryId>> =
            parents.keys().map(|id| (*id, BTreeSet::new())).collect();

        for child in self.sections.iter().chain(self.nodes.iter()) {
            let parent_id = child
                .metadata
                .parent_summary_id
                .as_ref()
                .ok_or_else(|| format!("{} has no parent", child.id))?;
            let parent = parents
                .get(parent_id)
                .ok_or_else(|| format!("{} points at missing parent {parent_id}", child.id))?;
            if child.level().parent() != Some(parent.level()) {
                return Err(format!(
                    "{} ({}) cannot be a child of {} ({})",
                    child.id,
                    child.level(),
                    parent.id,
                    parent.level()
                ));
            }
            let _ = expected_children
                .entry(parent_id)
                .or_default()
                .insert(&child.id);
        }

        for (parent_id, parent) in &parents {
            let listed = &parent.metadata.child_summary_ids;
            let listed_set: BTreeSet<&SummaryId> = listed.iter().collect();
            if listed_set.len() != listed.len() {
                return Err(format!("{parent_id} lists duplicate children"));
            }
            let expected = expected_children.get(parent_id).cloned().unwrap_or_default();
            if listed_set != expected {
                return Err(format!(
                    "{parent_id} lists {} children but {} point at it",
                    listed_set.len(),
                    expected.len()
                ));
            }
        }
        Ok(())
    }
}
