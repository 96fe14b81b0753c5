//! Grouping of node summaries into sections.
//!
//! A cluster key is derived from file metadata alone, so the grouping is
//! stable across runs and independent of ranking. Oversized clusters are
//! split into consecutive chunks in file-name order.

use std::collections::BTreeMap;

use strata_core::{EnhancedFile, SummaryId};
use strata_settings::ClusteringStrategy;

/// Key used when no metadata signal applies.
pub const DEFAULT_CLUSTER: &str = "general";

/// Cluster key for `file` under `strategy`.
pub fn cluster_key(file: &EnhancedFile, strategy: ClusteringStrategy) -> String {
    match strategy {
        ClusteringStrategy::Single => DEFAULT_CLUSTER.to_string(),
        ClusteringStrategy::Directory => directory_key(&file.name),
        ClusteringStrategy::Metadata => {
            if let Some(task) = file.metadata.task.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                return format!("task-{}", sanitize(task));
            }
            if let Some(tag) = file
                .metadata
                .tags
                .iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .min()
            {
                return format!("tag-{}", sanitize(tag));
            }
            directory_key(&file.name)
        }
    }
}

fn directory_key(file_name: &str) -> String {
    match file_name.split_once(['/', '\\']) {
        Some((dir, _)) if !dir.is_empty() => format!("dir-{}", sanitize(dir)),
        _ => DEFAULT_CLUSTER.to_string(),
    }
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c.to_ascii_lowercase() } else { '-' })
        .collect()
}

/// One planned section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SectionPlan {
    /// Section key (cluster key, with a chunk suffix when split).
    pub key: String,
    /// Section summary id.
    pub id: SummaryId,
    /// Node ids in this section, sorted.
    pub children: Vec<SummaryId>,
}

/// Plan sections for `members` (`file name → cluster key`).
///
/// Sections come back sorted by id; each holds at most `max_size` nodes.
pub fn plan_sections(
    project_name: &str,
    members: &BTreeMap<String, String>,
    max_size: usize,
) -> Vec<SectionPlan> {
    let max_size = max_size.max(1);
    let mut clusters: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (file_name, key) in members {
        clusters.entry(key.as_str()).or_default().push(file_name.as_str());
    }

    let mut plans = Vec::new();
    for (key, files) in clusters {
        let chunks: Vec<&[&str]> = files.chunks(max_size).collect();
        let split = chunks.len() > 1;
        for (i, chunk) in chunks.into_iter().enumerate() {
            let section_key = if split {
                format!("{key}-{}", i + 1)
            } else {
                key.to_string()
            };
            let mut children: Vec<SummaryId> = chunk
                .iter()
                .map(|f| SummaryId::node(project_name, f))
                .collect();
            children.sort();
            plans.push(SectionPlan {
                id: SummaryId::section(project_name, &section_key),
                key: section_key,
                children,
            });
        }
    }
    plans.sort_by(|a, b| a.id.cmp(&b.id));
    plans
}
