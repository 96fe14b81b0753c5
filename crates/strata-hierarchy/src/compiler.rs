//! Hierarchy compiler: node → section → project summaries.
//!
//! Every pass runs under the project's write lock and follows the same
//! steps:
//!
//! 1. Refresh node summaries for the files in scope. A node is recompiled
//!    only when its file hash changed, it is not `compiled`, or the caller
//!    forces it.
//! 2. Re-plan sections from the nodes' cluster keys and recompile each
//!    section whose children's content hashes changed.
//! 3. Recompile the project summary when the section set changed, or (for
//!    incremental updates) when weighted section churn exceeds the
//!    threshold.
//! 4. Write only summaries that differ from what is stored and delete
//!    summaries with no remaining sources.
//!
//! Summarization failures keep the previous summary marked `stale`, or store
//! a local extractive fallback when there is none.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use strata_core::tokens::truncate_with;
use strata_core::validation::{validate_file_name, validate_project_name};
use strata_core::{
    ContentService, EnhancedFile, FileStore, Result, StaleHierarchyWarning, StrataError, Summary,
    SummarizeOptions, SummaryHierarchy, SummaryId, SummaryLevel, SummaryMetadata,
    SummaryRepository, SummaryStatus, SummaryStyle, SummaryType, UpstreamError, with_deadline,
};
use tracing::{debug, info, instrument, warn};

use crate::churn::weighted_churn;
use crate::clustering::{SectionPlan, cluster_key, plan_sections};
use crate::config::HierarchyConfig;
use crate::locks::ProjectLocks;
use crate::selection::{SummarySelection, select_optimal};

/// Options for [`HierarchyCompiler::compile_project`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Node summary method; the configured default when unset.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub summary_type: Option<SummaryType>,
    /// Per-summary token cap; the configured default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens_per_summary: Option<usize>,
    /// Output layout requested from the content service.
    pub style: SummaryStyle,
    /// Topics the content service should emphasize.
    pub focus_areas: Vec<String>,
    /// Ignore cached compiled state and resummarize everything.
    pub force_recompile: bool,
}

/// Which files a pass looks at.
enum Scope {
    /// Every file of the project; nodes without a file are removed.
    All,
    /// Only these files; missing ones are removed.
    Files(BTreeSet<String>),
}

impl Scope {
    fn is_incremental(&self) -> bool {
        matches!(self, Self::Files(_))
    }
}

/// Immutable parameters shared by the concurrent summarize calls of a pass.
struct PassParams<'a> {
    project_name: &'a str,
    node_type: SummaryType,
    cap: usize,
    style: SummaryStyle,
    focus_areas: &'a [String],
    force: bool,
    now: DateTime<Utc>,
}

/// Result of (re)building one summary.
struct Built {
    summary: Summary,
    warning: Option<StaleHierarchyWarning>,
}

/// Builds and maintains per-project summary trees.
pub struct HierarchyCompiler {
    files: Arc<dyn FileStore>,
    summaries: Arc<dyn SummaryRepository>,
    content: Arc<dyn ContentService>,
    config: HierarchyConfig,
    locks: ProjectLocks,
}

impl HierarchyCompiler {
    /// Create a compiler over injected capabilities.
    pub fn new(
        files: Arc<dyn FileStore>,
        summaries: Arc<dyn SummaryRepository>,
        content: Arc<dyn ContentService>,
        config: HierarchyConfig,
    ) -> Self {
        Self {
            files,
            summaries,
            content,
            config,
            locks: ProjectLocks::new(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    /// Compile the whole tree for a project.
    ///
    /// Cached compiled summaries whose sources are unchanged are reused
    /// unless `opts.force_recompile` is set.
    #[instrument(skip_all, fields(project = %project_name))]
    pub async fn compile_project(
        &self,
        project_name: &str,
        opts: &CompileOptions,
    ) -> Result<SummaryHierarchy> {
        validate_project_name(project_name)?;
        let _guard = self.locks.acquire(project_name).await;
        self.run_pass(project_name, opts, Scope::All).await
    }

    /// Recompile the nodes for `changed_files` and propagate upward.
    ///
    /// Falls back to a full compile when the project has no tree yet. A
    /// failed node keeps its previous summary and flags the result stale;
    /// upstream failures never fail the call.
    #[instrument(skip_all, fields(project = %project_name, changed = changed_files.len()))]
    pub async fn update_hierarchy(
        &self,
        project_name: &str,
        changed_files: &[String],
    ) -> Result<SummaryHierarchy> {
        validate_project_name(project_name)?;
        for name in changed_files {
            validate_file_name(name)?;
        }
        let _guard = self.locks.acquire(project_name).await;

        let root = self
            .summaries
            .get(project_name, SummaryLevel::Project, &SummaryId::project(project_name))
            .await?;
        if root.is_none() {
            debug!("no project summary yet, compiling from scratch");
            return self
                .run_pass(project_name, &CompileOptions::default(), Scope::All)
                .await;
        }
        if changed_files.is_empty() {
            return self.load_checked(project_name).await;
        }

        let scope = Scope::Files(changed_files.iter().cloned().collect());
        self.run_pass(project_name, &CompileOptions::default(), scope).await
    }

    /// Current tree for a project; [`StrataError::NotFound`] when none exists.
    ///
    /// Summaries whose files changed since they were compiled come back
    /// stale with a warning until the next update.
    pub async fn get_hierarchy(&self, project_name: &str) -> Result<SummaryHierarchy> {
        validate_project_name(project_name)?;
        let hierarchy = self.load_checked(project_name).await?;
        if hierarchy.is_empty() {
            return Err(StrataError::not_found("hierarchy", project_name));
        }
        Ok(hierarchy)
    }

    /// Coarsest level of the stored tree that fits in `max_tokens`.
    ///
    /// A project without a tree yields an empty selection.
    pub async fn get_optimal_summary_level(
        &self,
        project_name: &str,
        max_tokens: usize,
    ) -> Result<SummarySelection> {
        validate_project_name(project_name)?;
        if max_tokens == 0 {
            return Err(StrataError::validation("maxTokens must be positive"));
        }
        let hierarchy = self.load_checked(project_name).await?;
        Ok(select_optimal(&hierarchy, max_tokens))
    }

    /// Delete every summary of a project. Returns how many were removed.
    pub async fn remove_project(&self, project_name: &str) -> Result<usize> {
        validate_project_name(project_name)?;
        let removed = {
            let _guard = self.locks.acquire(project_name).await;
            self.summaries
                .delete_project(project_name)
                .await
                .map_err(|e| e.with_context(format!("project {project_name}")))?
        };
        let _ = self.locks.forget(project_name);
        info!(project = project_name, removed, "removed project hierarchy");
        Ok(removed)
    }

    async fn load_hierarchy(&self, project_name: &str) -> Result<SummaryHierarchy> {
        let mut all = Vec::new();
        for level in SummaryLevel::ALL {
            all.extend(self.summaries.list_level(project_name, level).await?);
        }
        Ok(SummaryHierarchy::assemble(project_name, all))
    }

    /// Stored tree with nodes whose file changed since compilation (and
    /// their ancestors) marked stale.
    async fn load_checked(&self, project_name: &str) -> Result<SummaryHierarchy> {
        let mut hierarchy = self.load_hierarchy(project_name).await?;
        if hierarchy.is_empty() {
            return Ok(hierarchy);
        }
        let current: BTreeMap<String, String> = match self.files.list_files(project_name).await {
            Ok(files) => files
                .into_iter()
                .map(|f| {
                    let hash = f.effective_hash();
                    (f.name, hash)
                })
                .collect(),
            Err(StrataError::NotFound { .. }) => BTreeMap::new(),
            Err(error) => {
                warn!(project = project_name, %error, "cannot list files, staleness unchecked");
                return Ok(hierarchy);
            }
        };
        let marked = hierarchy.mark_changed_sources(|name| current.get(name).cloned());
        if marked > 0 {
            debug!(marked, "summaries out of date with their files");
        }
        Ok(hierarchy)
    }

    // ── pass ────────────────────────────────────────────────────────────

    async fn run_pass(
        &self,
        project_name: &str,
        opts: &CompileOptions,
        scope: Scope,
    ) -> Result<SummaryHierarchy> {
        let params = PassParams {
            project_name,
            node_type: opts.summary_type.unwrap_or(self.config.node_summary_type),
            cap: opts
                .max_tokens_per_summary
                .unwrap_or(self.config.max_tokens_per_summary)
                .max(1),
            style: opts.style,
            focus_areas: &opts.focus_areas,
            force: opts.force_recompile,
            now: Utc::now(),
        };
        let mut warnings = Vec::new();

        // 1. nodes
        let stored_nodes: BTreeMap<String, Summary> = self
            .summaries
            .list_level(project_name, SummaryLevel::Node)
            .await?
            .into_iter()
            .filter_map(|s| s.metadata.source_files.first().cloned().map(|f| (f, s)))
            .collect();

        let (present, removed) = self.resolve_scope(project_name, &scope, &stored_nodes).await?;

        let jobs: Vec<(EnhancedFile, Option<Summary>)> = present
            .into_iter()
            .map(|file| {
                let previous = stored_nodes.get(&file.name).cloned();
                (file, previous)
            })
            .collect();
        let built: Vec<(String, String, Built)> = stream::iter(jobs)
            .map(|(file, previous)| {
                let params = &params;
                async move {
                    let key = cluster_key(&file, self.config.clustering);
                    let built = self.refresh_node(params, &file, previous).await;
                    (file.name, key, built)
                }
            })
            .buffered(self.config.concurrency_limit)
            .collect()
            .await;

        let mut nodes: BTreeMap<String, Summary> = stored_nodes
            .iter()
            .filter(|(name, _)| !removed.contains(*name))
            .map(|(name, s)| (name.clone(), s.clone()))
            .collect();
        for (name, key, built) in built {
            warnings.extend(built.warning);
            let mut summary = built.summary;
            summary.metadata.cluster_key = Some(key);
            let _ = nodes.insert(name, summary);
        }

        if nodes.is_empty() {
            return self.clear_tree(project_name, &stored_nodes).await;
        }

        // 2. sections
        let members: BTreeMap<String, String> = nodes
            .iter()
            .map(|(name, s)| {
                let key = s
                    .metadata
                    .cluster_key
                    .clone()
                    .unwrap_or_else(|| crate::clustering::DEFAULT_CLUSTER.to_string());
                (name.clone(), key)
            })
            .collect();
        let plans = plan_sections(project_name, &members, self.config.max_cluster_size);
        let root_id = SummaryId::project(project_name);

        let mut nodes_by_id: BTreeMap<SummaryId, Summary> = nodes
            .into_values()
            .map(|s| (s.id.clone(), s))
            .collect();
        for plan in &plans {
            for child in &plan.children {
                if let Some(node) = nodes_by_id.get_mut(child) {
                    node.metadata.parent_summary_id = Some(plan.id.clone());
                    node.metadata.child_summary_ids.clear();
                }
            }
        }

        let stored_sections: BTreeMap<SummaryId, Summary> = self
            .summaries
            .list_level(project_name, SummaryLevel::Section)
            .await?
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();

        let section_jobs: Vec<(&SectionPlan, Vec<&Summary>, Option<Summary>)> = plans
            .iter()
            .map(|plan| {
                let children = plan
                    .children
                    .iter()
                    .filter_map(|id| nodes_by_id.get(id))
                    .collect();
                (plan, children, stored_sections.get(&plan.id).cloned())
            })
            .collect();
        let built_sections: Vec<Built> = stream::iter(section_jobs)
            .map(|(plan, children, previous)| {
                let params = &params;
                let root_id = &root_id;
                async move {
                    self.refresh_parent(params, &plan.id, &children, previous, root_id)
                        .await
                }
            })
            .buffered(self.config.concurrency_limit)
            .collect()
            .await;

        let mut sections: BTreeMap<SummaryId, Summary> = BTreeMap::new();
        for (plan, built) in plans.iter().zip(built_sections) {
            warnings.extend(built.warning);
            let mut section = built.summary;
            section.metadata.cluster_key = Some(plan.key.clone());
            let _ = sections.insert(section.id.clone(), section);
        }

        // 3. root
        let stored_root = self
            .summaries
            .get(project_name, SummaryLevel::Project, &root_id)
            .await?;
        let section_refs: Vec<&Summary> = sections.values().collect();
        let root = self
            .refresh_root(&params, &scope, &section_refs, &stored_sections, stored_root.clone())
            .await;
        warnings.extend(root.warning.clone());
        let root = root.summary;

        // 4. writes
        let mut writes = 0usize;
        for node in nodes_by_id.values() {
            let stored = node
                .metadata
                .source_files
                .first()
                .and_then(|f| stored_nodes.get(f));
            if stored != Some(node) {
                self.put(node.clone()).await?;
                writes += 1;
            }
        }
        for section in sections.values() {
            if stored_sections.get(&section.id) != Some(section) {
                self.put(section.clone()).await?;
                writes += 1;
            }
        }
        if stored_root.as_ref() != Some(&root) {
            self.put(root).await?;
            writes += 1;
        }

        let mut deletes = 0usize;
        for name in &removed {
            if self
                .summaries
                .delete(project_name, SummaryLevel::Node, &SummaryId::node(project_name, name))
                .await?
            {
                deletes += 1;
            }
        }
        for id in stored_sections.keys() {
            if !sections.contains_key(id)
                && self
                    .summaries
                    .delete(project_name, SummaryLevel::Section, id)
                    .await?
            {
                deletes += 1;
            }
        }

        info!(
            nodes = nodes_by_id.len(),
            sections = sections.len(),
            writes,
            deletes,
            warnings = warnings.len(),
            "hierarchy pass complete"
        );

        let mut hierarchy = self.load_checked(project_name).await?;
        merge_warnings(&mut hierarchy, warnings);
        Ok(hierarchy)
    }

    /// Files to (re)compile and file names whose nodes must be removed.
    async fn resolve_scope(
        &self,
        project_name: &str,
        scope: &Scope,
        stored_nodes: &BTreeMap<String, Summary>,
    ) -> Result<(Vec<EnhancedFile>, BTreeSet<String>)> {
        match scope {
            Scope::All => {
                let files = self
                    .files
                    .list_files(project_name)
                    .await
                    .map_err(|e| e.with_context(format!("project {project_name}")))?;
                let names: BTreeSet<&str> = files.iter().map(|f| f.name.as_str()).collect();
                let removed = stored_nodes
                    .keys()
                    .filter(|name| !names.contains(name.as_str()))
                    .cloned()
                    .collect();
                Ok((files, removed))
            }
            Scope::Files(names) => {
                let mut present = Vec::new();
                let mut removed = BTreeSet::new();
                for name in names {
                    match self.files.read_file(project_name, name).await {
                        Ok(file) => present.push(file),
                        Err(StrataError::NotFound { kind: "file", .. }) => {
                            debug!(file = %name, "file no longer exists, removing its node");
                            let _ = removed.insert(name.clone());
                        }
                        Err(e) => return Err(e.with_context(format!("{project_name}/{name}"))),
                    }
                }
                Ok((present, removed))
            }
        }
    }

    /// Remove every summary of a project whose files are all gone.
    async fn clear_tree(
        &self,
        project_name: &str,
        stored_nodes: &BTreeMap<String, Summary>,
    ) -> Result<SummaryHierarchy> {
        let removed = self.summaries.delete_project(project_name).await?;
        debug!(removed, previous_nodes = stored_nodes.len(), "project has no files, tree cleared");
        Ok(SummaryHierarchy::assemble(project_name, Vec::new()))
    }

    async fn put(&self, summary: Summary) -> Result<()> {
        let id = summary.id.clone();
        self.summaries
            .put(summary)
            .await
            .map_err(|e| e.with_context(format!("summary {id}")))
    }

    // ── per-summary refresh ─────────────────────────────────────────────

    async fn refresh_node(
        &self,
        params: &PassParams<'_>,
        file: &EnhancedFile,
        previous: Option<Summary>,
    ) -> Built {
        let id = SummaryId::node(params.project_name, &file.name);
        let hash = file.effective_hash();
        let previous = match previous {
            Some(p)
                if !params.force
                    && p.metadata.status == SummaryStatus::Compiled
                    && p.metadata.source_hashes.get(&file.name) == Some(&hash) =>
            {
                return Built {
                    summary: p,
                    warning: None,
                };
            }
            other => other,
        };

        let input_tokens = self.content.count_tokens(&file.content);
        let source_hashes = BTreeMap::from([(file.name.clone(), hash)]);
        let sources = vec![file.name.clone()];
        match self
            .summarize_capped(&file.content, input_tokens, SummaryLevel::Node, params.node_type, params)
            .await
        {
            Ok((content, tokens)) => Built {
                summary: build_summary(
                    BuildArgs {
                        id,
                        project_name: params.project_name,
                        level: SummaryLevel::Node,
                        summary_type: params.node_type,
                        source_files: sources,
                        input_tokens,
                        source_hashes,
                        now: params.now,
                    },
                    content,
                    tokens,
                    previous.as_ref(),
                ),
                warning: None,
            },
            Err(error) => {
                warn!(file = %file.qualified_name(), %error, "node summarization failed");
                let warning = StaleHierarchyWarning {
                    summary_id: id.clone(),
                    source_file: Some(file.name.clone()),
                    reason: format!("summarization failed: {error}"),
                };
                let summary = match previous {
                    Some(mut previous) => {
                        previous.metadata.status = SummaryStatus::Stale;
                        previous
                    }
                    None => {
                        let (content, tokens) = self.fallback(&file.content, input_tokens, params.cap);
                        let mut summary = build_summary(
                            BuildArgs {
                                id,
                                project_name: params.project_name,
                                level: SummaryLevel::Node,
                                summary_type: SummaryType::Extractive,
                                source_files: sources,
                                input_tokens,
                                source_hashes: BTreeMap::new(),
                                now: params.now,
                            },
                            content,
                            tokens,
                            None,
                        );
                        summary.metadata.status = SummaryStatus::Stale;
                        summary
                    }
                };
                Built {
                    summary,
                    warning: Some(warning),
                }
            }
        }
    }

    /// Refresh a section over `children`. Links are always rewritten to match
    /// the plan, even when content is reused or the call fails.
    async fn refresh_parent(
        &self,
        params: &PassParams<'_>,
        id: &SummaryId,
        children: &[&Summary],
        previous: Option<Summary>,
        parent: &SummaryId,
    ) -> Built {
        let child_ids: Vec<SummaryId> = children.iter().map(|c| c.id.clone()).collect();
        let source_hashes: BTreeMap<String, String> = children
            .iter()
            .map(|c| (c.id.to_string(), c.content_hash()))
            .collect();
        let relink = |mut summary: Summary| {
            summary.metadata.child_summary_ids = child_ids.clone();
            summary.metadata.parent_summary_id = Some(parent.clone());
            summary
        };

        let previous = match previous {
            Some(p)
                if !params.force
                    && p.metadata.status == SummaryStatus::Compiled
                    && p.metadata.source_hashes == source_hashes =>
            {
                return Built {
                    summary: relink(p),
                    warning: None,
                };
            }
            other => other,
        };

        let built = self
            .summarize_children(params, id.clone(), SummaryLevel::Section, children, source_hashes, previous)
            .await;
        Built {
            summary: relink(built.summary),
            warning: built.warning,
        }
    }

    async fn refresh_root(
        &self,
        params: &PassParams<'_>,
        scope: &Scope,
        sections: &[&Summary],
        stored_sections: &BTreeMap<SummaryId, Summary>,
        previous: Option<Summary>,
    ) -> Built {
        let id = SummaryId::project(params.project_name);
        let child_ids: Vec<SummaryId> = sections.iter().map(|s| s.id.clone()).collect();
        let source_hashes: BTreeMap<String, String> = sections
            .iter()
            .map(|s| (s.id.to_string(), s.content_hash()))
            .collect();

        let reuse = !params.force && previous.as_ref().is_some_and(|p| {
            if p.metadata.status != SummaryStatus::Compiled {
                return false;
            }
            let same_set = p.metadata.child_summary_ids.iter().collect::<BTreeSet<_>>()
                == child_ids.iter().collect::<BTreeSet<_>>();
            if !same_set {
                return false;
            }
            if scope.is_incremental() {
                let entries: Vec<(Option<&str>, &str, usize)> = sections
                    .iter()
                    .map(|s| {
                        let old = stored_sections.get(&s.id).map(|o| o.content.as_str());
                        (old, s.content.as_str(), s.tokens())
                    })
                    .collect();
                let churn = weighted_churn(&entries);
                debug!(churn, threshold = self.config.churn_threshold, "section churn");
                churn <= self.config.churn_threshold
            } else {
                p.metadata.source_hashes == source_hashes
            }
        });

        let previous = match previous {
            Some(mut p) if reuse => {
                let mut source_files: Vec<String> = sections
                    .iter()
                    .flat_map(|s| s.metadata.source_files.iter().cloned())
                    .collect();
                source_files.sort();
                source_files.dedup();
                p.metadata.source_files = source_files;
                p.metadata.child_summary_ids = child_ids;
                p.metadata.parent_summary_id = None;
                return Built {
                    summary: p,
                    warning: None,
                };
            }
            other => other,
        };

        let mut built = self
            .summarize_children(params, id, SummaryLevel::Project, sections, source_hashes, previous)
            .await;
        built.summary.metadata.child_summary_ids = child_ids;
        built.summary.metadata.parent_summary_id = None;
        built
    }

    /// Summarize the concatenated contents of `children` into `id`.
    async fn summarize_children(
        &self,
        params: &PassParams<'_>,
        id: SummaryId,
        level: SummaryLevel,
        children: &[&Summary],
        source_hashes: BTreeMap<String, String>,
        previous: Option<Summary>,
    ) -> Built {
        let input = children
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let input_tokens: usize = children.iter().map(|c| c.tokens()).sum();
        let mut source_files: Vec<String> = children
            .iter()
            .flat_map(|c| c.metadata.source_files.iter().cloned())
            .collect();
        source_files.sort();
        source_files.dedup();

        let args = BuildArgs {
            id: id.clone(),
            project_name: params.project_name,
            level,
            summary_type: SummaryType::Hierarchical,
            source_files,
            input_tokens,
            source_hashes,
            now: params.now,
        };

        match self
            .summarize_capped(&input, input_tokens, level, SummaryType::Hierarchical, params)
            .await
        {
            Ok((content, tokens)) => Built {
                summary: build_summary(args, content, tokens, previous.as_ref()),
                warning: None,
            },
            Err(error) => {
                warn!(summary = %id, %error, "{level} summarization failed");
                let warning = StaleHierarchyWarning {
                    summary_id: id,
                    source_file: None,
                    reason: format!("summarization failed: {error}"),
                };
                let summary = match previous {
                    Some(mut previous) => {
                        previous.metadata.status = SummaryStatus::Stale;
                        previous.metadata.source_files = args.source_files;
                        previous
                    }
                    None => {
                        let (content, tokens) = self.fallback(&input, input_tokens, params.cap);
                        let mut summary = build_summary(
                            BuildArgs {
                                source_hashes: BTreeMap::new(),
                                summary_type: SummaryType::Extractive,
                                ..args
                            },
                            content,
                            tokens,
                            None,
                        );
                        summary.metadata.status = SummaryStatus::Stale;
                        summary
                    }
                };
                Built {
                    summary,
                    warning: Some(warning),
                }
            }
        }
    }

    /// Call the content service and enforce `min(cap, input_tokens)` locally.
    async fn summarize_capped(
        &self,
        input: &str,
        input_tokens: usize,
        level: SummaryLevel,
        summary_type: SummaryType,
        params: &PassParams<'_>,
    ) -> std::result::Result<(String, usize), UpstreamError> {
        if !self.content.is_available() {
            return Err(UpstreamError::Unavailable("content service".to_string()));
        }
        let mut opts = SummarizeOptions::new(level, summary_type, params.cap);
        opts.style = params.style;
        opts.focus_areas = params.focus_areas.to_vec();

        let text = with_deadline(
            "summarize",
            self.config.call_timeout,
            self.content.summarize(input, &opts),
        )
        .await?;

        let limit = params.cap.min(input_tokens);
        let content = truncate_with(text.trim(), limit, |s| self.content.count_tokens(s));
        let tokens = self.content.count_tokens(&content);
        Ok((content, tokens))
    }

    /// Leading content truncated to the cap.
    fn fallback(&self, input: &str, input_tokens: usize, cap: usize) -> (String, usize) {
        let content = truncate_with(input.trim(), cap.min(input_tokens), |s| {
            self.content.count_tokens(s)
        });
        let tokens = self.content.count_tokens(&content);
        (content, tokens)
    }
}

struct BuildArgs<'a> {
    id: SummaryId,
    project_name: &'a str,
    level: SummaryLevel,
    summary_type: SummaryType,
    source_files: Vec<String>,
    input_tokens: usize,
    source_hashes: BTreeMap<String, String>,
    now: DateTime<Utc>,
}

fn build_summary(
    args: BuildArgs<'_>,
    content: String,
    tokens: usize,
    previous: Option<&Summary>,
) -> Summary {
    #[allow(clippy::cast_precision_loss)]
    let compression_ratio = if args.input_tokens == 0 {
        1.0
    } else {
        tokens as f64 / args.input_tokens as f64
    };
    Summary {
        id: args.id,
        project_name: args.project_name.to_string(),
        content,
        metadata: SummaryMetadata {
            level: args.level,
            summary_type: args.summary_type,
            source_files: args.source_files,
            tokens,
            input_tokens: args.input_tokens,
            compression_ratio,
            created: previous.map_or(args.now, |p| p.metadata.created),
            updated: args.now,
            parent_summary_id: previous.and_then(|p| p.metadata.parent_summary_id.clone()),
            child_summary_ids: Vec::new(),
            status: SummaryStatus::Compiled,
            source_hashes: args.source_hashes,
            cluster_key: previous.and_then(|p| p.metadata.cluster_key.clone()),
        },
        embedding: None,
    }
}

/// Replace generic stale warnings with the specific reason from this pass.
fn merge_warnings(hierarchy: &mut SummaryHierarchy, warnings: Vec<StaleHierarchyWarning>) {
    for warning in warnings {
        match hierarchy
            .warnings
            .iter_mut()
            .find(|w| w.summary_id == warning.summary_id)
        {
            Some(existing) => *existing = warning,
            None => hierarchy.warnings.push(warning),
        }
    }
    hierarchy.stale = !hierarchy.warnings.is_empty();
}
