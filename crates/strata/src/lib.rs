//! # strata
//!
//! Query-time context assembly for project knowledge bases.
//!
//! [`StrataEngine`] wires the components together from settings and
//! injected capabilities:
//!
//! - ranking: [`Ranker`](strata_search::Ranker)
//! - summary hierarchies: [`HierarchyCompiler`](strata_hierarchy::HierarchyCompiler)
//! - budgets: [`recommend_budget`](strata_context::recommend_budget)
//! - bounded contexts: [`ContextCompiler`](strata_context::ContextCompiler)
//!
//! [`telemetry::init_logging`] installs the tracing subscriber.

#![deny(unsafe_code)]

pub mod engine;
pub mod telemetry;

pub use engine::{InMemoryDeps, StrataDeps, StrataEngine};

pub use strata_context::{CompileContextOptions, ContextConfig, recommend_budget};
pub use strata_core::{
    ContentService, ContextBudget, ContextCompilation, ContextItem, ContextType, EnhancedFile,
    FileStore, ItemSource, Result, SearchQuery, SearchResponse, SkipReason, StrataError,
    SummaryHierarchy, SummaryLevel, SummaryRepository, VectorRepository,
};
pub use strata_hierarchy::{CompileOptions, HierarchyConfig, SummarySelection};
pub use strata_search::RankerConfig;
pub use strata_settings::{StrataSettings, load_settings, load_settings_from_path};
