//! # strata-core
//!
//! Shared data model and capability traits for the Strata context engine.
//!
//! - **Data model**: [`EnhancedFile`], [`Summary`], [`SummaryHierarchy`],
//!   search query/response types, [`ContextBudget`], [`ContextCompilation`]
//! - **Errors**: [`StrataError`] taxonomy plus [`UpstreamError`] for
//!   capability failures (always recoverable)
//! - **Capabilities**: [`VectorRepository`], [`SummaryRepository`],
//!   [`ContentService`], [`FileStore`], injected into every component
//! - **Test doubles**: [`in_memory`] repositories and a deterministic
//!   [`mock::MockContentService`]

#![deny(unsafe_code)]

pub mod budget;
pub mod capabilities;
pub mod compilation;
pub mod deadline;
pub mod errors;
pub mod files;
pub mod ids;
pub mod in_memory;
pub mod mock;
pub mod options;
pub mod search;
pub mod summary;
pub mod tokens;
pub mod validation;
pub mod vector;

pub use budget::{ContextBudget, ContextType};
pub use capabilities::{
    ContentService, FileStore, SummaryRepository, VectorFilters, VectorMatch, VectorRepository,
};
pub use compilation::{ContextCompilation, ContextItem, ItemSource, SkipReason, SkippedCandidate};
pub use deadline::with_deadline;
pub use errors::{Result, StrataError, UpstreamError};
pub use files::{EnhancedFile, FileMetadata, hash_content};
pub use ids::SummaryId;
pub use options::{
    CompressOptions, CompressionMethod, CompressionOutput, CompressionTarget, SummarizeOptions,
    SummaryStyle,
};
pub use search::{RankingWeights, ScoreBreakdown, SearchQuery, SearchResponse, SearchResult};
pub use summary::{
    StaleHierarchyWarning, Summary, SummaryHierarchy, SummaryLevel, SummaryMetadata,
    SummaryStatus, SummaryType,
};
