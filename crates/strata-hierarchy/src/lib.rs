//! # strata-hierarchy
//!
//! Builds and incrementally maintains a three-level summary tree per
//! project: one node summary per file, section summaries over clusters of
//! nodes, and a single project summary over the sections.
//!
//! - Summaries live in the injected [`SummaryRepository`](strata_core::SummaryRepository),
//!   linked by id; the compiler is the only writer.
//! - Writes to one project are serialized; different projects proceed in
//!   parallel.
//! - A failed summarization keeps the previous summary (marked stale) and
//!   never fails the whole call.

#![deny(unsafe_code)]

pub mod churn;
pub mod clustering;
pub mod compiler;
pub mod config;
pub mod locks;
pub mod selection;

pub use compiler::{CompileOptions, HierarchyCompiler};
pub use config::HierarchyConfig;
pub use selection::{SummarySelection, select_optimal};
