//! # strata-context
//!
//! Turns a query and a token budget into a bounded context.
//!
//! - [`recommend_budget`]: table-driven default budgets per context type
//! - [`ContextCompiler`]: merges ranked files with hierarchy summaries,
//!   fills the budget greedily, and compresses candidates that overflow
//!
//! `used_tokens <= budget.max_tokens` holds for every returned
//! [`ContextCompilation`](strata_core::ContextCompilation).

#![deny(unsafe_code)]

pub mod budget;
pub mod compiler;
pub mod config;

pub use budget::{BudgetProfile, recommend_budget, recommend_budget_for};
pub use compiler::{CompileContextOptions, ContextCompiler};
pub use config::ContextConfig;
