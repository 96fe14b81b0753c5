//! # strata-search
//!
//! Multi-factor ranking of a project's files against a query.
//!
//! Each candidate gets five sub-scores in `[0, 1]` (semantic, recency,
//! frequency, salience, time decay) combined by normalized weights. Semantic
//! similarity comes from the injected vector repository; when it cannot be
//! computed the score falls back to a neutral value and the response is
//! flagged degraded instead of failing.

#![deny(unsafe_code)]

pub mod config;
pub mod ranker;
pub mod scoring;

pub use config::RankerConfig;
pub use ranker::Ranker;
pub use scoring::RankKey;
