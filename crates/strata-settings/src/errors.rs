//! Settings errors.

use thiserror::Error;

/// Failure to produce a usable [`StrataSettings`](crate::StrataSettings).
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file is malformed or a value has the wrong type.
    #[error("cannot load strata settings: {0}")]
    Load(#[from] Box<figment::Error>),
    /// A value parsed but is out of range.
    #[error("invalid strata setting: {0}")]
    InvalidValue(String),
}

/// Result alias for settings loading.
pub type Result<T> = std::result::Result<T, SettingsError>;
