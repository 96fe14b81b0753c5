//! # strata-settings
//!
//! Layered configuration for the Strata context engine.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`StrataSettings::default()`]
//! 2. **User file**: `~/.strata/settings.json` (merged over defaults)
//! 3. **Environment variables**: `STRATA_*` overrides (highest priority)
//!
//! There is no process-wide settings instance. Load once at startup and pass
//! the value to the components that need it.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{load_file_layer, load_settings, load_settings_from_path, settings_path};
pub use types::*;
