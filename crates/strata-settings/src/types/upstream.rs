//! Deadlines and fan-out limits for capability calls.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Settings shared by every component that calls the content service or
/// vector repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpstreamSettings {
    /// Deadline for a single capability call.
    pub call_timeout_ms: u64,
    /// Maximum in-flight capability calls per operation.
    pub concurrency_limit: usize,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            call_timeout_ms: 30_000,
            concurrency_limit: 4,
        }
    }
}

impl UpstreamSettings {
    /// [`call_timeout_ms`](Self::call_timeout_ms) as a [`Duration`].
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.call_timeout_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "upstream.callTimeoutMs must be at least 1".to_string(),
            ));
        }
        if self.concurrency_limit == 0 {
            return Err(SettingsError::InvalidValue(
                "upstream.concurrencyLimit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
