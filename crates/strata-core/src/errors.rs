//! Error taxonomy for the Strata context engine.
//!
//! - [`StrataError`]: everything a public operation can surface
//! - [`UpstreamError`]: failures of injected capabilities (vector store,
//!   content service). These are recoverable: orchestrators degrade, skip,
//!   or retain stale values instead of failing the whole call.
//!
//! Stale hierarchies are not errors; see
//! [`StaleHierarchyWarning`](crate::summary::StaleHierarchyWarning).

use std::time::Duration;

use thiserror::Error;

/// Failure of an external capability call.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The call did not complete before its deadline.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// Capability operation name (e.g. `"summarize"`).
        operation: String,
        /// Deadline that elapsed.
        timeout_ms: u64,
    },

    /// The service reported itself unavailable.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The service does not offer the requested capability.
    #[error("unsupported capability: {0}")]
    Unsupported(String),

    /// The call completed with an error.
    #[error("{operation} failed: {message}")]
    Failed {
        /// Capability operation name.
        operation: String,
        /// Error detail reported by the service.
        message: String,
    },
}

impl UpstreamError {
    /// Build a [`UpstreamError::Failed`].
    pub fn failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Build a [`UpstreamError::Timeout`] for an elapsed deadline.
    pub fn timeout(operation: impl Into<String>, deadline: Duration) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let timeout_ms = deadline.as_millis() as u64;
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Whether this failure was a deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Top-level error type for Strata operations.
#[derive(Debug, Error)]
pub enum StrataError {
    /// Malformed input, raised before any I/O.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Unknown project, file, or summary.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// What was looked up (`"project"`, `"file"`, `"hierarchy"`).
        kind: &'static str,
        /// The name or id that was missing.
        name: String,
    },

    /// Capability failure with the project/file context it occurred in.
    #[error("upstream failure ({context}): {source}")]
    Upstream {
        /// Where the failure happened.
        context: String,
        /// Underlying capability error.
        #[source]
        source: UpstreamError,
    },

    /// Budget smaller than the minimum viable chunk when a non-empty result
    /// was required.
    #[error(
        "budget of {max_tokens} tokens is below the minimum chunk size of {min_chunk_tokens} tokens"
    )]
    BudgetExceeded {
        /// Budget supplied by the caller.
        max_tokens: usize,
        /// Smallest chunk worth including.
        min_chunk_tokens: usize,
    },

    /// Repository read/write failure.
    #[error("storage failure ({context}): {message}")]
    Storage {
        /// Where the failure happened.
        context: String,
        /// Error detail.
        message: String,
    },
}

impl StrataError {
    /// Build a [`StrataError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Build a [`StrataError::NotFound`].
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Build a [`StrataError::Upstream`].
    pub fn upstream(context: impl Into<String>, source: UpstreamError) -> Self {
        Self::Upstream {
            context: context.into(),
            source,
        }
    }

    /// Build a [`StrataError::Storage`].
    pub fn storage(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Prefix the context of I/O-flavoured errors with `context`.
    ///
    /// Validation, not-found, and budget errors already name their subject
    /// and are returned unchanged.
    #[must_use]
    pub fn with_context(self, context: impl AsRef<str>) -> Self {
        let prefix = context.as_ref();
        match self {
            Self::Upstream { context, source } => Self::Upstream {
                context: format!("{prefix}: {context}"),
                source,
            },
            Self::Storage { context, message } => Self::Storage {
                context: format!("{prefix}: {context}"),
                message,
            },
            other => other,
        }
    }

    /// Whether callers should degrade rather than propagate.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Upstream { .. })
    }
}

/// Result alias for Strata operations.
pub type Result<T> = std::result::Result<T, StrataError>;
