use serde::{Deserialize, Serialize};

/// Convenience result type used across adcraft.
pub type AdResult<T> = Result<T, AdError>;

/// Transient failure classes reported by external collaborator calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallFailure {
    /// The call did not complete in time.
    Timeout,
    /// The remote service refused the call because of rate limits.
    RateLimited,
    /// Connection-level failure (reset, refused, 5xx).
    Transport,
    /// The service answered, but not with the structure that was asked for.
    MalformedOutput,
}

impl CallFailure {
    /// Stable lowercase name used in messages and summaries.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::Transport => "transport",
            Self::MalformedOutput => "malformed_output",
        }
    }
}

/// Top-level error taxonomy used by pipeline and composition APIs.
#[derive(thiserror::Error, Debug)]
pub enum AdError {
    /// Invalid brand-strategy/brand combination or engine configuration. Fatal to the run.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transient collaborator failure. Retried by the stage executor.
    #[error("external call error: {message} ({})", .kind.as_str())]
    ExternalCall {
        /// Failure class.
        kind: CallFailure,
        /// Human-readable detail.
        message: String,
        /// Server-provided hint for the next attempt, if any.
        retry_after_ms: Option<u64>,
    },

    /// Collaborator returned structurally invalid data. Never retried.
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// Missing or undecodable image input.
    #[error("asset resolution error: {0}")]
    AssetResolution(String),

    /// Background/dimension problems that make the final asset impossible.
    #[error("composition error: {0}")]
    Composition(String),

    /// The run deadline passed before the work could be started or retried.
    #[error("deadline exceeded: {0}")]
    Deadline(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AdError {
    /// Build an [`AdError::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build an [`AdError::ExternalCall`] value without a retry hint.
    pub fn external(kind: CallFailure, msg: impl Into<String>) -> Self {
        Self::ExternalCall {
            kind,
            message: msg.into(),
            retry_after_ms: None,
        }
    }

    /// Build a [`CallFailure::Timeout`] external-call error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::external(CallFailure::Timeout, msg)
    }

    /// Build a [`CallFailure::RateLimited`] external-call error with an optional retry hint.
    pub fn rate_limited(msg: impl Into<String>, retry_after_ms: Option<u64>) -> Self {
        Self::ExternalCall {
            kind: CallFailure::RateLimited,
            message: msg.into(),
            retry_after_ms,
        }
    }

    /// Build an [`AdError::SchemaViolation`] value.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::SchemaViolation(msg.into())
    }

    /// Build an [`AdError::AssetResolution`] value.
    pub fn asset(msg: impl Into<String>) -> Self {
        Self::AssetResolution(msg.into())
    }

    /// Build an [`AdError::Composition`] value.
    pub fn composition(msg: impl Into<String>) -> Self {
        Self::Composition(msg.into())
    }

    /// Build an [`AdError::Deadline`] value.
    pub fn deadline(msg: impl Into<String>) -> Self {
        Self::Deadline(msg.into())
    }

    /// `true` for failures a retry may fix.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ExternalCall { kind, .. } => *kind != CallFailure::MalformedOutput,
            _ => false,
        }
    }

    /// Server-provided retry delay, when the failure carried one.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::ExternalCall { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }

    /// Ledger classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::ExternalCall {
                kind: CallFailure::MalformedOutput,
                ..
            } => ErrorKind::SchemaViolation,
            Self::ExternalCall { .. } => ErrorKind::ExternalCall,
            Self::SchemaViolation(_) => ErrorKind::SchemaViolation,
            Self::AssetResolution(_) => ErrorKind::AssetResolution,
            Self::Composition(_) => ErrorKind::Composition,
            Self::Deadline(_) => ErrorKind::Deadline,
            Self::Other(_) => ErrorKind::Internal,
        }
    }
}

/// Serializable error classification stored in the error ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`AdError::Configuration`].
    Configuration,
    /// See [`AdError::ExternalCall`].
    ExternalCall,
    /// See [`AdError::SchemaViolation`].
    SchemaViolation,
    /// See [`AdError::AssetResolution`].
    AssetResolution,
    /// See [`AdError::Composition`].
    Composition,
    /// Timeouts imposed by the orchestrator itself (segment timeout, run deadline).
    Deadline,
    /// Wrapped dependency errors and task panics.
    Internal,
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
