//! Error types for pg_query_hints.
//!
//! All errors raised while tagging, rendering or patching a statement are
//! represented by [`PgHintError`]. Every error surfaces synchronously while
//! the statement is being prepared, before anything reaches the execution
//! layer, and none of them is retried.
//!
//! # Error Classification
//!
//! - **User**: unknown hint kinds, conflicting hints, reserved annotations.
//!   Programming errors in the caller.
//! - **Config**: the configuration file could not be read or validated.
//! - **Internal**: invariant violations, including a malformed hint marker
//!   in rendered text. The statement must not be executed.

use std::fmt;

/// Primary error type for the crate.
#[derive(Debug, thiserror::Error)]
pub enum PgHintError {
    // ── User errors ─────────────────────────────────────────────────────
    /// The requested hint kind is not registered (or not a known kind).
    #[error("unsupported hint kind: {0}")]
    UnsupportedHintKind(String),

    /// The hints attached to a statement cannot be combined.
    #[error("invalid hint combination: {0}")]
    InvalidHintCombination(String),

    /// An invalid argument was provided to an API function.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // ── Configuration errors ────────────────────────────────────────────
    /// The configuration could not be parsed or failed validation.
    #[error("configuration error: {0}")]
    ConfigError(String),

    // ── Internal errors ─────────────────────────────────────────────────
    /// Rendered text carries a hint marker that cannot be patched safely.
    #[error("malformed hint marker: {0}")]
    MalformedHintMarker(String),

    /// An unexpected internal error. Indicates a bug.
    #[error("internal error: {0}")]
    InternalError(String),
}

/// Classification of error kind for logging and callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PgHintErrorKind {
    User,
    Config,
    Internal,
}

impl fmt::Display for PgHintErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PgHintErrorKind::User => write!(f, "USER"),
            PgHintErrorKind::Config => write!(f, "CONFIG"),
            PgHintErrorKind::Internal => write!(f, "INTERNAL"),
        }
    }
}

impl PgHintError {
    /// Classify the error.
    pub fn kind(&self) -> PgHintErrorKind {
        match self {
            PgHintError::UnsupportedHintKind(_)
            | PgHintError::InvalidHintCombination(_)
            | PgHintError::InvalidArgument(_) => PgHintErrorKind::User,

            PgHintError::ConfigError(_) => PgHintErrorKind::Config,

            PgHintError::MalformedHintMarker(_) | PgHintError::InternalError(_) => {
                PgHintErrorKind::Internal
            }
        }
    }

    /// Whether the error means the hinted statement must not reach the
    /// database. Raised while tagging, rendering or patching.
    pub fn blocks_execution(&self) -> bool {
        matches!(
            self,
            PgHintError::MalformedHintMarker(_) | PgHintError::InvalidHintCombination(_)
        )
    }
}

impl From<toml::de::Error> for PgHintError {
    fn from(err: toml::de::Error) -> Self {
        PgHintError::ConfigError(err.to_string())
    }
}
