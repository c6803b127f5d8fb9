//! Error types for the AqBanking client library.

use crate::models::{BackendKind, RecordKind};

/// All errors that can occur while querying a banking backend.
#[derive(Debug, thiserror::Error)]
pub enum BankingError {
    /// A required parameter is missing or invalid, or the requested
    /// resource/operation pair does not exist.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The backend cannot be invoked at all (tool missing, interpreter not
    /// spawnable, native library absent, operation not offered).
    #[error("{backend} backend unavailable: {reason}")]
    BackendUnavailable {
        /// Backend that could not be used.
        backend: BackendKind,
        /// Why it could not be used.
        reason: String,
    },

    /// The backend ran but reported a failure.
    #[error("{backend} backend failed: {message}")]
    BackendExecution {
        /// Backend that failed.
        backend: BackendKind,
        /// Diagnostic text (captured standard error, script error, ...).
        message: String,
    },

    /// Backend output matched no known pattern for the requested record.
    #[error("could not parse {kind} from backend output: {detail}")]
    Parse {
        /// Record kind that was being parsed.
        kind: RecordKind,
        /// Offending output or parser message.
        detail: String,
    },

    /// The requested account is not among the accounts the backend knows.
    #[error("account {account} not found (available: {})", .available.join(", "))]
    NotFound {
        /// Identifier the caller asked for.
        account: String,
        /// Identifiers the backend returned instead.
        available: Vec<String>,
    },

    /// A built-in output pattern failed to compile.
    #[error("invalid output pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV writing failed.
    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),

    /// Filesystem access failed (configuration files, process pipes).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BankingError {
    /// Shorthand for a [`BankingError::Configuration`] error.
    #[inline]
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration(message.into())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, BankingError>;
