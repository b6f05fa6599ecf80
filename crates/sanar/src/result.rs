//! Result and error types for Sanar.

use crate::resolve::ResolutionAttempt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for Sanar operations
pub type SanarResult<T> = Result<T, SanarError>;

/// Errors that can occur in Sanar
#[derive(Debug, Error)]
pub enum SanarError {
    /// Semantic element name absent from the catalog
    #[error("Unknown element '{name}': not present in the selector catalog")]
    UnknownElement {
        /// Requested element name
        name: String,
    },

    /// Every candidate selector was probed and none resolved
    #[error("Element '{name}' not found: {} candidate(s) exhausted", .trail.len())]
    ElementNotFound {
        /// Requested element name or raw selector
        name: String,
        /// One attempt per candidate probed, in probe order
        trail: Vec<ResolutionAttempt>,
    },

    /// Resolution exceeded its total time budget
    #[error("Resolution timed out after {ms}ms")]
    ResolutionTimeout {
        /// Budget in milliseconds
        ms: u64,
    },

    /// Caller-level semantic check failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Automation driver failure while probing
    #[error("Probe failed: {message}")]
    Probe {
        /// Error message
        message: String,
    },

    /// Invalid or unloadable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

/// Lightweight classification of a `SanarError`.
///
/// Carried in retry outcomes so reports can name the failure class without
/// owning the error itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Catalog miss
    UnknownElement,
    /// All candidates exhausted
    ElementNotFound,
    /// Time budget exceeded
    ResolutionTimeout,
    /// Semantic check failed
    AssertionFailed,
    /// Driver failure
    Probe,
    /// Configuration problem
    Config,
    /// I/O failure
    Io,
    /// Serialization failure
    Serde,
}

impl ErrorKind {
    /// Whether retrying the same operation unchanged may succeed.
    ///
    /// Transient failures are retried by the retry policy; everything else
    /// propagates on first occurrence.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound | Self::ResolutionTimeout | Self::Probe
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::UnknownElement => "unknown-element",
            Self::ElementNotFound => "element-not-found",
            Self::ResolutionTimeout => "resolution-timeout",
            Self::AssertionFailed => "assertion-failed",
            Self::Probe => "probe",
            Self::Config => "config",
            Self::Io => "io",
            Self::Serde => "serde",
        };
        write!(f, "{name}")
    }
}

impl SanarError {
    /// Classify this error for retry decisions and reporting.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownElement { .. } => ErrorKind::UnknownElement,
            Self::ElementNotFound { .. } => ErrorKind::ElementNotFound,
            Self::ResolutionTimeout { .. } => ErrorKind::ResolutionTimeout,
            Self::AssertionFailed { .. } => ErrorKind::AssertionFailed,
            Self::Probe { .. } => ErrorKind::Probe,
            Self::Config { .. } => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
            Self::Json(_) | Self::Yaml(_) => ErrorKind::Serde,
        }
    }

    /// Whether retrying the same operation unchanged may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        self.kind().is_transient()
    }
}
