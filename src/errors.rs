//! Unified error handling for the takedown orchestrator.
//!
//! The taxonomy mirrors the failure domains of the pipeline:
//!   * Input validation (IOC parsing, configuration)
//!   * Transient collaborator failures (collection, status checks,
//!     submission transport) that the scheduler sweep retries
//!   * Fatal per-case conditions (no connector registered)
//!   * Backpressure (`QueueFull`) surfaced synchronously to producers
//!   * Clean shutdown (`Cancelled`)
//!
//! Handlers never panic: they append an event to the case history and
//! return one of these variants; the worker records anything that
//! bubbles up as an `error` event.

use std::io;

use thiserror::Error;

/// High-level classification used for logging and exit-code mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// User/data validation problems (exit code 1).
    Input,
    /// Transient failures the scheduler retries.
    Transient,
    /// Fatal for the affected case; the case is closed.
    Fatal,
    /// Logic bugs, I/O and unexpected states (exit code 2).
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCategory::Input => "input",
            ErrorCategory::Transient => "transient",
            ErrorCategory::Fatal => "fatal",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Primary application error type.
#[derive(Error, Debug)]
pub enum TakedownError {
    // ------------------------ Input / Validation ----------------------------
    #[error("Invalid IOC '{value}': {reason}")]
    InvalidIoc { value: String, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Unknown case: {case_id}")]
    UnknownCase { case_id: String },

    // --------------------------- Collaborators ------------------------------
    #[error("Evidence collection failed for '{target}': {reason}")]
    Collection { target: String, reason: String },

    #[error("Enrichment failed for '{domain}': {reason}")]
    Enrichment { domain: String, reason: String },

    #[error("Submission to '{target}' failed: {reason}")]
    Submission { target: String, reason: String },

    #[error("Status check against '{target}' failed: {reason}")]
    StatusCheck { target: String, reason: String },

    #[error("RDAP lookup for '{domain}' failed: {reason}")]
    Rdap { domain: String, reason: String },

    #[error("SMTP delivery via {server} failed: {reason}")]
    Smtp { server: String, reason: String },

    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // --------------------------- Orchestration ------------------------------
    #[error("work queue is full")]
    QueueFull,

    #[error("no connector registered for target kind '{kind}'")]
    NoConnector { kind: String },

    #[error("operation cancelled")]
    Cancelled,

    // ----------------------------- I/O / FS ---------------------------------
    #[error("I/O error during {operation} on {path}: {source}")]
    Io {
        path: String,
        operation: String,
        #[source]
        source: io::Error,
    },

    // ---------------------------- Internal ----------------------------------
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl TakedownError {
    /// Categorize the error for logging / exit-code mapping.
    pub fn category(&self) -> ErrorCategory {
        use TakedownError::*;
        match self {
            InvalidIoc { .. } | Configuration { .. } | UnknownCase { .. } => ErrorCategory::Input,

            Collection { .. }
            | Enrichment { .. }
            | Submission { .. }
            | StatusCheck { .. }
            | Rdap { .. }
            | Smtp { .. }
            | Http { .. }
            | QueueFull => ErrorCategory::Transient,

            NoConnector { .. } | Cancelled => ErrorCategory::Fatal,

            Io { .. } | Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Whether this error represents a clean cancellation rather than a
    /// failure worth recording as an `error` event.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TakedownError::Cancelled)
    }

    // ---------------------------- Constructors -----------------------------

    pub fn invalid_ioc(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIoc {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn collection(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Collection {
            target: target.into(),
            reason: reason.into(),
        }
    }

    pub fn enrichment(domain: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Enrichment {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    pub fn submission(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Submission {
            target: target.into(),
            reason: reason.into(),
        }
    }

    pub fn status_check(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StatusCheck {
            target: target.into(),
            reason: reason.into(),
        }
    }

    pub fn rdap(domain: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rdap {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    pub fn smtp(server: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Smtp {
            server: server.into(),
            reason: reason.into(),
        }
    }

    pub fn no_connector(kind: impl Into<String>) -> Self {
        Self::NoConnector { kind: kind.into() }
    }

    pub fn io(path: impl Into<String>, operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Public result alias.
pub type Result<T> = std::result::Result<T, TakedownError>;

impl From<io::Error> for TakedownError {
    fn from(e: io::Error) -> Self {
        TakedownError::Io {
            path: "<unknown>".into(),
            operation: "unspecified".into(),
            source: e,
        }
    }
}

impl From<reqwest::Error> for TakedownError {
    fn from(e: reqwest::Error) -> Self {
        let url = e
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "<unknown>".into());
        TakedownError::Http { url, source: e }
    }
}

/// Extension trait for enriching IO results with path + operation context.
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<String>, operation: impl Into<String>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::result::Result<T, io::Error> {
    fn with_path(self, path: impl Into<String>, operation: impl Into<String>) -> Result<T> {
        self.map_err(|e| TakedownError::io(path.into(), operation.into(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_mapping() {
        assert_eq!(
            TakedownError::invalid_ioc("x", "empty").category(),
            ErrorCategory::Input
        );
        assert_eq!(
            TakedownError::collection("evil.com", "timeout").category(),
            ErrorCategory::Transient
        );
        assert_eq!(TakedownError::QueueFull.category(), ErrorCategory::Transient);
        assert_eq!(
            TakedownError::no_connector("cdn").category(),
            ErrorCategory::Fatal
        );
        assert_eq!(
            TakedownError::internal("boom").category(),
            ErrorCategory::Internal
        );
    }

    #[test]
    fn cancelled_is_not_an_error_event() {
        assert!(TakedownError::Cancelled.is_cancelled());
        assert!(!TakedownError::QueueFull.is_cancelled());
    }

    #[test]
    fn io_context() {
        let res: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::NotFound, "missing"));
        let mapped = res.with_path("/var/lib/takedown/journal.jsonl", "append");
        match mapped.err().unwrap() {
            TakedownError::Io {
                path, operation, ..
            } => {
                assert_eq!(path, "/var/lib/takedown/journal.jsonl");
                assert_eq!(operation, "append");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
