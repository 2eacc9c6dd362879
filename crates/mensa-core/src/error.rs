//! Error types for Mensa Core
//!
//! Every failure the engine can observe is modelled here. The dialogue
//! orchestrator converts all of them into response directives, so none of
//! these reach the caller of a turn as a hard failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for Mensa operations
pub type Result<T> = std::result::Result<T, MensaError>;

/// Main error type for Mensa operations
#[derive(Error, Debug)]
pub enum MensaError {
    /// Provider could not be reached or answered with a non-2xx status
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Provider document could not be understood
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Slot resolution errors
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// Session blob could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        source: Box<MensaError>,
    },
}

/// Kind of provider fetch failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// The request did not complete within the configured bound
    Timeout,
    /// The provider could not be reached at all
    ConnectionFailed,
    /// The provider answered with a non-2xx status
    HttpError(u16),
}

impl std::fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchErrorKind::Timeout => write!(f, "timeout"),
            FetchErrorKind::ConnectionFailed => write!(f, "connection failed"),
            FetchErrorKind::HttpError(status) => write!(f, "HTTP error {}", status),
        }
    }
}

/// Failure of a single provider call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{detail}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub detail: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Timeout, detail)
    }

    pub fn connection_failed(detail: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::ConnectionFailed, detail)
    }

    pub fn http(status: u16, detail: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::HttpError(status), detail)
    }
}

/// The provider document has no recognizable menu structure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct ParseError {
    pub reason: String,
}

impl ParseError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors related to slot resolution
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Unknown canteen: {0:?}")]
    InvalidCanteen(String),

    #[error("Invalid date: {0:?}")]
    InvalidDate(String),
}

impl MensaError {
    /// Add context to an error
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to a Result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add lazy context to a Result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.context(f()))
    }
}
