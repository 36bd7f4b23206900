//! Crate-wide error hierarchy for pr-reporter.
//!
//! One root `Error` for all public functions; sub-enums per concern with
//! `From` impls so call sites stay on `?`. No dynamic dispatch.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type ReportResult<T> = Result<T, Error>;

/// Root error type for the pr-reporter crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Review-server (transport) related failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Unified diff parsing failure.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Configuration problems (missing pull-request id, bad thresholds, etc.).
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Transport failure talking to the review server.
///
/// Per-finding occurrences are caught at the finding boundary and recorded
/// in the run outcome; the diff fetch is the only place where this is
/// fatal to the publication step.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Credentials rejected or insufficient permission (HTTP 401/403).
    #[error("auth rejected (status {0})")]
    Auth(u16),

    #[error("not found")]
    NotFound,

    #[error("rate limited")]
    RateLimited,

    /// HTTP 5xx.
    #[error("server error (status {0})")]
    Server(u16),

    /// Any other unexpected status.
    #[error("unexpected http status {0}")]
    HttpStatus(u16),

    #[error("request timed out")]
    Timeout,

    /// No status available (DNS, connect, reset mid-body).
    #[error("network error: {0}")]
    Network(String),
}

/// Unified diff parser errors.
///
/// The hunk header's line counts delimit hunk content, so a header that
/// does not parse poisons everything after it and aborts the parse.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid hunk header: {0}")]
    InvalidHunkHeader(String),
}

/// Configuration and setup errors.
///
/// All of these abort a run before any remote call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing pull-request id")]
    MissingPullRequestId,

    #[error("missing review-server project key")]
    MissingProject,

    #[error("missing review-server repository slug")]
    MissingRepository,

    #[error("missing review-server base url")]
    MissingBaseUrl,

    #[error("missing review-server credentials")]
    MissingCredentials,

    #[error("invalid issue threshold: {0}")]
    InvalidThreshold(String),

    #[error("unknown severity: {0}")]
    InvalidSeverity(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(TransportError::from(e))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return TransportError::Timeout;
        }
        let Some(status) = e.status() else {
            return TransportError::Network(e.to_string());
        };
        match status.as_u16() {
            code @ (401 | 403) => TransportError::Auth(code),
            404 => TransportError::NotFound,
            429 => TransportError::RateLimited,
            code @ 500..=599 => TransportError::Server(code),
            code => TransportError::HttpStatus(code),
        }
    }
}
