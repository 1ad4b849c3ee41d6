//! Typed errors for the sourcing library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that can occur while acquiring page content.
///
/// These never escape [`crate::fetch::ContentFetcher::fetch`] (the tiered
/// fetcher absorbs them into a `Failed` result), but individual tiers and
/// the renderer surface them so escalation can react.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Security validation refused the URL
    #[error("security error: {0}")]
    Security(#[from] SecurityError),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Browser rendering failed
    #[error("render error: {0}")]
    Render(String),

    /// Operation exceeded its deadline
    #[error("timeout fetching: {url}")]
    Timeout { url: String },

    /// URL could not be parsed
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

/// Errors that can occur during structured extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// LLM provider unavailable or failed. Never retried.
    #[error("LLM service error: {0}")]
    Llm(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Response failed schema validation. Retried with corrective feedback.
    #[error("response failed validation: {message}")]
    InvalidResponse { message: String },
}

/// Errors that can occur reading or writing the content cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem operation failed
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record did not serialize
    #[error("cache record error: {0}")]
    Record(#[from] serde_json::Error),
}

/// Security-related errors raised before any network cost is spent.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// URL scheme not allowed (e.g., file://, ftp://)
    #[error("disallowed URL scheme: {0}")]
    DisallowedScheme(String),

    /// Host is blocked (e.g., localhost, internal IPs)
    #[error("blocked host: {0}")]
    BlockedHost(String),

    /// URL has no host
    #[error("URL has no host")]
    NoHost,

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Result type alias for extraction operations.
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

/// Result type alias for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Result type alias for security validation.
pub type SecurityResult<T> = std::result::Result<T, SecurityError>;
