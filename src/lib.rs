//! Forum-Harvest: incremental record extraction from a paginated web forum
//!
//! This crate walks the boards and threads of an SMF-style forum page by page,
//! turning rendered HTML into deduplicated thread and post records. Fetches are
//! retried with linear backoff, thread pages are cached per container, and a
//! partially known post can be completed later through targeted re-fetches.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod model;
pub mod url;

use thiserror::Error;

/// Main error type for Forum-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] UrlError),

    #[error("Network error for {url}: {message}")]
    TransientNetwork { url: String, message: String },

    #[error("Gave up on {url} after {attempts} attempts")]
    ConnectivityExhausted { url: String, attempts: u32 },

    #[error("Unexpected markup at {url}: {message}")]
    StructuralMismatch { url: String, message: String },

    #[error("Could not locate post: {0}")]
    EnrichmentImpossible(String),

    /// Cooperative abort requested through a cancellation token.
    ///
    /// Not a failure: pages completed before the abort stay cached.
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl HarvestError {
    /// Returns true if this is the cancellation signal rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns true if the caller supplied something malformed
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::Url(_))
    }

    /// Returns true if the error may go away by trying again
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientNetwork { .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Malformed forum URL: {0}")]
    Malformed(String),

    #[error("Expected a {expected} link, got a {found} link")]
    UnexpectedKind {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid forum host: {0}")]
    InvalidHost(String),
}

/// Result type alias for Forum-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{
    EnrichmentPlan, Enricher, EventSink, Fetcher, PaginationWalker, RetryPolicy, ScanEvent,
};
pub use extract::Extractor;
pub use model::{Board, Post, Thread};
pub use url::ForumLink;
