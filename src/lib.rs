//! Depth-Ripple: a depth-bounded recursive crawl orchestrator
//!
//! This crate walks outward from a seed URL one level at a time, fetching pages
//! through an interchangeable backend, extracting follow-links from the returned
//! content, and aggregating per-depth results into a crawl summary.

pub mod config;
pub mod crawler;
pub mod links;
pub mod output;
pub mod state;

use std::time::Duration;
use thiserror::Error;

/// Main error type for crawl operations
///
/// Only conditions that make a whole run meaningless surface here. A single
/// page failing to fetch is recorded as a failed page result instead.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend stalled on {url} at depth {depth} (no response after {timeout:?})")]
    BackendStalled {
        url: String,
        depth: u32,
        timeout: Duration,
    },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
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

    #[error("Invalid link pattern: {0}")]
    InvalidPattern(String),
}

/// Failure to fetch a single URL
///
/// The coordinator records these as failed pages and keeps crawling.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Backend failed for {url}: {message}")]
    Backend { url: String, message: String },

    #[error("Render failed for {url}: {message}")]
    Render { url: String, message: String },

    #[error("{0} is required for this backend")]
    MissingApiKey(String),
}

impl FetchError {
    /// Classifies a reqwest error the way the HTTP backends report it
    pub fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Http {
                url: url.to_string(),
                source: error,
            }
        }
    }
}

/// Link extraction errors
///
/// Never fatal: the coordinator treats them as "no links on this page".
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Malformed content: {0}")]
    Malformed(String),
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for a single fetch
pub type FetchResult<T> = std::result::Result<T, FetchError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, FetchBackend, FetchFormat, FetchedPage};
pub use links::{LinkExtractor, PathRule, PatternLinkExtractor};
pub use output::{CrawlSummary, ResultAggregator};
pub use state::{PageResult, VisitedSet};
