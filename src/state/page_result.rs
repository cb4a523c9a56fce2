//! Per-page outcome records
//!
//! One `PageResult` exists for every URL the coordinator dispatched, whether
//! the fetch succeeded or failed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The recorded outcome of one dispatched fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// The dispatched URL
    pub url: String,

    /// Depth of the level that dispatched it (seed = 0)
    pub depth: u32,

    /// Whether the backend returned content
    pub success: bool,

    /// First top-level heading of the content, if any
    pub title: Option<String>,

    /// Length of the returned content in characters (0 on failure)
    pub content_length: usize,

    /// Wall-clock time spent in the fetch call (seconds)
    pub duration: f64,

    /// Human-readable failure cause
    pub error: Option<String>,
}

impl PageResult {
    /// Builds the record for a successful fetch
    pub fn success(
        url: impl Into<String>,
        depth: u32,
        title: Option<String>,
        content_length: usize,
        elapsed: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            depth,
            success: true,
            title,
            content_length,
            duration: elapsed.as_secs_f64(),
            error: None,
        }
    }

    /// Builds the record for a failed fetch
    pub fn failure(
        url: impl Into<String>,
        depth: u32,
        error: impl fmt::Display,
        elapsed: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            depth,
            success: false,
            title: None,
            content_length: 0,
            duration: elapsed.as_secs_f64(),
            error: Some(error.to_string()),
        }
    }

    /// Title for display, with the placeholders used in reports
    pub fn display_title(&self) -> &str {
        match (&self.title, self.success) {
            (Some(title), _) => title.as_str(),
            (None, true) => "Unknown",
            (None, false) => "Failed",
        }
    }
}

impl fmt::Display for PageResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success {
            write!(
                f,
                "[depth {}] {} '{}' ({} chars, {:.2}s)",
                self.depth,
                self.url,
                self.display_title(),
                self.content_length,
                self.duration
            )
        } else {
            write!(
                f,
                "[depth {}] {} failed: {}",
                self.depth,
                self.url,
                self.error.as_deref().unwrap_or("unknown error")
            )
        }
    }
}
