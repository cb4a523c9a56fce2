//! Link candidate extraction
//!
//! The coordinator only needs "some text in, some follow-URLs out". How links
//! are recognised is a per-site policy, so it lives behind the `LinkExtractor`
//! trait and is injected into the coordinator at construction.
//!
//! The bundled `PatternLinkExtractor` runs regexes over page content and keeps
//! candidates whose path passes a `PathRule`.

mod pattern;
mod rule;

pub use pattern::{PatternLinkExtractor, DEFAULT_MAX_LINKS};
pub use rule::PathRule;

use crate::ExtractionError;

/// Produces follow-link candidates from fetched page content
///
/// Implementations must be free of side effects and must not panic on
/// malformed content; an empty vector is the answer for "nothing usable".
/// An `Err` is tolerated by the coordinator and treated as zero links.
pub trait LinkExtractor: Send + Sync {
    /// Returns deduplicated, absolute candidate URLs in discovery order
    fn extract(&self, content: &str, base_url: &str) -> Result<Vec<String>, ExtractionError>;
}
