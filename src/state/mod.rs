//! State module for tracking crawl progress
//!
//! This module provides the per-run state the coordinator owns while a crawl
//! is in progress.
//!
//! # Components
//!
//! - `VisitedSet`: URLs already dispatched, the crawl's only deduplication record
//! - `PageResult`: The outcome of one dispatched fetch

mod page_result;
mod visited;

// Re-export main types
pub use page_result::PageResult;
pub use visited::VisitedSet;
