//! Output module for aggregating and reporting crawl results
//!
//! This module handles:
//! - Collecting page results per depth while a crawl runs
//! - The serializable `CrawlSummary` returned to callers
//! - Generating markdown reports and console summaries
//! - Comparing crawls of one seed across backends

mod aggregator;
mod compare;
mod markdown;
pub mod stats;
mod summary;

pub use aggregator::ResultAggregator;
pub use compare::{format_comparison, highlights, print_comparison, ComparisonHighlights};
pub use markdown::{format_markdown_summary, write_markdown_summary};
pub use stats::print_summary;
pub use summary::CrawlSummary;
