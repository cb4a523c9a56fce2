//! The crawl summary handed back to callers

use crate::state::PageResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate view of one crawl run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlSummary {
    /// The seed the run started from
    pub seed_url: String,

    /// Name of the fetch backend used
    pub backend: String,

    /// Deepest depth with at least one recorded result (0 when empty)
    pub max_depth_reached: u32,

    /// Number of recorded results
    pub total_pages: usize,

    /// Number of successful results
    pub successful_pages: usize,

    /// Results recorded per depth; depths with no dispatch are absent
    pub per_depth_counts: BTreeMap<u32, usize>,

    /// Every result in dispatch order
    pub all_results: Vec<PageResult>,

    /// Sum of content lengths over successful pages
    pub total_content_length: usize,

    /// Sum of fetch durations (seconds)
    pub total_duration: f64,

    /// The run was stopped before the frontier ran out
    pub cancelled: bool,
}

impl CrawlSummary {
    pub fn failed_pages(&self) -> usize {
        self.total_pages - self.successful_pages
    }

    /// Returns the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_pages == 0 {
            return 0.0;
        }
        (self.successful_pages as f64 / self.total_pages as f64) * 100.0
    }

    /// Results recorded at one depth, in dispatch order
    pub fn results_at(&self, depth: u32) -> impl Iterator<Item = &PageResult> {
        self.all_results.iter().filter(move |r| r.depth == depth)
    }

    /// Mean fetch duration over all results (seconds)
    pub fn average_duration(&self) -> f64 {
        if self.total_pages == 0 {
            return 0.0;
        }
        self.total_duration / self.total_pages as f64
    }
}
