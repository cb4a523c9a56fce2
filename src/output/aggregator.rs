//! Per-depth result accumulation

use crate::output::CrawlSummary;
use crate::state::PageResult;
use std::collections::BTreeMap;

/// Collects page results for one run, bucketed by depth
///
/// Buckets are append-only and only exist once something was recorded at
/// their depth. `summarize` reads the current state without changing it, so
/// it can be called mid-run for a partial snapshot.
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    seed_url: String,
    backend: String,
    buckets: BTreeMap<u32, Vec<PageResult>>,
    cancelled: bool,
}

impl ResultAggregator {
    pub fn new(seed_url: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            seed_url: seed_url.into(),
            backend: backend.into(),
            buckets: BTreeMap::new(),
            cancelled: false,
        }
    }

    /// Appends a result to the bucket for `depth`
    pub fn record(&mut self, depth: u32, result: PageResult) {
        self.buckets.entry(depth).or_default().push(result);
    }

    /// Flags the run as stopped early
    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    /// Number of recorded results across all depths
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Results recorded at one depth
    pub fn bucket(&self, depth: u32) -> &[PageResult] {
        self.buckets.get(&depth).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Builds the summary of everything recorded so far
    pub fn summarize(&self) -> CrawlSummary {
        // Levels are crawled in ascending depth, so depth order is dispatch order.
        let all_results: Vec<PageResult> = self.buckets.values().flatten().cloned().collect();

        let successful_pages = all_results.iter().filter(|r| r.success).count();
        let total_content_length = all_results
            .iter()
            .filter(|r| r.success)
            .map(|r| r.content_length)
            .sum();
        let total_duration = all_results.iter().map(|r| r.duration).sum();

        CrawlSummary {
            seed_url: self.seed_url.clone(),
            backend: self.backend.clone(),
            max_depth_reached: self.buckets.keys().next_back().copied().unwrap_or(0),
            total_pages: all_results.len(),
            successful_pages,
            per_depth_counts: self
                .buckets
                .iter()
                .map(|(depth, results)| (*depth, results.len()))
                .collect(),
            all_results,
            total_content_length,
            total_duration,
            cancelled: self.cancelled,
        }
    }
}
