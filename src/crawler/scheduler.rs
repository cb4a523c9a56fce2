//! Level scheduling and request pacing
//!
//! This module handles:
//! - The `WorkItem` unit of work (a URL and the depth it was found at)
//! - Assembling the next level without duplicates
//! - Choosing which items of a level are dispatched under the per-level cap
//! - Enforcing the inter-request delay between dispatches

use crate::state::VisitedSet;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A URL waiting to be fetched at a given depth
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub url: String,
    pub depth: u32,
}

impl WorkItem {
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }
}

/// Accumulates the candidates discovered while a level is being crawled
///
/// A candidate is queued at most once, and never if it was already visited
/// when it was offered. Insertion order is discovery order.
#[derive(Debug, Default)]
pub struct NextLevel {
    depth: u32,
    items: Vec<WorkItem>,
    queued: HashSet<String>,
}

impl NextLevel {
    pub fn new(depth: u32) -> Self {
        Self {
            depth,
            items: Vec::new(),
            queued: HashSet::new(),
        }
    }

    /// Offers a candidate URL
    ///
    /// # Returns
    ///
    /// `true` if the URL was queued, `false` if it was visited or already queued
    pub fn push(&mut self, url: String, visited: &VisitedSet) -> bool {
        if visited.contains(&url) || self.queued.contains(&url) {
            return false;
        }
        self.queued.insert(url.clone());
        self.items.push(WorkItem::new(url, self.depth));
        true
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<WorkItem> {
        self.items
    }
}

/// Items of a level chosen for dispatch, plus what was left behind
#[derive(Debug, Default)]
pub struct LevelBatch {
    /// Items to dispatch, in level order
    pub items: Vec<WorkItem>,

    /// Items skipped because an earlier level already visited them
    pub skipped: usize,

    /// Items dropped because the level cap was reached
    pub dropped: usize,
}

/// Chooses the items of a level that will be dispatched
///
/// Items are taken in order. Visited URLs are skipped and do not count
/// against `cap`; once `cap` items are chosen the remainder is dropped and
/// never carried to a later level.
pub fn select_batch(level: Vec<WorkItem>, visited: &VisitedSet, cap: usize) -> LevelBatch {
    let mut batch = LevelBatch::default();
    let mut chosen = HashSet::new();

    for item in level {
        if visited.contains(&item.url) || chosen.contains(&item.url) {
            tracing::debug!("Skipping already visited {}", item.url);
            batch.skipped += 1;
            continue;
        }
        if batch.items.len() >= cap {
            batch.dropped += 1;
            continue;
        }
        chosen.insert(item.url.clone());
        batch.items.push(item);
    }

    batch
}

/// Paces dispatches so that at least `delay` separates them
///
/// The gap is measured from the later of the previous dispatch start and the
/// previous completion (`touch`). With one fetch in flight at a time this
/// means a full delay after every page, whatever its outcome.
#[derive(Debug)]
pub struct Scheduler {
    delay: Duration,
    last: Mutex<Option<Instant>>,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `delay` - Minimum gap between dispatches
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Waits until the next dispatch may start
    ///
    /// The slot is reserved before sleeping, so concurrent callers are spread
    /// out by `delay` rather than released together.
    ///
    /// # Returns
    ///
    /// * `true` - The caller may dispatch now
    /// * `false` - The crawl was cancelled; the caller must not dispatch
    pub async fn wait_turn(&self, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }

        let slot = {
            let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            let slot = match *last {
                Some(previous) => (previous + self.delay).max(now),
                None => now,
            };
            *last = Some(slot);
            slot
        };

        if slot <= Instant::now() {
            return true;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep_until(slot) => true,
        }
    }

    /// Records that a fetch just finished
    pub fn touch(&self) {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        *last = Some(last.map_or(now, |previous| previous.max(now)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(urls: &[&str]) -> Vec<WorkItem> {
        urls.iter().map(|u| WorkItem::new(*u, 1)).collect()
    }

    #[test]
    fn test_next_level_dedups_queued_and_visited() {
        let visited = VisitedSet::new();
        visited.mark("https://example.com/seen");

        let mut next = NextLevel::new(2);
        assert!(next.push("https://example.com/a".to_string(), &visited));
        assert!(!next.push("https://example.com/a".to_string(), &visited));
        assert!(!next.push("https://example.com/seen".to_string(), &visited));
        assert!(next.push("https://example.com/b".to_string(), &visited));

        assert_eq!(next.len(), 2);
        assert_eq!(next.depth(), 2);
        assert_eq!(
            next.into_items(),
            vec![
                WorkItem::new("https://example.com/a", 2),
                WorkItem::new("https://example.com/b", 2)
            ]
        );
    }

    #[test]
    fn test_select_batch_caps_and_drops() {
        let visited = VisitedSet::new();
        let batch = select_batch(level(&["a", "b", "c", "d"]), &visited, 2);

        assert_eq!(batch.items, level(&["a", "b"]));
        assert_eq!(batch.dropped, 2);
        assert_eq!(batch.skipped, 0);
    }

    #[test]
    fn test_select_batch_skips_visited_without_counting() {
        let visited = VisitedSet::new();
        visited.mark("a");
        visited.mark("c");

        let batch = select_batch(level(&["a", "b", "c", "d", "e"]), &visited, 2);

        assert_eq!(batch.items, level(&["b", "d"]));
        assert_eq!(batch.skipped, 2);
        assert_eq!(batch.dropped, 1);
    }

    #[test]
    fn test_select_batch_empty_level() {
        let batch = select_batch(Vec::new(), &VisitedSet::new(), 3);
        assert!(batch.items.is_empty());
        assert_eq!(batch.skipped + batch.dropped, 0);
    }

    #[tokio::test]
    async fn test_first_turn_is_immediate() {
        let scheduler = Scheduler::new(Duration::from_secs(60));
        let cancel = CancellationToken::new();

        let start = Instant::now();
        assert!(scheduler.wait_turn(&cancel).await);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_turns_are_spaced_by_delay() {
        let scheduler = Scheduler::new(Duration::from_millis(50));
        let cancel = CancellationToken::new();

        let start = Instant::now();
        assert!(scheduler.wait_turn(&cancel).await);
        assert!(scheduler.wait_turn(&cancel).await);
        assert!(scheduler.wait_turn(&cancel).await);
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_touch_restarts_the_delay() {
        let scheduler = Scheduler::new(Duration::from_millis(50));
        let cancel = CancellationToken::new();

        assert!(scheduler.wait_turn(&cancel).await);
        tokio::time::sleep(Duration::from_millis(40)).await;
        scheduler.touch();

        let after_touch = Instant::now();
        assert!(scheduler.wait_turn(&cancel).await);
        assert!(after_touch.elapsed() >= Duration::from_millis(45));
    }

    #[tokio::test]
    async fn test_zero_delay_never_sleeps() {
        let scheduler = Scheduler::new(Duration::ZERO);
        let cancel = CancellationToken::new();

        let start = Instant::now();
        for _ in 0..10 {
            assert!(scheduler.wait_turn(&cancel).await);
            scheduler.touch();
        }
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_cancelled_turn_is_refused() {
        let scheduler = Scheduler::new(Duration::from_secs(60));
        let cancel = CancellationToken::new();

        assert!(scheduler.wait_turn(&cancel).await);

        let waiter = {
            let cancel = cancel.clone();
            async move { scheduler.wait_turn(&cancel).await }
        };
        let canceller = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        };

        let start = Instant::now();
        let (granted, ()) = tokio::join!(waiter, canceller);
        assert!(!granted);
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
