use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// URLs already dispatched to a backend during one crawl run
///
/// The set only grows. Membership is the sole deduplication mechanism: a URL
/// present here is never queued or dispatched again. `mark` is an atomic
/// test-and-set so concurrent fetch workers can never claim the same URL twice.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: Mutex<HashSet<String>>,
}

impl VisitedSet {
    /// Creates an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a URL for dispatch
    ///
    /// Returns `true` if the URL was not yet visited (and is now), `false` if
    /// some earlier dispatch already claimed it.
    pub fn mark(&self, url: &str) -> bool {
        let mut urls = self.lock();
        if urls.contains(url) {
            return false;
        }
        urls.insert(url.to_string())
    }

    /// Returns true if the URL has been dispatched in this run
    pub fn contains(&self, url: &str) -> bool {
        self.lock().contains(url)
    }

    /// Number of dispatched URLs
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if nothing has been dispatched yet
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A poisoned lock still holds a valid set; inserts are single operations.
    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.urls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
