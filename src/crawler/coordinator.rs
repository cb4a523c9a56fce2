//! Crawler coordinator - level-by-level crawl orchestration
//!
//! This module contains the main crawl loop. Starting from a seed it:
//! - Selects each level's batch under the per-level cap
//! - Dispatches fetches with pacing and optional bounded concurrency
//! - Records every outcome and extracts follow-links from successful pages
//! - Assembles the next level and stops at the depth bound
//! - Honors cancellation and the optional stall guard

use crate::config::{validate_crawler_config, Config, CrawlerConfig};
use crate::crawler::fetcher::{FetchBackend, FetchFormat, FetchedPage};
use crate::crawler::parser::markdown_title;
use crate::crawler::scheduler::{select_batch, NextLevel, Scheduler, WorkItem};
use crate::links::{LinkExtractor, PatternLinkExtractor};
use crate::output::{CrawlSummary, ResultAggregator};
use crate::state::{PageResult, VisitedSet};
use crate::{CrawlError, FetchResult};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// What became of one dispatched fetch
enum FetchOutcome {
    Fetched(FetchResult<FetchedPage>),
    Stalled(Duration),
    Abandoned,
}

struct Dispatched {
    item: WorkItem,
    outcome: FetchOutcome,
    elapsed: Duration,
}

/// Result of crawling one level
struct LevelOutcome {
    next: NextLevel,
    cancelled: bool,
}

/// Main crawler coordinator structure
///
/// A coordinator holds configuration and collaborators only. Every call to
/// `run` gets a fresh visited set and aggregator, so one coordinator can run
/// several independent crawls, one after another or at the same time.
pub struct Coordinator {
    config: CrawlerConfig,
    backend: Arc<dyn FetchBackend>,
    extractor: Arc<dyn LinkExtractor>,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - Traversal limits and pacing
    /// * `backend` - Where pages are fetched from
    /// * `extractor` - How follow-links are found in fetched content
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(CrawlError::Config)` - The crawler config is invalid
    pub fn new(
        config: CrawlerConfig,
        backend: Arc<dyn FetchBackend>,
        extractor: Arc<dyn LinkExtractor>,
    ) -> Result<Self, CrawlError> {
        validate_crawler_config(&config)?;

        Ok(Self {
            config,
            backend,
            extractor,
            cancel: CancellationToken::new(),
        })
    }

    /// Attaches a stop signal shared with the caller
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle that stops this coordinator's crawls when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Crawls outward from `seed_url` and summarizes what was fetched
    ///
    /// # Process
    ///
    /// 1. The seed forms level 0
    /// 2. Each level dispatches at most `max_pages_per_level` unvisited URLs,
    ///    in order; the rest of the level is dropped
    /// 3. Successful pages below `max_depth` contribute their links to the
    ///    next level, unless visited or already queued
    /// 4. Failed fetches are recorded and contribute nothing
    /// 5. The loop ends when a level is empty, `max_depth` is passed or the
    ///    optional `max_total_pages` budget is spent; a level never dispatches
    ///    more than the budget has left
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSummary)` - Complete, or partial with `cancelled` set
    /// * `Err(CrawlError::BackendStalled)` - A fetch exceeded the stall guard
    pub async fn run(&self, seed_url: &str) -> Result<CrawlSummary, CrawlError> {
        let visited = VisitedSet::new();
        let scheduler = Scheduler::new(self.config.delay());
        let mut aggregator = ResultAggregator::new(seed_url, self.backend.name());
        let start_time = Instant::now();

        tracing::info!(
            "Starting crawl from {} (max depth {}, {} pages per level, {:?} between requests, backend '{}')",
            seed_url,
            self.config.max_depth,
            self.config.max_pages_per_level,
            scheduler.delay(),
            self.backend.name()
        );

        let mut current_level = vec![WorkItem::new(seed_url, 0)];
        let mut depth: u32 = 0;

        while !current_level.is_empty() && depth <= self.config.max_depth {
            if self.cancel.is_cancelled() {
                aggregator.mark_cancelled();
                break;
            }

            let mut cap = self.config.max_pages_per_level as usize;
            if let Some(budget) = self.config.max_total_pages {
                let remaining = (budget as usize).saturating_sub(aggregator.len());
                if remaining == 0 {
                    tracing::info!(
                        "Page budget of {} reached, stopping before depth {}",
                        budget,
                        depth
                    );
                    break;
                }
                cap = cap.min(remaining);
            }

            let queued = current_level.len();
            let batch = select_batch(current_level, &visited, cap);
            tracing::info!(
                "Depth {}: crawling {} of {} queued URLs",
                depth,
                batch.items.len(),
                queued
            );
            if batch.skipped > 0 {
                tracing::debug!(
                    "Depth {}: skipped {} URLs visited at an earlier depth",
                    depth,
                    batch.skipped
                );
            }
            if batch.dropped > 0 {
                tracing::debug!(
                    "Depth {}: dropped {} URLs over the level cap",
                    depth,
                    batch.dropped
                );
            }

            let level = self
                .crawl_level(batch.items, depth, &visited, &scheduler, &mut aggregator)
                .await?;

            tracing::info!(
                "Depth {} complete: {} pages recorded, {} URLs queued for depth {}",
                depth,
                aggregator.bucket(depth).len(),
                level.next.len(),
                level.next.depth()
            );

            if level.cancelled {
                tracing::info!("Crawl cancelled during depth {}", depth);
                aggregator.mark_cancelled();
                break;
            }

            current_level = level.next.into_items();
            depth = match depth.checked_add(1) {
                Some(next) => next,
                None => break,
            };
        }

        let summary = aggregator.summarize();
        tracing::info!(
            "Crawl from {} finished: {} pages ({} successful, max depth {}) in {:?}",
            seed_url,
            summary.total_pages,
            summary.successful_pages,
            summary.max_depth_reached,
            start_time.elapsed()
        );

        Ok(summary)
    }

    /// Dispatches one level's batch and processes results in dispatch order
    async fn crawl_level(
        &self,
        batch: Vec<WorkItem>,
        depth: u32,
        visited: &VisitedSet,
        scheduler: &Scheduler,
        aggregator: &mut ResultAggregator,
    ) -> Result<LevelOutcome, CrawlError> {
        let concurrency = (self.config.max_concurrent_fetches as usize)
            .clamp(1, (self.config.max_pages_per_level as usize).max(1));
        let backend = self.backend.as_ref();
        let cancel = &self.cancel;
        let stall_limit = self.config.stall_limit();

        let mut next = NextLevel::new(depth.saturating_add(1));
        let mut cancelled = false;

        // Pacing and visited marking happen in order before each dispatch;
        // `buffered` keeps results in that same order.
        let dispatched = stream::iter(batch)
            .then(move |item| async move {
                if !scheduler.wait_turn(cancel).await {
                    return None;
                }
                if !visited.mark(&item.url) {
                    tracing::debug!("Skipping {} (claimed elsewhere)", item.url);
                    return None;
                }
                tracing::debug!("Dispatching {} at depth {}", item.url, item.depth);
                Some(item)
            })
            .filter_map(futures::future::ready)
            .map(move |item| dispatch(backend, item, stall_limit, cancel, scheduler))
            .buffered(concurrency);
        futures::pin_mut!(dispatched);

        while let Some(Dispatched {
            item,
            outcome,
            elapsed,
        }) = dispatched.next().await
        {
            match outcome {
                FetchOutcome::Abandoned => {
                    tracing::debug!("Abandoned in-flight fetch of {}", item.url);
                    cancelled = true;
                }
                FetchOutcome::Stalled(timeout) => {
                    tracing::error!(
                        "Backend produced nothing for {} after {:?}, aborting crawl",
                        item.url,
                        timeout
                    );
                    return Err(CrawlError::BackendStalled {
                        url: item.url,
                        depth,
                        timeout,
                    });
                }
                FetchOutcome::Fetched(Ok(page)) => {
                    self.record_page(&item, page, elapsed, visited, aggregator, &mut next);
                }
                FetchOutcome::Fetched(Err(e)) => {
                    tracing::warn!("✗ [depth {}] {}: {}", depth, item.url, e);
                    aggregator.record(depth, PageResult::failure(item.url, depth, e, elapsed));
                }
            }
        }

        Ok(LevelOutcome {
            next,
            cancelled: cancelled || self.cancel.is_cancelled(),
        })
    }

    /// Records a successful fetch and queues its links
    fn record_page(
        &self,
        item: &WorkItem,
        page: FetchedPage,
        elapsed: Duration,
        visited: &VisitedSet,
        aggregator: &mut ResultAggregator,
        next: &mut NextLevel,
    ) {
        let depth = item.depth;
        let title = markdown_title(&page.content);
        let content_length = page.content.chars().count();

        tracing::info!(
            "✓ [depth {}] {} ({} chars, {:.2}s)",
            depth,
            title.as_deref().unwrap_or(&item.url),
            content_length,
            elapsed.as_secs_f64()
        );
        aggregator.record(
            depth,
            PageResult::success(item.url.clone(), depth, title, content_length, elapsed),
        );

        if depth >= self.config.max_depth {
            return;
        }

        match self.extractor.extract(&page.content, &item.url) {
            Ok(links) => {
                let found = links.len();
                let mut queued = 0;
                for link in links {
                    if next.push(link, visited) {
                        queued += 1;
                    }
                }
                tracing::debug!(
                    "Found {} links on {} ({} newly queued)",
                    found,
                    item.url,
                    queued
                );
            }
            Err(e) => {
                tracing::warn!("Link extraction failed for {}: {}", item.url, e);
            }
        }
    }
}

/// Runs one fetch, racing it against cancellation and the stall guard
async fn dispatch(
    backend: &dyn FetchBackend,
    item: WorkItem,
    stall_limit: Option<Duration>,
    cancel: &CancellationToken,
    scheduler: &Scheduler,
) -> Dispatched {
    let started = Instant::now();

    let outcome = {
        let fetch = backend.fetch(&item.url, FetchFormat::Markdown);
        match stall_limit {
            Some(limit) => tokio::select! {
                biased;
                _ = cancel.cancelled() => FetchOutcome::Abandoned,
                result = tokio::time::timeout(limit, fetch) => match result {
                    Ok(result) => FetchOutcome::Fetched(result),
                    Err(_) => FetchOutcome::Stalled(limit),
                },
            },
            None => tokio::select! {
                biased;
                _ = cancel.cancelled() => FetchOutcome::Abandoned,
                result = fetch => FetchOutcome::Fetched(result),
            },
        }
    };

    scheduler.touch();

    Dispatched {
        item,
        outcome,
        elapsed: started.elapsed(),
    }
}

/// Runs a complete crawl for one seed from a loaded configuration
///
/// Builds the configured backend and link extractor, then crawls.
///
/// # Example
///
/// ```no_run
/// use depth_ripple::config::load_config;
/// use depth_ripple::crawler::run_crawl;
/// use std::path::Path;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let summary = run_crawl(&config, "https://www.theguardian.com", CancellationToken::new()).await?;
/// println!("{} pages", summary.total_pages);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: &Config,
    seed_url: &str,
    cancel: CancellationToken,
) -> Result<CrawlSummary, CrawlError> {
    let backend = crate::crawler::build_backend(config)?;
    let extractor = Arc::new(PatternLinkExtractor::from_config(&config.links, seed_url)?);

    let coordinator =
        Coordinator::new(config.crawler.clone(), backend, extractor)?.with_cancellation(cancel);
    coordinator.run(seed_url).await
}
