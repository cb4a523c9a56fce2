//! Crawler module for page fetching and crawl orchestration
//!
//! This module contains the core crawling logic, including:
//! - The fetch backend contract and its HTTP, browser (`render` feature) and
//!   API variants
//! - HTML to markdown conversion and the title rule
//! - Level batching and request pacing
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod firecrawl;
mod parser;
#[cfg(feature = "render")]
mod render;
mod scheduler;

pub use coordinator::{run_crawl, Coordinator};
pub use fetcher::{build_http_client, FetchBackend, FetchFormat, FetchedPage, HttpBackend};
pub use firecrawl::FirecrawlBackend;
pub use parser::{markdown_title, parse_html, ParsedPage, MAX_TITLE_CHARS};
#[cfg(feature = "render")]
pub use render::RenderBackend;
pub use scheduler::{select_batch, LevelBatch, NextLevel, Scheduler, WorkItem};

use crate::config::{BackendKind, Config};
use crate::CrawlError;
use std::sync::Arc;

/// Builds the fetch backend selected by `[backend] kind`
///
/// # Arguments
///
/// * `config` - The full configuration (user agent and backend sections are used)
///
/// # Returns
///
/// * `Ok(Arc<dyn FetchBackend>)` - Ready to inject into a `Coordinator`
/// * `Err(CrawlError)` - The HTTP client could not be built, or the render
///   backend was requested from a build without the `render` feature
pub fn build_backend(config: &Config) -> Result<Arc<dyn FetchBackend>, CrawlError> {
    let backend: Arc<dyn FetchBackend> = match config.backend.kind {
        BackendKind::Http => Arc::new(HttpBackend::from_config(
            &config.user_agent,
            &config.backend,
        )?),
        #[cfg(feature = "render")]
        BackendKind::Render => Arc::new(RenderBackend::from_config(
            &config.user_agent,
            &config.backend,
        )),
        #[cfg(not(feature = "render"))]
        BackendKind::Render => {
            return Err(crate::ConfigError::Validation(
                "the render backend needs the `render` feature".to_string(),
            )
            .into())
        }
        BackendKind::Firecrawl => Arc::new(FirecrawlBackend::from_config(
            &config.user_agent,
            &config.backend,
        )?),
    };

    tracing::debug!("Using '{}' fetch backend", backend.name());
    Ok(backend)
}
