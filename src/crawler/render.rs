//! Headless browser backend
//!
//! Drives a Chromium-family browser over the DevTools protocol with
//! `chromiumoxide`. Each fetch opens a tab, lets the page's scripts run,
//! optionally waits for a CSS selector, and hands the rendered DOM to the same
//! HTML conversion as the HTTP backend.
//!
//! The browser is launched lazily on the first fetch and shared by every fetch
//! made through the backend afterwards.

use crate::config::{BackendConfig, UserAgentConfig};
use crate::crawler::fetcher::{page_from_html, FetchBackend, FetchFormat, FetchedPage};
use crate::{FetchError, FetchResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

/// How long to let scripts settle when no wait-for selector is configured
const DEFAULT_SETTLE: Duration = Duration::from_secs(2);

/// Interval between wait-for selector polls
const SELECTOR_POLL: Duration = Duration::from_millis(500);

/// Fetch backend that renders pages in a headless browser
pub struct RenderBackend {
    executable: String,
    timeout: Duration,
    settle: Duration,
    wait_for: Option<String>,
    user_agent: Option<String>,
    browser: OnceCell<Browser>,
}

impl RenderBackend {
    pub fn new(executable: impl Into<String>, timeout: Duration) -> Self {
        Self {
            executable: executable.into(),
            timeout,
            settle: DEFAULT_SETTLE,
            wait_for: None,
            user_agent: None,
            browser: OnceCell::new(),
        }
    }

    /// Builds the backend from the `[user-agent]` and `[backend]` sections
    ///
    /// Nothing is launched until the first fetch.
    pub fn from_config(user_agent: &UserAgentConfig, backend: &BackendConfig) -> Self {
        let render = Self::new(&backend.browser, backend.timeout())
            .with_user_agent(user_agent.header_value());
        match &backend.wait_for {
            Some(selector) => render.with_wait_for(selector),
            None => render,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Waits for `selector` to appear instead of a fixed settle delay
    pub fn with_wait_for(mut self, selector: impl Into<String>) -> Self {
        self.wait_for = Some(selector.into());
        self
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    fn browser_config(&self) -> Result<BrowserConfig, String> {
        let mut builder = BrowserConfig::builder()
            .chrome_executable(&self.executable)
            .request_timeout(self.timeout)
            .arg("--disable-gpu");
        if let Some(user_agent) = &self.user_agent {
            builder = builder.arg(format!("--user-agent={}", user_agent));
        }
        builder.build()
    }

    async fn browser(&self, url: &str) -> FetchResult<&Browser> {
        self.browser
            .get_or_try_init(|| async {
                let launch_error = |message: String| FetchError::Render {
                    url: url.to_string(),
                    message: format!("failed to launch '{}': {}", self.executable, message),
                };

                let config = self.browser_config().map_err(launch_error)?;
                let (browser, mut handler) = Browser::launch(config)
                    .await
                    .map_err(|e| launch_error(e.to_string()))?;

                tokio::spawn(async move {
                    while let Some(event) = handler.next().await {
                        if let Err(e) = event {
                            tracing::debug!("Browser handler event error: {}", e);
                            break;
                        }
                    }
                });

                tracing::info!("Launched headless browser '{}'", self.executable);
                Ok(browser)
            })
            .await
    }

    /// Loads `url` in a new tab and returns the final URL and rendered DOM
    async fn render(&self, browser: &Browser, url: &str) -> FetchResult<(String, String)> {
        let render_error = |message: String| FetchError::Render {
            url: url.to_string(),
            message,
        };

        let page = browser
            .new_page(url)
            .await
            .map_err(|e| render_error(format!("navigation failed: {}", e)))?;

        self.settle(&page)
            .await
            .map_err(|selector| render_error(format!("selector '{}' never appeared", selector)))?;

        let html = page
            .content()
            .await
            .map_err(|e| render_error(format!("content retrieval failed: {}", e)))?;
        let final_url = page
            .url()
            .await
            .map_err(|e| render_error(format!("content retrieval failed: {}", e)))?
            .unwrap_or_else(|| url.to_string());

        if let Err(e) = page.close().await {
            tracing::debug!("Failed to close tab for {}: {}", url, e);
        }

        Ok((final_url, html))
    }

    /// Gives the page time to run its scripts
    ///
    /// Returns the selector as the error when it never shows up.
    async fn settle(&self, page: &Page) -> Result<(), String> {
        let Some(selector) = &self.wait_for else {
            tokio::time::sleep(self.settle).await;
            return Ok(());
        };

        let deadline = Instant::now() + self.timeout;
        loop {
            if page.find_element(selector.as_str()).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(selector.clone());
            }
            tokio::time::sleep(SELECTOR_POLL).await;
        }
    }
}

#[async_trait]
impl FetchBackend for RenderBackend {
    fn name(&self) -> &str {
        "render"
    }

    async fn fetch(&self, url: &str, format: FetchFormat) -> FetchResult<FetchedPage> {
        tracing::debug!(browser = %self.executable, url = %url, "Rendering page");
        let started = Instant::now();

        let rendered = tokio::time::timeout(self.timeout, async {
            let browser = self.browser(url).await?;
            self.render(browser, url).await
        })
        .await
        .map_err(|_| FetchError::Timeout {
            url: url.to_string(),
        })??;

        let (final_url, html) = rendered;
        if html.trim().is_empty() {
            return Err(FetchError::Render {
                url: url.to_string(),
                message: "browser produced an empty DOM".to_string(),
            });
        }

        Ok(page_from_html(&final_url, &html, format)?
            .with_meta("renderer", &self.executable)
            .with_meta("render_time_ms", started.elapsed().as_millis()))
    }
}
