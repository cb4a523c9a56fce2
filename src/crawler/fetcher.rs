//! Fetch backend contract and the HTTP backend
//!
//! This module defines the capability the coordinator crawls through:
//! - `FetchBackend`, the async "fetch one URL" trait
//! - `FetchFormat` and `FetchedPage`, its request and response shapes
//! - `HttpBackend`, a plain GET followed by HTML to markdown conversion
//!
//! Backends carry no crawl state: no deduplication, no pacing, no retries.
//! Failures come back as `FetchError` values and never panic.

use crate::config::{BackendConfig, UserAgentConfig};
use crate::crawler::parser::{markdown_title, parse_html};
use crate::{FetchError, FetchResult};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// Characters of markdown kept as the structured summary
const SUMMARY_CHARS: usize = 200;

/// Links kept in a structured document
const STRUCTURED_LINKS: usize = 5;

/// Shape of the content a backend should return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchFormat {
    /// Markdown text, the format the coordinator crawls on
    #[default]
    Markdown,

    /// Raw HTML
    Html,

    /// A JSON document with title, summary, keywords and links
    Structured,
}

impl FetchFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchFormat::Markdown => "markdown",
            FetchFormat::Html => "html",
            FetchFormat::Structured => "structured",
        }
    }
}

/// Content returned by a backend for one URL
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetchedPage {
    /// The URL the content was finally served from
    pub url: String,

    /// Page content in the requested format
    pub content: String,

    /// Backend-specific extras (title, status code, content type, ...)
    pub metadata: BTreeMap<String, String>,
}

impl FetchedPage {
    pub fn new(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Adds one metadata entry
    pub fn with_meta(mut self, key: &str, value: impl ToString) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// Fetches a single URL and returns its content
///
/// Implementations must be safe to call from several tasks at once. The
/// coordinator decides how many calls are in flight.
#[async_trait]
pub trait FetchBackend: Send + Sync {
    /// Short name used in logs and summaries
    fn name(&self) -> &str;

    /// Fetches `url` and returns its content in `format`
    async fn fetch(&self, url: &str, format: FetchFormat) -> FetchResult<FetchedPage>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Whole-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use depth_ripple::config::UserAgentConfig;
/// use depth_ripple::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "DepthRipple".to_string(),
///     crawler_version: "0.1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Converts an HTML document into a page in the requested format
///
/// Shared by every backend that ends up holding raw HTML. `page_url` is the
/// base for resolving relative links.
pub(crate) fn page_from_html(
    page_url: &str,
    html: &str,
    format: FetchFormat,
) -> FetchResult<FetchedPage> {
    let base = Url::parse(page_url).map_err(|e| FetchError::Backend {
        url: page_url.to_string(),
        message: format!("cannot use fetched URL as a base: {}", e),
    })?;

    let parsed = parse_html(html, &base);
    let title = parsed
        .title
        .clone()
        .or_else(|| markdown_title(&parsed.markdown));

    let content = match format {
        FetchFormat::Markdown => parsed.markdown.clone(),
        FetchFormat::Html => html.to_string(),
        FetchFormat::Structured => {
            let summary: String = parsed.markdown.chars().take(SUMMARY_CHARS).collect();
            let links: Vec<&String> = parsed.links.iter().take(STRUCTURED_LINKS).collect();
            serde_json::json!({
                "title": title,
                "summary": summary,
                "keywords": [],
                "links": links,
            })
            .to_string()
        }
    };

    let mut page = FetchedPage::new(page_url, content)
        .with_meta("links_count", parsed.links.len())
        .with_meta("format", format.as_str());
    if let Some(title) = title {
        page = page.with_meta("title", title);
    }

    Ok(page)
}

/// Plain HTTP GET backend
///
/// HTML responses are converted with the `scraper`-based parser. Other
/// textual responses (plain text, markdown, JSON) are passed through
/// untouched; binary content is reported as a failure.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
}

impl HttpBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds the backend from the `[user-agent]` and `[backend]` sections
    pub fn from_config(
        user_agent: &UserAgentConfig,
        backend: &BackendConfig,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(user_agent, backend.timeout())?))
    }
}

#[async_trait]
impl FetchBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, url: &str, format: FetchFormat) -> FetchResult<FetchedPage> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let page = if content_type.is_empty() || content_type.contains("html") {
            page_from_html(&final_url, &body, format)?
        } else if is_textual(&content_type) {
            tracing::debug!("Passing through {} content from {}", content_type, final_url);
            FetchedPage::new(&final_url, body).with_meta("format", "raw")
        } else {
            return Err(FetchError::Backend {
                url: url.to_string(),
                message: format!("unsupported content type '{}'", content_type),
            });
        };

        Ok(page
            .with_meta("status_code", status.as_u16())
            .with_meta("url", &final_url)
            .with_meta("content_type", content_type))
    }
}

fn is_textual(content_type: &str) -> bool {
    content_type.starts_with("text/")
        || content_type.contains("json")
        || content_type.contains("xml")
        || content_type.contains("markdown")
}
