//! Hosted scrape API backend
//!
//! Talks to the Firecrawl v1 scrape endpoint, which fetches and renders the
//! page on its side and returns markdown, HTML, or JSON extracted by a
//! language model against a schema.

use crate::config::{BackendConfig, UserAgentConfig};
use crate::crawler::fetcher::{build_http_client, FetchBackend, FetchFormat, FetchedPage};
use crate::{FetchError, FetchResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

const SCRAPE_PATH: &str = "/v1/scrape";

const EXTRACTION_PROMPT: &str =
    "Extract the page title, a short summary of the main content and a few keywords.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: [&'static str; 1],
    only_main_content: bool,
    /// Milliseconds
    timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    json_options: Option<JsonOptions>,
}

#[derive(Debug, Serialize)]
struct JsonOptions {
    schema: serde_json::Value,
    prompt: &'static str,
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ScrapeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    json: Option<serde_json::Value>,
    #[serde(default)]
    metadata: BTreeMap<String, serde_json::Value>,
}

fn structured_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "summary": { "type": "string" },
            "keywords": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["title", "summary"]
    })
}

/// Fetch backend backed by the Firecrawl scrape API
#[derive(Debug, Clone)]
pub struct FirecrawlBackend {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    api_key_env: String,
    timeout: Duration,
}

impl FirecrawlBackend {
    /// Creates a backend with no API key; fetches fail until one is set
    pub fn new(client: Client, api_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            api_key_env: "FIRECRAWL_API_KEY".to_string(),
            timeout,
        }
    }

    /// Builds the backend from config, reading the key from the configured
    /// environment variable
    pub fn from_config(
        user_agent: &UserAgentConfig,
        backend: &BackendConfig,
    ) -> Result<Self, reqwest::Error> {
        // The API does its own fetching, so allow headroom over the page timeout.
        let client = build_http_client(user_agent, backend.timeout() * 2)?;
        let api_key = std::env::var(&backend.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());

        if api_key.is_none() {
            tracing::warn!(
                "{} is not set; every Firecrawl fetch will fail",
                backend.api_key_env
            );
        }

        let mut firecrawl = Self::new(client, &backend.api_url, backend.timeout());
        firecrawl.api_key = api_key;
        firecrawl.api_key_env = backend.api_key_env.clone();
        Ok(firecrawl)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn request_body<'a>(&self, url: &'a str, format: FetchFormat) -> ScrapeRequest<'a> {
        let (formats, json_options) = match format {
            FetchFormat::Markdown => (["markdown"], None),
            FetchFormat::Html => (["html"], None),
            FetchFormat::Structured => (
                ["json"],
                Some(JsonOptions {
                    schema: structured_schema(),
                    prompt: EXTRACTION_PROMPT,
                }),
            ),
        };

        ScrapeRequest {
            url,
            formats,
            only_main_content: true,
            timeout: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            json_options,
        }
    }
}

#[async_trait]
impl FetchBackend for FirecrawlBackend {
    fn name(&self) -> &str {
        "firecrawl"
    }

    async fn fetch(&self, url: &str, format: FetchFormat) -> FetchResult<FetchedPage> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| FetchError::MissingApiKey(self.api_key_env.clone()))?;

        let endpoint = format!("{}{}", self.api_url, SCRAPE_PATH);
        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(api_key)
            .json(&self.request_body(url, format))
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let parsed: ScrapeResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => {
                return Err(FetchError::Backend {
                    url: url.to_string(),
                    message: format!("unreadable scrape response: {}", e),
                })
            }
            Err(_) => {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                })
            }
        };

        if !status.is_success() || !parsed.success {
            return Err(FetchError::Backend {
                url: url.to_string(),
                message: format!(
                    "scrape API returned {}: {}",
                    status.as_u16(),
                    parsed.error.as_deref().unwrap_or("request was not successful")
                ),
            });
        }

        let data = parsed.data.ok_or_else(|| FetchError::Backend {
            url: url.to_string(),
            message: "scrape response carried no data".to_string(),
        })?;

        let content = match format {
            FetchFormat::Markdown => data.markdown,
            FetchFormat::Html => data.html,
            FetchFormat::Structured => data.json.map(|json| json.to_string()),
        }
        .ok_or_else(|| FetchError::Backend {
            url: url.to_string(),
            message: format!("scrape response had no {} content", format.as_str()),
        })?;

        let source_url = data
            .metadata
            .get("sourceURL")
            .and_then(|v| v.as_str())
            .unwrap_or(url)
            .to_string();

        let mut page = FetchedPage::new(source_url, content).with_meta("format", format.as_str());
        for (key, value) in data.metadata {
            let value = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            page.metadata.insert(key, value);
        }

        Ok(page)
    }
}
