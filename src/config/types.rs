use crate::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure for Depth-Ripple
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub links: LinksConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Traversal limits and pacing
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Deepest level that may be dispatched (the seed is depth 0)
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum number of pages dispatched per depth level
    #[serde(rename = "max-pages-per-level")]
    pub max_pages_per_level: u32,

    /// Delay between dispatches (seconds)
    #[serde(rename = "inter-request-delay", default)]
    pub inter_request_delay: f64,

    /// Fetches allowed in flight within one level
    #[serde(rename = "max-concurrent-fetches", default = "default_concurrency")]
    pub max_concurrent_fetches: u32,

    /// Stop once this many pages have been dispatched across all levels
    #[serde(rename = "max-total-pages", default)]
    pub max_total_pages: Option<u32>,

    /// Abort the run if a single fetch produces nothing for this long (seconds)
    #[serde(rename = "stall-timeout", default)]
    pub stall_timeout: Option<f64>,

    /// Seed URLs, one independent crawl each
    #[serde(default)]
    pub seeds: Vec<String>,
}

impl CrawlerConfig {
    /// Creates a sequential crawler config with no stall guard and no seeds
    pub fn new(max_depth: u32, max_pages_per_level: u32, inter_request_delay: f64) -> Self {
        Self {
            max_depth,
            max_pages_per_level,
            inter_request_delay,
            max_concurrent_fetches: default_concurrency(),
            max_total_pages: None,
            stall_timeout: None,
            seeds: Vec::new(),
        }
    }

    /// The inter-request delay as a duration
    ///
    /// Callers must validate first; invalid values collapse to zero.
    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.inter_request_delay).unwrap_or(Duration::ZERO)
    }

    /// The stall guard as a duration, if configured
    pub fn stall_limit(&self) -> Option<Duration> {
        self.stall_timeout
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}

/// Link extraction policy
#[derive(Debug, Clone, Deserialize)]
pub struct LinksConfig {
    /// Maximum follow-links taken from a single page
    #[serde(rename = "max-per-page", default = "default_links_per_page")]
    pub max_per_page: usize,

    /// Path shape a candidate must have to be followed
    #[serde(rename = "path-rule", default)]
    pub path_rule: PathRuleKind,

    /// Regexes matched against page content; empty means the dated-article
    /// preset for the seed's host
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            max_per_page: default_links_per_page(),
            path_rule: PathRuleKind::default(),
            patterns: Vec::new(),
        }
    }
}

/// Named path rules selectable from the config file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathRuleKind {
    #[default]
    DatedArticle,
    SameHost,
    Any,
}

/// Which fetch backend to bind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    #[default]
    Http,
    Render,
    Firecrawl,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Http => "http",
            BackendKind::Render => "render",
            BackendKind::Firecrawl => "firecrawl",
        }
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    /// Parses the same names the config file accepts
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(BackendKind::Http),
            "render" => Ok(BackendKind::Render),
            "firecrawl" => Ok(BackendKind::Firecrawl),
            other => Err(ConfigError::Validation(format!(
                "unknown backend '{}' (expected http, render or firecrawl)",
                other
            ))),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fetch backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,

    /// Per-fetch timeout (seconds)
    #[serde(default = "default_backend_timeout")]
    pub timeout: u64,

    /// Browser binary used by the render backend
    #[serde(default = "default_browser")]
    pub browser: String,

    /// Base URL of the scrape API
    #[serde(rename = "api-url", default = "default_api_url")]
    pub api_url: String,

    /// Environment variable holding the scrape API key
    #[serde(rename = "api-key-env", default = "default_api_key_env")]
    pub api_key_env: String,

    /// CSS selector the render backend waits for before reading the page
    #[serde(rename = "wait-for", default)]
    pub wait_for: Option<String>,
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            timeout: default_backend_timeout(),
            browser: default_browser(),
            api_url: default_api_url(),
            api_key_env: default_api_key_env(),
            wait_for: None,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Report output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Where to write the markdown summary, if anywhere
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,
}

fn default_concurrency() -> u32 {
    1
}

fn default_links_per_page() -> usize {
    5
}

fn default_backend_timeout() -> u64 {
    30
}

fn default_browser() -> String {
    "chromium".to_string()
}

fn default_api_url() -> String {
    "https://api.firecrawl.dev".to_string()
}

fn default_api_key_env() -> String {
    "FIRECRAWL_API_KEY".to_string()
}
