use crate::config::types::{BackendConfig, Config, CrawlerConfig, LinksConfig, UserAgentConfig};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Upper bound on the per-level page cap
const MAX_PAGES_PER_LEVEL: u32 = 1000;

/// Upper bound on the inter-request delay (seconds)
const MAX_DELAY_SECS: f64 = 3600.0;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_seeds(&config.crawler.seeds)?;
    validate_links_config(&config.links)?;
    validate_backend_config(&config.backend)?;
    validate_user_agent_config(&config.user_agent)?;
    Ok(())
}

/// Validates traversal limits and pacing
///
/// The coordinator calls this before the first fetch, so a crawl built from a
/// hand-made config is held to the same rules as one loaded from disk.
pub fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    // max_depth >= 0 is always true for u32, so no check needed

    if config.max_pages_per_level < 1 || config.max_pages_per_level > MAX_PAGES_PER_LEVEL {
        return Err(ConfigError::Validation(format!(
            "max_pages_per_level must be between 1 and {}, got {}",
            MAX_PAGES_PER_LEVEL, config.max_pages_per_level
        )));
    }

    if !config.inter_request_delay.is_finite()
        || config.inter_request_delay < 0.0
        || config.inter_request_delay > MAX_DELAY_SECS
    {
        return Err(ConfigError::Validation(format!(
            "inter_request_delay must be between 0 and {} seconds, got {}",
            MAX_DELAY_SECS, config.inter_request_delay
        )));
    }

    if config.max_concurrent_fetches < 1
        || config.max_concurrent_fetches > config.max_pages_per_level
    {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_fetches must be between 1 and max_pages_per_level ({}), got {}",
            config.max_pages_per_level, config.max_concurrent_fetches
        )));
    }

    if config.max_total_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_total_pages must be >= 1 when set".to_string(),
        ));
    }

    if let Some(stall) = config.stall_timeout {
        if !stall.is_finite() || stall <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "stall_timeout must be a positive number of seconds, got {}",
                stall
            )));
        }
    }

    Ok(())
}

/// Validates seed URLs
fn validate_seeds(seeds: &[String]) -> Result<(), ConfigError> {
    for seed in seeds {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use HTTP or HTTPS",
                seed
            )));
        }
    }

    Ok(())
}

/// Validates link extraction policy
fn validate_links_config(config: &LinksConfig) -> Result<(), ConfigError> {
    if config.max_per_page < 1 {
        return Err(ConfigError::Validation(
            "links.max_per_page must be >= 1".to_string(),
        ));
    }

    for pattern in &config.patterns {
        Regex::new(pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!("'{}' does not compile: {}", pattern, e))
        })?;
    }

    Ok(())
}

/// Validates backend settings
fn validate_backend_config(config: &BackendConfig) -> Result<(), ConfigError> {
    if config.timeout < 1 {
        return Err(ConfigError::Validation(
            "backend.timeout must be >= 1 second".to_string(),
        ));
    }

    if config.browser.trim().is_empty() {
        return Err(ConfigError::Validation(
            "backend.browser cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.api_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid backend.api_url: {}", e)))?;

    if config.api_key_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "backend.api_key_env cannot be empty".to_string(),
        ));
    }

    if config
        .wait_for
        .as_deref()
        .is_some_and(|selector| selector.trim().is_empty())
    {
        return Err(ConfigError::Validation(
            "backend.wait_for cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    // Must contain exactly one @ with text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
