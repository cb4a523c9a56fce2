use crate::config::LinksConfig;
use crate::links::{LinkExtractor, PathRule};
use crate::{ConfigError, ExtractionError};
use regex::Regex;
use std::collections::HashSet;
use url::Url;

/// Default number of follow-links taken from one page
pub const DEFAULT_MAX_LINKS: usize = 5;

/// Markdown link text: escaped brackets and one level of nesting allowed
const LINK_TEXT: &str = r"\[(?:[^\[\]\\]|\\.|\[[^\]]*\])*\]";

/// Rest of a bare article URL; never ends on sentence punctuation
const BARE_PATH: &str = r"[a-zA-Z0-9/_%.?=&~+-]*[a-zA-Z0-9/_%=&~+-]";

/// Regex-driven link extractor
///
/// Each pattern is run over the raw page content. When a pattern has a named
/// group `url` that group is the candidate, otherwise the whole match is.
/// Candidates are resolved against the page URL, restricted to http(s),
/// filtered through the path rule, deduplicated in order of first appearance
/// in the content, and capped at `max_links`.
#[derive(Debug, Clone)]
pub struct PatternLinkExtractor {
    patterns: Vec<Regex>,
    rule: PathRule,
    max_links: usize,
}

impl PatternLinkExtractor {
    pub fn new(patterns: Vec<Regex>, rule: PathRule) -> Self {
        Self {
            patterns,
            rule,
            max_links: DEFAULT_MAX_LINKS,
        }
    }

    /// Compiles string patterns into an extractor
    pub fn from_patterns<S: AsRef<str>>(
        patterns: &[S],
        rule: PathRule,
    ) -> Result<Self, ConfigError> {
        let compiled = patterns
            .iter()
            .map(|p| {
                Regex::new(p.as_ref()).map_err(|e| {
                    ConfigError::InvalidPattern(format!("'{}' does not compile: {}", p.as_ref(), e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(compiled, rule))
    }

    /// Article links for a single news-style host (`host` or `host:port`)
    ///
    /// Matches bare article URLs, markdown links pointing at the host, and
    /// root-relative markdown links, keeping only dated article paths.
    pub fn dated_articles(host: &str) -> Result<Self, ConfigError> {
        let host = regex::escape(host);
        let patterns = [
            format!(r"https?://{host}/[a-zA-Z-]+/\d{{4}}/{BARE_PATH}"),
            format!(r"{LINK_TEXT}\((?P<url>https?://{host}/[^)\s]+)\)"),
            format!(r"{LINK_TEXT}\((?P<url>/[^)\s]+)\)"),
        ];

        Self::from_patterns(&patterns, PathRule::DatedArticle)
    }

    /// Builds the extractor described by the `[links]` config section
    ///
    /// With no explicit patterns the dated-article preset for the seed's host
    /// is used; the configured path rule always wins.
    pub fn from_config(config: &LinksConfig, seed_url: &str) -> Result<Self, ConfigError> {
        let extractor = if config.patterns.is_empty() {
            let seed = Url::parse(seed_url)
                .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed '{}': {}", seed_url, e)))?;
            let host = seed.host_str().ok_or_else(|| {
                ConfigError::InvalidUrl(format!("Seed '{}' has no host", seed_url))
            })?;
            match seed.port() {
                Some(port) => Self::dated_articles(&format!("{}:{}", host, port))?,
                None => Self::dated_articles(host)?,
            }
        } else {
            Self::from_patterns(&config.patterns, PathRule::DatedArticle)?
        };

        Ok(extractor
            .with_rule(config.path_rule.into())
            .with_max_links(config.max_per_page))
    }

    pub fn with_rule(mut self, rule: PathRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_max_links(mut self, max_links: usize) -> Self {
        self.max_links = max_links;
        self
    }

    pub fn max_links(&self) -> usize {
        self.max_links
    }

    /// Raw candidate strings in order of their position in the content
    ///
    /// Matches of patterns without a `url` group are dropped when they lie
    /// inside a match of a pattern that has one, so a bare URL pattern never
    /// yields a second, shorter copy of a markdown link target.
    fn raw_candidates<'a>(&self, content: &'a str) -> Vec<&'a str> {
        let mut grouped: Vec<(usize, &'a str)> = Vec::new();
        let mut link_spans: Vec<(usize, usize)> = Vec::new();
        let mut bare: Vec<(usize, usize, &'a str)> = Vec::new();

        for pattern in &self.patterns {
            let has_url_group = pattern.capture_names().any(|name| name == Some("url"));
            for caps in pattern.captures_iter(content) {
                let Some(whole) = caps.get(0) else {
                    continue;
                };
                match caps.name("url") {
                    Some(m) => {
                        grouped.push((m.start(), m.as_str()));
                        link_spans.push((whole.start(), whole.end()));
                    }
                    None if has_url_group => {}
                    None => bare.push((whole.start(), whole.end(), whole.as_str())),
                }
            }
        }

        let mut found = grouped;
        found.extend(
            bare.into_iter()
                .filter(|(start, end, _)| {
                    !link_spans
                        .iter()
                        .any(|(span_start, span_end)| span_start <= start && end <= span_end)
                })
                .map(|(start, _, s)| (start, s)),
        );

        found.sort_by_key(|(start, _)| *start);
        found.into_iter().map(|(_, s)| s).collect()
    }
}

impl LinkExtractor for PatternLinkExtractor {
    fn extract(&self, content: &str, base_url: &str) -> Result<Vec<String>, ExtractionError> {
        if content.is_empty() || self.max_links == 0 {
            return Ok(Vec::new());
        }

        // An unparsable base only prevents resolving relative candidates.
        let base = Url::parse(base_url).ok();

        let mut seen = HashSet::new();
        let mut links = Vec::new();
        let mut unresolved_relative = false;

        for raw in self.raw_candidates(content) {
            let resolved = match &base {
                Some(base) => base.join(raw),
                None => Url::parse(raw),
            };
            let mut candidate = match resolved {
                Ok(candidate) => candidate,
                Err(url::ParseError::RelativeUrlWithoutBase) => {
                    unresolved_relative = true;
                    continue;
                }
                Err(_) => {
                    tracing::trace!("Skipping unresolvable link candidate: {}", raw);
                    continue;
                }
            };

            if candidate.scheme() != "http" && candidate.scheme() != "https" {
                continue;
            }
            candidate.set_fragment(None);

            if !self.rule.matches(&candidate, base.as_ref()) {
                continue;
            }

            let candidate = candidate.to_string();
            if seen.insert(candidate.clone()) {
                links.push(candidate);
                if links.len() >= self.max_links {
                    break;
                }
            }
        }

        if links.is_empty() && unresolved_relative {
            return Err(ExtractionError::InvalidBaseUrl(base_url.to_string()));
        }

        Ok(links)
    }
}
