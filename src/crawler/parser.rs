//! HTML parser for converting fetched pages into markdown
//!
//! Markdown conversion is done by `htmd`. Before conversion every followable
//! `href` is rewritten to an absolute URL whose parentheses and whitespace are
//! percent-encoded, so `[text](url)` targets in the output are unambiguous
//! and can be read back by the link extractor.
//!
//! `scraper` is still used for the `<title>` and for the list of links.

use htmd::options::{BulletListMarker, HeadingStyle, Options};
use htmd::HtmlToMarkdown;
use regex::{Captures, Regex};
use scraper::{Html, Selector};
use url::Url;

/// Titles longer than this are cut (in characters)
pub const MAX_TITLE_CHARS: usize = 80;

/// Elements whose content never reaches the markdown
const SKIPPED_TAGS: [&str; 8] = [
    "script", "style", "noscript", "template", "head", "title", "svg", "iframe",
];

/// `href` attributes, double- or single-quoted
const HREF_PATTERN: &str = r#"(?i)(\bhref\s*=\s*)(?:"([^"]*)"|'([^']*)')"#;

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Markdown rendering of the page body
    pub markdown: String,

    /// All followable links found on the page (absolute URLs, document order)
    pub links: Vec<String>,
}

/// Parses HTML content into markdown plus metadata
///
/// # Link Rules
///
/// **Rendered as links:**
/// - `<a href="...">` resolving to an http(s) URL, made absolute against
///   `base_url`
///
/// **Left untouched:**
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - Fragment-only links (same page anchors)
///
/// **Dropped entirely:**
/// - `<script>`, `<style>`, `<noscript>`, `<template>`, `<svg>`, `<iframe>`
///
/// # Example
///
/// ```
/// use depth_ripple::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><h1>Hello</h1><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert!(parsed.markdown.starts_with("# Hello"));
/// assert!(parsed.markdown.contains("[Link](https://example.com/page)"));
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        markdown: to_markdown(html, &document, base_url),
        links: extract_links(&document, base_url),
    }
}

/// Title rule for markdown content
///
/// The first line starting with `# ` whose text is non-empty, trimmed and cut
/// to `MAX_TITLE_CHARS` characters.
pub fn markdown_title(markdown: &str) -> Option<String> {
    markdown.lines().find_map(|line| {
        let text = line.strip_prefix("# ")?.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.chars().take(MAX_TITLE_CHARS).collect())
        }
    })
}

fn converter() -> HtmlToMarkdown {
    HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .options(Options {
            heading_style: HeadingStyle::Atx,
            bullet_list_marker: BulletListMarker::Dash,
            ..Options::default()
        })
        .build()
}

fn to_markdown(html: &str, document: &Html, base_url: &Url) -> String {
    let html = absolutize_hrefs(html, base_url);

    match converter().convert(&html) {
        Ok(markdown) => markdown.trim().to_string(),
        Err(e) => {
            tracing::warn!("Markdown conversion failed for {}: {}", base_url, e);
            body_text(document)
        }
    }
}

/// Rewrites followable `href` values to absolute, markdown-safe URLs
fn absolutize_hrefs(html: &str, base_url: &Url) -> String {
    let Ok(href) = Regex::new(HREF_PATTERN) else {
        return html.to_string();
    };

    href.replace_all(html, |caps: &Captures| {
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map_or("", |m| m.as_str());
        match resolve_link(value, base_url) {
            Some(target) => format!("{}\"{}\"", &caps[1], target),
            None => caps[0].to_string(),
        }
    })
    .into_owned()
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Followable links in document order, deduplicated
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut links: Vec<String> = Vec::new();
    for element in document.select(&selector) {
        let Some(target) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        else {
            continue;
        };
        if !links.contains(&target) {
            links.push(target);
        }
    }
    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should not be followed:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only hrefs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(markdown_safe(absolute_url.as_str()))
    } else {
        None
    }
}

/// Percent-encodes the characters that would end a markdown link target
fn markdown_safe(url: &str) -> String {
    url.replace('(', "%28")
        .replace(')', "%29")
        .replace(' ', "%20")
        .replace('<', "%3C")
        .replace('>', "%3E")
}

fn body_text(document: &Html) -> String {
    let Ok(selector) = Selector::parse("body") else {
        return String::new();
    };
    document
        .select(&selector)
        .next()
        .map(|body| collapse_whitespace(&body.text().collect::<String>()))
        .unwrap_or_default()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    #[test]
    fn test_extract_title() {
        let html = r#"<html><head><title>  Test   Page  </title></head><body></body></html>"#;
        let parsed = parse_html(html, &base_url());
        assert_eq!(parsed.title, Some("Test Page".to_string()));
    }

    #[test]
    fn test_no_title() {
        let html = r#"<html><head></head><body></body></html>"#;
        let parsed = parse_html(html, &base_url());
        assert_eq!(parsed.title, None);
        assert!(parsed.markdown.trim().is_empty());
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let html = r#"<html><body>
            <h1>Main Headline</h1>
            <p>First paragraph</p>
            <h2>Sub</h2>
            <p>Second <strong>bold</strong> paragraph</p>
        </body></html>"#;

        let parsed = parse_html(html, &base_url());
        assert!(parsed.markdown.starts_with("# Main Headline"));
        assert!(parsed.markdown.contains("\n## Sub"));
        assert!(parsed.markdown.contains("First paragraph"));
        assert_eq!(markdown_title(&parsed.markdown), Some("Main Headline".to_string()));
    }

    #[test]
    fn test_links_are_resolved_and_collected() {
        let html = r#"<html><body>
            <p>Read <a href="/other">the other page</a> or
            <a href='https://other.com/x'>elsewhere</a>.</p>
        </body></html>"#;

        let parsed = parse_html(html, &base_url());
        assert!(parsed
            .markdown
            .contains("[the other page](https://example.com/other)"));
        assert!(parsed.markdown.contains("[elsewhere](https://other.com/x)"));
        assert_eq!(
            parsed.links,
            vec![
                "https://example.com/other".to_string(),
                "https://other.com/x".to_string()
            ]
        );
    }

    #[test]
    fn test_link_targets_are_markdown_safe() {
        let html = r#"<html><body>
            <a href="/world/2024/jan/01/story_(live)">[Live] Story</a>
        </body></html>"#;

        let parsed = parse_html(html, &base_url());
        let target = "https://example.com/world/2024/jan/01/story_%28live%29";
        assert_eq!(parsed.links, vec![target.to_string()]);
        assert!(parsed.markdown.contains(&format!("]({})", target)));
    }

    #[test]
    fn test_unfollowable_links_not_collected() {
        let html = r##"<html><body>
            <a href="javascript:void(0)">Script</a>
            <a href="mailto:test@example.com">Email</a>
            <a href="#section">Jump</a>
        </body></html>"##;

        let parsed = parse_html(html, &base_url());
        assert!(parsed.links.is_empty());
        assert!(parsed.markdown.contains("Script"));
        assert!(!parsed.markdown.contains("https://example.com"));
    }

    #[test]
    fn test_duplicate_links_collected_once() {
        let html = r#"<html><body><a href="/a">A</a><a href="/a">again</a></body></html>"#;
        let parsed = parse_html(html, &base_url());
        assert_eq!(parsed.links, vec!["https://example.com/a".to_string()]);
    }

    #[test]
    fn test_scripts_and_styles_dropped() {
        let html = r#"<html><body>
            <script>var x = "not content";</script>
            <style>p { color: red; }</style>
            <p>Visible</p>
        </body></html>"#;

        let parsed = parse_html(html, &base_url());
        assert_eq!(parsed.markdown, "Visible");
    }

    #[test]
    fn test_lists() {
        let html = r#"<html><body><ul><li>One</li><li><a href="/two">Two</a></li></ul></body></html>"#;
        let parsed = parse_html(html, &base_url());
        assert!(parsed.markdown.contains("One"));
        assert!(parsed.markdown.contains("[Two](https://example.com/two)"));
    }

    #[test]
    fn test_absolutize_leaves_fragments_alone() {
        let html = r##"<a href="#top">Top</a><a HREF="rel">Rel</a>"##;
        let rewritten = absolutize_hrefs(html, &base_url());
        assert_eq!(
            rewritten,
            r##"<a href="#top">Top</a><a HREF="https://example.com/rel">Rel</a>"##
        );
    }

    #[test]
    fn test_markdown_title_first_h1() {
        let markdown = "intro\n## Not this\n# First\n# Second\n";
        assert_eq!(markdown_title(markdown), Some("First".to_string()));
    }

    #[test]
    fn test_markdown_title_skips_empty_heading() {
        assert_eq!(markdown_title("# \n#   \n# Real\n"), Some("Real".to_string()));
    }

    #[test]
    fn test_markdown_title_none() {
        assert_eq!(markdown_title(""), None);
        assert_eq!(markdown_title("no headings here\n##Nope"), None);
    }

    #[test]
    fn test_markdown_title_truncated() {
        let long = format!("# {}", "x".repeat(200));
        let title = markdown_title(&long).unwrap();
        assert_eq!(title.chars().count(), MAX_TITLE_CHARS);
    }
}
