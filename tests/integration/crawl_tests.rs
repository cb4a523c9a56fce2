//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! real backends and the full crawl cycle end-to-end.

use depth_ripple::config::{
    BackendConfig, BackendKind, Config, CrawlerConfig, LinksConfig, OutputConfig, UserAgentConfig,
};
use depth_ripple::crawler::{
    build_http_client, run_crawl, Coordinator, FetchBackend, FetchFormat, FirecrawlBackend,
    HttpBackend,
};
use depth_ripple::{FetchError, PatternLinkExtractor};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

/// Creates a test configuration crawling `seed` over plain HTTP
fn create_test_config(seed: &str, max_depth: u32, max_pages_per_level: u32) -> Config {
    let mut crawler = CrawlerConfig::new(max_depth, max_pages_per_level, 0.01);
    crawler.seeds = vec![seed.to_string()];

    Config {
        crawler,
        links: LinksConfig::default(),
        backend: BackendConfig {
            kind: BackendKind::Http,
            timeout: 5,
            ..BackendConfig::default()
        },
        user_agent: user_agent(),
        output: OutputConfig::default(),
    }
}

fn http_backend() -> HttpBackend {
    HttpBackend::new(build_http_client(&user_agent(), Duration::from_secs(5)).unwrap())
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_raw(format!("<html><body>{}</body></html>", body), "text/html")
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_http_backend_converts_html_to_markdown() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(
                    r#"<html><head><title>Home</title></head><body>
                    <h1>Front page</h1>
                    <p>Read <a href="/world/2024/jan/01/one">the first story</a>.</p>
                    </body></html>"#,
                    "text/html",
                ),
        )
        .mount(&mock_server)
        .await;

    let page = http_backend()
        .fetch(&format!("{}/", base_url), FetchFormat::Markdown)
        .await
        .unwrap();

    assert!(page.content.starts_with("# Front page"));
    assert!(page.content.contains(&format!(
        "[the first story]({}/world/2024/jan/01/one)",
        base_url
    )));
    assert_eq!(page.meta("title"), Some("Home"));
    assert_eq!(page.meta("status_code"), Some("200"));
    assert_eq!(page.meta("links_count"), Some("1"));
}

#[tokio::test]
async fn test_http_backend_reports_status_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let url = format!("{}/missing", mock_server.uri());
    let result = http_backend().fetch(&url, FetchFormat::Markdown).await;

    match result {
        Err(FetchError::Status { url: failed, status }) => {
            assert_eq!(failed, url);
            assert_eq!(status, 404);
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_backend_passes_plain_text_through() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/notes.md"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("# Notes\n\n[x](/world/2024/jan/01/x)\n", "text/markdown"),
        )
        .mount(&mock_server)
        .await;

    let page = http_backend()
        .fetch(
            &format!("{}/notes.md", mock_server.uri()),
            FetchFormat::Markdown,
        )
        .await
        .unwrap();

    assert_eq!(page.content, "# Notes\n\n[x](/world/2024/jan/01/x)\n");
    assert_eq!(page.meta("format"), Some("raw"));
}

#[tokio::test]
async fn test_http_backend_rejects_binary_content() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/image.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(vec![0x89, 0x50, 0x4e, 0x47], "image/png"),
        )
        .mount(&mock_server)
        .await;

    let result = http_backend()
        .fetch(
            &format!("{}/image.png", mock_server.uri()),
            FetchFormat::Markdown,
        )
        .await;

    assert!(matches!(result, Err(FetchError::Backend { .. })));
}

#[tokio::test]
async fn test_http_backend_unreachable_host() {
    // Nothing listens on the discard port.
    let result = http_backend()
        .fetch("http://127.0.0.1:9/", FetchFormat::Markdown)
        .await;

    assert!(matches!(
        result,
        Err(FetchError::Http { .. }) | Err(FetchError::Timeout { .. })
    ));
}

#[tokio::test]
async fn test_full_crawl_over_http() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        r#"<h1>Home</h1>
        <a href="/world/2024/jan/01/one">One</a>
        <a href="/world/2024/jan/02/two">Two</a>
        <a href="/about">About</a>
        <a href="https://elsewhere.example/world/2024/jan/01/x">Elsewhere</a>"#,
    )
    .await;
    mount_page(
        &mock_server,
        "/world/2024/jan/01/one",
        r#"<h1>Story one</h1>
        <a href="/">Home</a>
        <a href="/world/2024/jan/03/three">Three</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/world/2024/jan/02/two"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(
        &mock_server,
        "/world/2024/jan/03/three",
        "<h1>Story three</h1><p>The end.</p>",
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html("<h1>About</h1>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let seed = format!("{}/", base_url);
    let config = create_test_config(&seed, 2, 5);

    let summary = run_crawl(&config, &seed, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.backend, "http");
    assert_eq!(summary.total_pages, 4);
    assert_eq!(summary.successful_pages, 3);
    assert_eq!(summary.max_depth_reached, 2);
    assert_eq!(summary.per_depth_counts.get(&0), Some(&1));
    assert_eq!(summary.per_depth_counts.get(&1), Some(&2));
    assert_eq!(summary.per_depth_counts.get(&2), Some(&1));

    let titles: Vec<&str> = summary
        .all_results
        .iter()
        .map(|r| r.display_title())
        .collect();
    assert_eq!(titles, vec!["Home", "Story one", "Failed", "Story three"]);

    let failed = &summary.all_results[2];
    assert_eq!(failed.url, format!("{}/world/2024/jan/02/two", base_url));
    assert!(failed.error.as_deref().unwrap().contains("500"));
}

#[tokio::test]
async fn test_crawl_respects_level_cap() {
    let mock_server = MockServer::start().await;

    let links: String = (1..=4)
        .map(|i| format!(r#"<a href="/news/2024/feb/0{i}/story-{i}">Story {i}</a>"#))
        .collect();
    mount_page(&mock_server, "/", &links).await;
    mount_page(&mock_server, "/news/2024/feb/01/story-1", "<h1>1</h1>").await;
    mount_page(&mock_server, "/news/2024/feb/02/story-2", "<h1>2</h1>").await;
    for i in 3..=4 {
        Mock::given(method("GET"))
            .and(path(format!("/news/2024/feb/0{i}/story-{i}")))
            .respond_with(html("<h1>never</h1>"))
            .expect(0)
            .mount(&mock_server)
            .await;
    }

    let seed = format!("{}/", mock_server.uri());
    let summary = run_crawl(
        &create_test_config(&seed, 3, 2),
        &seed,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.total_pages, 3);
    assert_eq!(summary.results_at(1).count(), 2);
}

#[tokio::test]
async fn test_crawl_respects_total_page_budget() {
    let mock_server = MockServer::start().await;

    let links: String = (1..=4)
        .map(|i| format!(r#"<a href="/news/2024/mar/0{i}/story-{i}">Story {i}</a>"#))
        .collect();
    mount_page(&mock_server, "/", &links).await;
    mount_page(&mock_server, "/news/2024/mar/01/story-1", "<h1>1</h1>").await;
    mount_page(&mock_server, "/news/2024/mar/02/story-2", "<h1>2</h1>").await;
    for i in 3..=4 {
        Mock::given(method("GET"))
            .and(path(format!("/news/2024/mar/0{i}/story-{i}")))
            .respond_with(html("<h1>never</h1>"))
            .expect(0)
            .mount(&mock_server)
            .await;
    }

    let seed = format!("{}/", mock_server.uri());
    let mut config = create_test_config(&seed, 3, 3);
    config.crawler.max_total_pages = Some(3);

    let summary = run_crawl(&config, &seed, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.total_pages, 3);
    assert_eq!(summary.results_at(1).count(), 2);
    assert!(!summary.cancelled);
}

#[tokio::test]
async fn test_firecrawl_backend_scrapes_markdown() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "url": "https://news.example/",
            "formats": ["markdown"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "markdown": "# Hosted\n\nBody text",
                "metadata": {
                    "title": "Hosted page",
                    "sourceURL": "https://news.example/",
                    "statusCode": 200
                }
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let backend = FirecrawlBackend::new(
        reqwest::Client::new(),
        mock_server.uri(),
        Duration::from_secs(5),
    )
    .with_api_key("test-key");

    let page = backend
        .fetch("https://news.example/", FetchFormat::Markdown)
        .await
        .unwrap();

    assert_eq!(page.content, "# Hosted\n\nBody text");
    assert_eq!(page.url, "https://news.example/");
    assert_eq!(page.meta("title"), Some("Hosted page"));
    assert_eq!(page.meta("statusCode"), Some("200"));
}

#[tokio::test]
async fn test_firecrawl_backend_structured_extraction() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .and(body_partial_json(json!({ "formats": ["json"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "json": { "title": "T", "summary": "S", "keywords": ["k"] },
                "metadata": {}
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let backend = FirecrawlBackend::new(
        reqwest::Client::new(),
        mock_server.uri(),
        Duration::from_secs(5),
    )
    .with_api_key("test-key");

    let page = backend
        .fetch("https://news.example/", FetchFormat::Structured)
        .await
        .unwrap();

    let doc: serde_json::Value = serde_json::from_str(&page.content).unwrap();
    assert_eq!(doc["title"], "T");
    assert_eq!(doc["keywords"], json!(["k"]));
}

#[tokio::test]
async fn test_firecrawl_backend_reports_api_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "success": false,
            "error": "Payment required"
        })))
        .mount(&mock_server)
        .await;

    let backend = FirecrawlBackend::new(
        reqwest::Client::new(),
        mock_server.uri(),
        Duration::from_secs(5),
    )
    .with_api_key("test-key");

    let result = backend
        .fetch("https://news.example/", FetchFormat::Markdown)
        .await;

    match result {
        Err(FetchError::Backend { message, .. }) => {
            assert!(message.contains("402"));
            assert!(message.contains("Payment required"));
        }
        other => panic!("expected backend error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_crawl_through_firecrawl_backend() {
    let mock_server = MockServer::start().await;

    let pages = [
        (
            "https://news.example/",
            "# Front\n\n[One](https://news.example/world/2024/mar/01/one)\n\
             [Two](https://news.example/world/2024/mar/02/two)\n",
        ),
        (
            "https://news.example/world/2024/mar/01/one",
            "# One\n\nBack to [front](https://news.example/)\n",
        ),
        ("https://news.example/world/2024/mar/02/two", "# Two\n"),
    ];
    for (url, markdown) in pages {
        Mock::given(method("POST"))
            .and(path("/v1/scrape"))
            .and(body_partial_json(json!({ "url": url })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": { "markdown": markdown, "metadata": { "sourceURL": url } }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let backend = FirecrawlBackend::new(
        reqwest::Client::new(),
        mock_server.uri(),
        Duration::from_secs(5),
    )
    .with_api_key("test-key");
    let extractor = PatternLinkExtractor::dated_articles("news.example").unwrap();

    let coordinator = Coordinator::new(
        CrawlerConfig::new(2, 5, 0.0),
        Arc::new(backend),
        Arc::new(extractor),
    )
    .unwrap();

    let summary = coordinator.run("https://news.example/").await.unwrap();

    assert_eq!(summary.backend, "firecrawl");
    assert_eq!(summary.total_pages, 3);
    assert_eq!(summary.successful_pages, 3);
    assert_eq!(summary.max_depth_reached, 1);
    let titles: Vec<&str> = summary
        .all_results
        .iter()
        .map(|r| r.display_title())
        .collect();
    assert_eq!(titles, vec!["Front", "One", "Two"]);
}

#[tokio::test]
async fn test_cancelled_crawl_is_partial() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/",
        r#"<a href="/world/2024/jan/01/slow">Slow</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/world/2024/jan/01/slow"))
        .respond_with(html("<h1>Slow</h1>").set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let seed = format!("{}/", mock_server.uri());
    let config = create_test_config(&seed, 2, 5);
    let cancel = CancellationToken::new();

    let canceller = {
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            cancel.cancel();
        }
    };

    let (summary, ()) = tokio::join!(run_crawl(&config, &seed, cancel), canceller);
    let summary = summary.unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.total_pages, 1);
    assert_eq!(summary.all_results[0].url, seed);
}
