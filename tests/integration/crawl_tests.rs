//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and drive the full
//! crawl cycle end-to-end through the HTTP render backend.

use std::path::{Path, PathBuf};
use sumi_harvest::config::{load_config, Config};
use sumi_harvest::crawler::{Coordinator, CrawlSummary, ScrapeRecord};
use sumi_harvest::storage::{PageStore, SqliteStore};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct TestRun {
    _temp: TempDir,
    jsonl: PathBuf,
    db: PathBuf,
}

impl TestRun {
    fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        Self {
            jsonl: temp.path().join("out/pages.jsonl"),
            db: temp.path().join("out/pages.db"),
            _temp: temp,
        }
    }

    /// Writes a config file with the given `[crawler]` body and extra sections
    ///
    /// Crawler keys the body leaves out get fast test defaults.
    fn config(&self, crawler: &str, extra: &str) -> Config {
        let mut crawler = crawler.to_string();
        for (key, value) in [
            ("concurrency", "1"),
            ("min-request-spacing-ms", "0"),
            ("backoff-base-ms", "10"),
        ] {
            if !crawler.contains(key) {
                crawler.push_str(&format!("\n{} = {}", key, value));
            }
        }

        let content = format!(
            r#"
[crawler]
{crawler}

[browser]
user-agent = "HarvestTestBot/1.0"
page-load-timeout-secs = 5

[output]
jsonl-path = "{jsonl}"
database-path = "{db}"

{extra}
"#,
            crawler = crawler,
            jsonl = self.jsonl.display(),
            db = self.db.display(),
            extra = extra,
        );

        let path = self._temp.path().join("harvest.toml");
        std::fs::write(&path, content).expect("Failed to write config");
        load_config(&path).expect("Failed to load config")
    }

    fn records(&self) -> Vec<ScrapeRecord> {
        read_records(&self.jsonl)
    }

    fn store(&self) -> SqliteStore {
        SqliteStore::new(&self.db).expect("Failed to open store")
    }
}

fn read_records(path: &Path) -> Vec<ScrapeRecord> {
    let content = std::fs::read_to_string(path).unwrap_or_default();
    content
        .lines()
        .map(|line| serde_json::from_str(line).expect("Invalid JSONL line"))
        .collect()
}

async fn crawl(config: Config) -> CrawlSummary {
    Coordinator::from_config(config)
        .await
        .expect("Failed to build coordinator")
        .run()
        .await
        .expect("Crawl failed")
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

async fn mount_page(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(html(body))
        .mount(server)
        .await;
}

async fn mount_robots(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn sorted_urls(records: &[ScrapeRecord]) -> Vec<String> {
    let mut urls: Vec<String> = records.iter().map(|r| r.url.clone()).collect();
    urls.sort();
    urls
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nDisallow: /private".to_string()).await;
    mount_page(
        &server,
        "/",
        format!(
            r#"<html><head><title>Home</title>
            <meta name="description" content="The home page"></head><body>
            <h1>Welcome</h1>
            <a href="/page1">Page 1</a>
            <a href="{base}/page2#section">Page 2</a>
            <a href="/private/secret">Secret</a>
            <a href="mailto:team@example.com">Mail</a>
            <a href="https://elsewhere.invalid/">Elsewhere</a>
            </body></html>"#
        ),
    )
    .await;
    mount_page(&server, "/page1", "<p>One</p>".to_string()).await;
    mount_page(&server, "/page2", "<p>Two</p>".to_string()).await;
    Mock::given(method("GET"))
        .and(path("/private/secret"))
        .respond_with(html("<p>hidden</p>".to_string()))
        .expect(0)
        .mount(&server)
        .await;

    let run = TestRun::new();
    let config = run.config(
        &format!(
            "start-urls = [\"{base}/\"]\nmax-depth = 1\nconcurrency = 2"
        ),
        "",
    );

    let summary = crawl(config).await;

    let records = run.records();
    assert_eq!(
        sorted_urls(&records),
        vec![
            format!("{base}/"),
            format!("{base}/page1"),
            format!("{base}/page2"),
        ]
    );

    let home = records.iter().find(|r| r.url == format!("{base}/")).unwrap();
    assert_eq!(home.title.as_deref(), Some("Home"));
    assert!(home.text.contains("Welcome"));
    assert_eq!(
        home.meta.get("description").map(String::as_str),
        Some("The home page")
    );
    assert!(home.links.contains(&format!("{base}/page2")));
    assert!(!home.links.iter().any(|l| l.starts_with("mailto:")));
    assert_eq!(home.scrape_meta.user_agent, "HarvestTestBot/1.0");
    assert_eq!(home.scrape_meta.status, 200);

    assert_eq!(run.store().count_pages().unwrap(), 3);
    assert_eq!(summary.pages_stored, 3);
    assert_eq!(summary.pages_skipped, 1);
}

#[tokio::test]
async fn test_depth_limit_respected() {
    let server = MockServer::start().await;

    mount_page(&server, "/", r#"<a href="/d1">d1</a>"#.to_string()).await;
    mount_page(&server, "/d1", r#"<a href="/d2">d2</a>"#.to_string()).await;
    Mock::given(method("GET"))
        .and(path("/d2"))
        .respond_with(html("<p>too deep</p>".to_string()))
        .expect(0)
        .mount(&server)
        .await;

    let run = TestRun::new();
    let config = run.config(
        &format!("start-urls = [\"{}/\"]\nmax-depth = 1", server.uri()),
        "",
    );

    crawl(config).await;

    let depths: Vec<u32> = run.records().iter().map(|r| r.scrape_meta.depth).collect();
    assert_eq!(depths, vec![0, 1]);
}

#[tokio::test]
async fn test_second_run_skips_stored_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<p>once</p>".to_string()))
        .expect(1)
        .mount(&server)
        .await;

    let run = TestRun::new();
    let crawler = format!("start-urls = [\"{}/\"]\nmax-depth = 0", server.uri());

    let first = crawl(run.config(&crawler, "")).await;
    assert_eq!(first.pages_stored, 1);

    let second = crawl(run.config(&crawler, "")).await;
    assert_eq!(second.pages_scraped, 0);
    assert_eq!(second.pages_skipped, 1);

    assert_eq!(run.records().len(), 1);
    assert!(run.store().exists(&format!("{}/", server.uri())).unwrap());
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_page(&server, "/", "<p>recovered</p>".to_string()).await;

    let run = TestRun::new();
    let config = run.config(
        &format!(
            "start-urls = [\"{}/\"]\nmax-depth = 0\nmax-retries = 3",
            server.uri()
        ),
        "",
    );

    let summary = crawl(config).await;

    assert_eq!(summary.navigation_attempts, 3);
    let records = run.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].scrape_meta.retries, 2);
}

#[tokio::test]
async fn test_unreachable_page_is_abandoned() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let run = TestRun::new();
    let config = run.config(
        &format!(
            "start-urls = [\"{}/\"]\nmax-depth = 0\nmax-retries = 1",
            server.uri()
        ),
        "",
    );

    let summary = crawl(config).await;

    assert_eq!(summary.pages_failed, 1);
    assert!(run.records().is_empty());
    assert_eq!(run.store().count_pages().unwrap(), 0);
}

#[tokio::test]
async fn test_sitemap_urls_are_seeded() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, format!("User-agent: *\nSitemap: {base}/sitemap.xml")).await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <url><loc>{base}/orphan</loc></url>
              <url><loc>{base}/</loc></url>
            </urlset>"#
        )))
        .mount(&server)
        .await;
    mount_page(&server, "/", "<p>home</p>".to_string()).await;
    mount_page(&server, "/orphan", "<p>unlinked</p>".to_string()).await;

    let run = TestRun::new();
    let config = run.config(
        &format!("start-urls = [\"{base}/\"]\nmax-depth = 0"),
        "[seeding.sitemaps]\nenabled = true\nmax-urls = 10",
    );

    let summary = crawl(config).await;

    assert_eq!(summary.seeds, 2);
    assert_eq!(
        sorted_urls(&run.records()),
        vec![format!("{base}/"), format!("{base}/orphan")]
    );
}

#[tokio::test]
async fn test_feed_entries_are_seeded() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nDisallow:".to_string()).await;
    Mock::given(method("GET"))
        .and(path("/feed.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<?xml version="1.0"?>
            <rss version="2.0"><channel><title>News</title><link>{base}/</link>
              <item><title>One</title><link>{base}/post/1</link></item>
              <item><title>Two</title><link>/post/2</link></item>
              <item><title>Home</title><link>{base}/</link></item>
            </channel></rss>"#
        )))
        .mount(&server)
        .await;
    mount_page(&server, "/", "<p>home</p>".to_string()).await;
    mount_page(&server, "/post/1", "<p>one</p>".to_string()).await;
    mount_page(&server, "/post/2", "<p>two</p>".to_string()).await;

    let run = TestRun::new();
    let config = run.config(
        &format!("start-urls = [\"{base}/\"]\nmax-depth = 0"),
        &format!("[seeding.feeds]\nurls = [\"{base}/feed.xml\"]\nmax-items = 10"),
    );

    let summary = crawl(config).await;

    assert_eq!(summary.seeds, 3);
    assert_eq!(
        sorted_urls(&run.records()),
        vec![
            format!("{base}/"),
            format!("{base}/post/1"),
            format!("{base}/post/2")
        ]
    );
}

#[tokio::test]
async fn test_json_documents_are_sniffed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", r#"<a href="/api/items">items</a>"#.to_string()).await;
    Mock::given(method("GET"))
        .and(path("/api/items"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"items":[1,2,3]}"#)
                .insert_header("content-type", "application/json"),
        )
        .mount(&server)
        .await;

    let run = TestRun::new();
    let config = run.config(
        &format!("start-urls = [\"{base}/\"]\nmax-depth = 1"),
        "[sniffing]\nintercept-network = true",
    );

    let summary = crawl(config).await;

    let records = run.records();
    let api = records
        .iter()
        .find(|r| r.url == format!("{base}/api/items"))
        .expect("API document was not crawled");
    assert_eq!(api.scrape_meta.api_hits.len(), 1);
    assert_eq!(
        api.scrape_meta.api_hits[0].response_body.as_deref(),
        Some(r#"{"items":[1,2,3]}"#)
    );

    let home = records.iter().find(|r| r.url == format!("{base}/")).unwrap();
    assert!(home.scrape_meta.api_hits.is_empty());
    assert_eq!(summary.api_hits, 1);
}

#[tokio::test]
async fn test_per_domain_spacing_between_requests() {
    let server = MockServer::start().await;

    mount_page(&server, "/", r#"<a href="/a">a</a><a href="/b">b</a>"#.to_string()).await;
    mount_page(&server, "/a", "<p>a</p>".to_string()).await;
    mount_page(&server, "/b", "<p>b</p>".to_string()).await;

    let run = TestRun::new();
    let config = run.config(
        &format!(
            "start-urls = [\"{}/\"]\nmax-depth = 1\nconcurrency = 3\nmin-request-spacing-ms = 150",
            server.uri()
        ),
        "",
    );
    assert_eq!(config.crawler.min_request_spacing_ms, 150);

    let started = std::time::Instant::now();
    crawl(config).await;

    // three requests to one domain need at least two full spacing intervals
    assert!(started.elapsed() >= std::time::Duration::from_millis(300));
    assert_eq!(run.records().len(), 3);
}
