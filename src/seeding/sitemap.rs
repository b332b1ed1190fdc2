//! Sitemap seeding
//!
//! Discovers sitemaps for each seed origin (robots.txt `Sitemap:` lines, else
//! `/sitemap.xml` and `/sitemap_index.xml`), expands sitemap indexes one
//! level, and returns the listed page URLs, deduplicated and capped.

use super::fetch_text;
use crate::robots::{origin_key, ParsedRobots, RobotsFetcher};
use crate::url::normalize_seed;
use quick_xml::de::from_str;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

/// Locations tried when robots.txt lists no sitemap
const FALLBACK_PATHS: &[&str] = &["/sitemap.xml", "/sitemap_index.xml"];

/// A `<urlset>` or `<sitemapindex>` document
#[derive(Debug, Default, Deserialize)]
pub struct SitemapDocument {
    #[serde(rename = "url", default)]
    pub urls: Vec<SitemapEntry>,

    #[serde(rename = "sitemap", default)]
    pub sitemaps: Vec<SitemapEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SitemapEntry {
    pub loc: String,
}

impl SitemapDocument {
    pub fn is_index(&self) -> bool {
        !self.sitemaps.is_empty()
    }

    /// Page locations (`<url><loc>`)
    pub fn page_locations(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(|entry| entry.loc.trim())
    }

    /// Child sitemap locations (`<sitemap><loc>`)
    pub fn sitemap_locations(&self) -> impl Iterator<Item = &str> {
        self.sitemaps.iter().map(|entry| entry.loc.trim())
    }
}

/// Parses a sitemap or sitemap index
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument, quick_xml::errors::serialize::DeError> {
    from_str(xml)
}

/// Collects seed URLs from the sitemaps of a set of sites
pub struct SitemapSeeder {
    client: Client,
    robots: Arc<dyn RobotsFetcher>,
    max_urls: usize,
}

impl SitemapSeeder {
    pub fn new(client: Client, robots: Arc<dyn RobotsFetcher>, max_urls: usize) -> Self {
        Self {
            client,
            robots,
            max_urls,
        }
    }

    /// Returns up to `max_urls` distinct page URLs listed for the origins of `start_urls`
    ///
    /// Fetch and parse errors are logged and skipped.
    pub async fn discover(&self, start_urls: &[Url]) -> Vec<Url> {
        let mut collector = Collector::new(self.max_urls);

        let mut origins: Vec<String> = Vec::new();
        for url in start_urls {
            let origin = origin_key(url);
            if !origins.contains(&origin) {
                origins.push(origin);
            }
        }

        for origin in origins {
            for location in self.sitemap_locations(&origin).await {
                if collector.is_full() {
                    return collector.into_urls();
                }

                let Some(document) = self.fetch_document(&location).await else {
                    continue;
                };

                if !document.is_index() {
                    collector.extend(document.page_locations());
                    continue;
                }

                for child in document.sitemap_locations() {
                    if collector.is_full() {
                        break;
                    }
                    if let Some(child_document) = self.fetch_document(child).await {
                        collector.extend(child_document.page_locations());
                    }
                }
            }
        }

        tracing::info!("Sitemaps yielded {} seed URLs", collector.urls.len());
        collector.into_urls()
    }

    async fn sitemap_locations(&self, origin: &str) -> Vec<String> {
        let body = self.robots.fetch(origin).await;
        let listed = ParsedRobots::from_content(&body).sitemaps();
        if !listed.is_empty() {
            return listed;
        }

        FALLBACK_PATHS
            .iter()
            .map(|path| format!("{}{}", origin, path))
            .collect()
    }

    async fn fetch_document(&self, location: &str) -> Option<SitemapDocument> {
        let xml = fetch_text(&self.client, location).await?;
        match parse_sitemap(&xml) {
            Ok(document) => Some(document),
            Err(e) => {
                tracing::debug!("Ignoring unparseable sitemap {}: {}", location, e);
                None
            }
        }
    }
}

/// Deduplicating, capped accumulator
struct Collector {
    seen: HashSet<String>,
    urls: Vec<Url>,
    max: usize,
}

impl Collector {
    fn new(max: usize) -> Self {
        Self {
            seen: HashSet::new(),
            urls: Vec::new(),
            max,
        }
    }

    fn is_full(&self) -> bool {
        self.urls.len() >= self.max
    }

    fn extend<'a>(&mut self, locations: impl Iterator<Item = &'a str>) {
        for location in locations {
            if self.is_full() {
                return;
            }
            let Ok(url) = normalize_seed(location) else {
                continue;
            };
            if self.seen.insert(url.as_str().to_string()) {
                self.urls.push(url);
            }
        }
    }

    fn into_urls(self) -> Vec<Url> {
        self.urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robots::HttpRobotsFetcher;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn urlset(locs: &[String]) -> String {
        let entries: String = locs
            .iter()
            .map(|loc| format!("<url><loc>{}</loc><lastmod>2024-01-01</lastmod></url>", loc))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
            entries
        )
    }

    fn index(locs: &[String]) -> String {
        let entries: String = locs
            .iter()
            .map(|loc| format!("<sitemap><loc>{}</loc></sitemap>", loc))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</sitemapindex>"#,
            entries
        )
    }

    async fn mount(server: &MockServer, at: &str, status: u16, body: String) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    fn seeder(max_urls: usize) -> SitemapSeeder {
        let client = Client::new();
        SitemapSeeder::new(
            client.clone(),
            Arc::new(HttpRobotsFetcher::new(client)),
            max_urls,
        )
    }

    fn start(server: &MockServer) -> Vec<Url> {
        vec![Url::parse(&format!("{}/", server.uri())).unwrap()]
    }

    #[test]
    fn test_parse_urlset_and_index() {
        let doc = parse_sitemap(&urlset(&["https://a.com/1".to_string()])).unwrap();
        assert!(!doc.is_index());
        assert_eq!(doc.page_locations().collect::<Vec<_>>(), vec!["https://a.com/1"]);

        let doc = parse_sitemap(&index(&["https://a.com/s1.xml".to_string()])).unwrap();
        assert!(doc.is_index());
        assert_eq!(
            doc.sitemap_locations().collect::<Vec<_>>(),
            vec!["https://a.com/s1.xml"]
        );
    }

    #[tokio::test]
    async fn test_robots_listed_sitemap() {
        let server = MockServer::start().await;
        let base = server.uri();
        mount(
            &server,
            "/robots.txt",
            200,
            format!("User-agent: *\nSitemap: {}/pages.xml", base),
        )
        .await;
        mount(
            &server,
            "/pages.xml",
            200,
            urlset(&[format!("{}/a", base), format!("{}/b", base), format!("{}/a", base)]),
        )
        .await;

        let urls = seeder(100).discover(&start(&server)).await;
        let urls: Vec<String> = urls.iter().map(Url::to_string).collect();
        assert_eq!(urls, vec![format!("{}/a", base), format!("{}/b", base)]);
    }

    #[tokio::test]
    async fn test_fallback_index_expanded_one_level() {
        let server = MockServer::start().await;
        let base = server.uri();
        mount(&server, "/robots.txt", 404, String::new()).await;
        mount(
            &server,
            "/sitemap_index.xml",
            200,
            index(&[format!("{}/s1.xml", base), format!("{}/s2.xml", base)]),
        )
        .await;
        mount(&server, "/s1.xml", 200, urlset(&[format!("{}/one", base)])).await;
        mount(&server, "/s2.xml", 200, urlset(&[format!("{}/two", base)])).await;

        let urls = seeder(100).discover(&start(&server)).await;
        assert_eq!(urls.len(), 2);
        assert!(urls[0].as_str().ends_with("/one"));
        assert!(urls[1].as_str().ends_with("/two"));
    }

    #[tokio::test]
    async fn test_capped_at_max_urls() {
        let server = MockServer::start().await;
        let base = server.uri();
        let locs: Vec<String> = (0..10).map(|i| format!("{}/p{}", base, i)).collect();
        mount(&server, "/sitemap.xml", 200, urlset(&locs)).await;

        let urls = seeder(3).discover(&start(&server)).await;
        assert_eq!(urls.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_sitemaps_yield_nothing() {
        let server = MockServer::start().await;
        let urls = seeder(10).discover(&start(&server)).await;
        assert!(urls.is_empty());
    }
}
