//! Feed seeding
//!
//! Reads RSS 2.0, RSS 1.0 (RDF) and Atom feeds and returns their entry
//! links as seeds, at most `max_items` per feed.

use super::fetch_text;
use crate::url::normalize_seed;
use quick_xml::de::from_str;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use url::Url;

/// The link-bearing parts of an RSS or Atom document
#[derive(Debug, Default, Deserialize)]
pub struct FeedDocument {
    /// RSS 2.0 keeps its items inside `<channel>`
    #[serde(default)]
    channel: Option<Channel>,

    /// RSS 1.0 items are siblings of the channel
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,

    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    #[serde(default)]
    link: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href", default)]
    href: String,

    #[serde(rename = "@rel", default)]
    rel: Option<String>,
}

impl RssItem {
    fn link(&self) -> Option<&str> {
        self.link.iter().map(|l| l.trim()).find(|l| !l.is_empty())
    }
}

impl AtomEntry {
    /// The `alternate` link (the default relation), else the first one
    fn link(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.links.first())
            .map(|l| l.href.trim())
            .filter(|href| !href.is_empty())
    }
}

impl FeedDocument {
    /// Entry links in document order
    pub fn links(&self) -> Vec<&str> {
        let channel_items = self.channel.iter().flat_map(|c| c.items.iter());
        channel_items
            .chain(self.items.iter())
            .filter_map(RssItem::link)
            .chain(self.entries.iter().filter_map(AtomEntry::link))
            .collect()
    }
}

/// Parses an RSS or Atom feed
pub fn parse_feed(xml: &str) -> Result<FeedDocument, quick_xml::errors::serialize::DeError> {
    from_str(xml)
}

/// Collects seed URLs from configured feeds
pub struct FeedSeeder {
    client: Client,
    max_items: usize,
}

impl FeedSeeder {
    pub fn new(client: Client, max_items: usize) -> Self {
        Self { client, max_items }
    }

    /// Returns the distinct entry links of every feed, `max_items` per feed
    ///
    /// Relative links resolve against the feed URL. Unreachable or
    /// unparseable feeds are skipped.
    pub async fn discover(&self, feeds: &[String]) -> Vec<Url> {
        let mut seen = HashSet::new();
        let mut urls = Vec::new();

        for feed in feeds {
            let Ok(feed_url) = Url::parse(feed) else {
                tracing::warn!("Ignoring invalid feed URL {}", feed);
                continue;
            };
            let Some(xml) = fetch_text(&self.client, feed).await else {
                continue;
            };
            let document = match parse_feed(&xml) {
                Ok(document) => document,
                Err(e) => {
                    tracing::debug!("Ignoring unparseable feed {}: {}", feed, e);
                    continue;
                }
            };

            for link in document.links().into_iter().take(self.max_items) {
                let Some(url) = feed_url
                    .join(link)
                    .ok()
                    .and_then(|joined| normalize_seed(joined.as_str()).ok())
                else {
                    continue;
                };
                if seen.insert(url.as_str().to_string()) {
                    urls.push(url);
                }
            }
        }

        tracing::info!("Feeds yielded {} seed URLs", urls.len());
        urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rss(links: &[String]) -> String {
        let items: String = links
            .iter()
            .map(|link| format!("<item><title>t</title><link>{}</link></item>", link))
            .collect();
        format!(
            r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Blog</title>
            <link>https://blog.test/</link><description>d</description>{}</channel></rss>"#,
            items
        )
    }

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
        <feed xmlns="http://www.w3.org/2005/Atom">
          <title>Blog</title>
          <entry>
            <title>First</title>
            <link rel="edit" href="https://blog.test/edit/1"/>
            <link rel="alternate" href="https://blog.test/posts/1"/>
          </entry>
          <entry>
            <title>Second</title>
            <link href="https://blog.test/posts/2"/>
          </entry>
          <entry><title>No link</title></entry>
        </feed>"#;

    async fn mount(server: &MockServer, at: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    #[test]
    fn test_parse_rss_items() {
        let doc = parse_feed(&rss(&[
            "https://blog.test/a".to_string(),
            " https://blog.test/b ".to_string(),
        ]))
        .unwrap();
        assert_eq!(doc.links(), vec!["https://blog.test/a", "https://blog.test/b"]);
    }

    #[test]
    fn test_parse_atom_prefers_alternate_link() {
        let doc = parse_feed(ATOM).unwrap();
        assert_eq!(
            doc.links(),
            vec!["https://blog.test/posts/1", "https://blog.test/posts/2"]
        );
    }

    #[test]
    fn test_parse_rdf_items() {
        let doc = parse_feed(
            r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns="http://purl.org/rss/1.0/">
              <channel><title>Blog</title></channel>
              <item><title>a</title><link>https://blog.test/rdf</link></item>
            </rdf:RDF>"#,
        )
        .unwrap();
        assert_eq!(doc.links(), vec!["https://blog.test/rdf"]);
    }

    #[tokio::test]
    async fn test_feeds_are_capped_and_deduplicated() {
        let server = MockServer::start().await;
        let base = server.uri();
        mount(
            &server,
            "/rss.xml",
            rss(&[
                format!("{}/a", base),
                "/b#comments".to_string(),
                format!("{}/c", base),
            ]),
        )
        .await;
        mount(&server, "/other.xml", rss(&[format!("{}/a", base)])).await;

        let seeder = FeedSeeder::new(Client::new(), 2);
        let urls = seeder
            .discover(&[
                format!("{}/rss.xml", base),
                format!("{}/missing.xml", base),
                format!("{}/other.xml", base),
            ])
            .await;

        let urls: Vec<String> = urls.iter().map(Url::to_string).collect();
        assert_eq!(urls, vec![format!("{}/a", base), format!("{}/b", base)]);
    }

    #[tokio::test]
    async fn test_unparseable_feed_yields_nothing() {
        let server = MockServer::start().await;
        mount(&server, "/feed", "not xml <<<".to_string()).await;

        let seeder = FeedSeeder::new(Client::new(), 10);
        let urls = seeder.discover(&[format!("{}/feed", server.uri())]).await;
        assert!(urls.is_empty());
    }
}
