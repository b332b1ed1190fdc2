//! Seed discovery beyond the configured start URLs
//!
//! - Form-driven seeding: submit search forms, harvest result links
//! - Sitemap seeding: read sitemaps listed in robots.txt or at well-known paths
//! - Feed seeding: take entry links from RSS and Atom feeds

mod feed;
mod forms;
mod sitemap;

pub use feed::{parse_feed, FeedDocument, FeedSeeder};
pub use forms::{fill_script, seed_from_forms};
pub use sitemap::{parse_sitemap, SitemapDocument, SitemapEntry, SitemapSeeder};

use reqwest::Client;

/// GETs `location` and returns the body of a 2xx response
///
/// Failures are logged at debug level and yield None.
pub(crate) async fn fetch_text(client: &Client, location: &str) -> Option<String> {
    let response = match client.get(location).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("Fetch failed for {}: {}", location, e);
            return None;
        }
    };

    if !response.status().is_success() {
        tracing::debug!("{} returned HTTP {}", location, response.status());
        return None;
    }

    response.text().await.ok()
}
