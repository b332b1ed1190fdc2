//! Statistics generation
//!
//! This module provides functionality for extracting and displaying
//! statistics from the page store and from a finished run.

use crate::output::CrawlSummary;
use crate::storage::{SqliteStore, StorageResult};

/// Page store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStatistics {
    /// Total number of stored pages
    pub total_pages: u64,

    /// Page counts per domain, largest first
    pub pages_by_domain: Vec<(String, u64)>,
}

/// Loads statistics from the page store
pub fn load_statistics(store: &SqliteStore) -> StorageResult<StoreStatistics> {
    Ok(StoreStatistics {
        total_pages: store.count_pages()?,
        pages_by_domain: store.count_by_domain()?,
    })
}

/// Prints store statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Page Store Statistics ===\n");

    println!("Overview:");
    println!("  Total pages stored: {}", stats.total_pages);
    println!("  Unique domains: {}", stats.pages_by_domain.len());
    println!();

    if stats.pages_by_domain.is_empty() {
        return;
    }

    println!("Pages by Domain:");
    for (domain, count) in &stats.pages_by_domain {
        let percentage = if stats.total_pages > 0 {
            (*count as f64 / stats.total_pages as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", domain, count, percentage);
    }
}

/// Prints the end-of-run summary to stdout
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");
    println!("  Seeds: {}", summary.seeds);
    println!(
        "  Pages attempted: {} ({} navigation attempts)",
        summary.pages_attempted, summary.navigation_attempts
    );
    println!("  Pages scraped: {}", summary.pages_scraped);
    println!(
        "  Pages stored: {} ({} already present)",
        summary.pages_stored, summary.duplicates
    );
    println!("  Pages skipped: {}", summary.pages_skipped);
    println!("  Pages failed: {}", summary.pages_failed);
    println!("  Links enqueued: {}", summary.links_enqueued);
    println!("  API hits captured: {}", summary.api_hits);

    if summary.persistence_errors > 0 {
        println!("  Persistence errors: {}", summary.persistence_errors);
    }
    if summary.worker_failures > 0 {
        println!("  Worker failures: {}", summary.worker_failures);
    }

    println!("  Duration: {:.1}s", summary.duration.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{ScrapeMeta, ScrapeRecord};
    use crate::storage::PageStore;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn record(url: &str, domain: &str) -> ScrapeRecord {
        ScrapeRecord {
            url: url.to_string(),
            domain: domain.to_string(),
            title: None,
            text: String::new(),
            links: Vec::new(),
            meta: BTreeMap::new(),
            scrape_meta: ScrapeMeta {
                depth: 0,
                timestamp: Utc::now(),
                status: 200,
                retries: 0,
                user_agent: "TestBot".to_string(),
                proxy: None,
                api_hits: Vec::new(),
                html_snapshot: None,
                screenshot: None,
            },
        }
    }

    #[test]
    fn test_load_statistics() {
        let store = SqliteStore::new_in_memory().unwrap();
        store.insert(&record("https://b.com/", "b.com")).unwrap();
        store.insert(&record("https://a.com/1", "a.com")).unwrap();
        store.insert(&record("https://a.com/2", "a.com")).unwrap();

        let stats = load_statistics(&store).unwrap();
        assert_eq!(stats.total_pages, 3);
        assert_eq!(stats.pages_by_domain[0], ("a.com".to_string(), 2));
    }

    #[test]
    fn test_empty_store() {
        let store = SqliteStore::new_in_memory().unwrap();
        assert_eq!(load_statistics(&store).unwrap(), StoreStatistics::default());
    }
}
