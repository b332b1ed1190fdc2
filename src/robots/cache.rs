//! Per-host robots.txt cache with fail-open background population
//!
//! The first query for a host schedules exactly one background fetch and is
//! answered "allowed". Until that fetch lands, every other query for the host
//! is answered the same way. Entries older than 24 hours are refetched in the
//! background while the stale rules keep being served.

use crate::robots::{ParsedRobots, RobotsFetcher};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Cached robots.txt data for a host
#[derive(Debug, Clone)]
pub struct CachedRobots {
    /// The parsed robots.txt content
    pub content: Arc<ParsedRobots>,

    /// When the robots.txt was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(content: ParsedRobots) -> Self {
        Self {
            content: Arc::new(content),
            fetched_at: Utc::now(),
        }
    }

    /// Checks if the cached robots.txt is stale (older than 24 hours)
    pub fn is_stale(&self) -> bool {
        Utc::now() - self.fetched_at > ChronoDuration::hours(24)
    }
}

#[derive(Debug, Clone)]
struct HostEntry {
    rules: Option<CachedRobots>,
    fetch_in_flight: bool,
}

/// Shared exclusion-rules cache, keyed by origin (`scheme://host:port`)
pub struct RobotsCache {
    entries: Arc<Mutex<HashMap<String, HostEntry>>>,
    fetcher: Arc<dyn RobotsFetcher>,
    user_agent: String,
}

impl RobotsCache {
    pub fn new(fetcher: Arc<dyn RobotsFetcher>, user_agent: impl Into<String>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            fetcher,
            user_agent: user_agent.into(),
        }
    }

    /// Checks whether `url` may be fetched
    ///
    /// Fails open: returns `true` whenever the host's rules are not cached yet.
    pub fn is_allowed(&self, url: &Url) -> bool {
        match self.lookup(url) {
            Some(rules) => rules.is_allowed(url.as_str(), &self.user_agent),
            None => true,
        }
    }

    /// Returns the crawl delay declared for our user agent, if the rules are cached
    pub fn crawl_delay(&self, url: &Url) -> Option<Duration> {
        self.lookup(url)?.crawl_delay(&self.user_agent)
    }

    /// Returns true once the host's rules have been fetched
    pub fn is_cached(&self, url: &Url) -> bool {
        let key = origin_key(url);
        self.entries
            .lock()
            .map(|entries| entries.get(&key).is_some_and(|e| e.rules.is_some()))
            .unwrap_or(false)
    }

    /// Returns cached rules, scheduling a background fetch when missing or stale
    fn lookup(&self, url: &Url) -> Option<Arc<ParsedRobots>> {
        let key = origin_key(url);

        let (rules, spawn_fetch) = {
            let Ok(mut entries) = self.entries.lock() else {
                return None;
            };
            let entry = entries.entry(key.clone()).or_insert(HostEntry {
                rules: None,
                fetch_in_flight: false,
            });

            let needs_fetch = entry.rules.as_ref().map_or(true, CachedRobots::is_stale);
            let spawn_fetch = needs_fetch && !entry.fetch_in_flight;
            if spawn_fetch {
                entry.fetch_in_flight = true;
            }

            (entry.rules.as_ref().map(|r| r.content.clone()), spawn_fetch)
        };

        if spawn_fetch {
            self.spawn_fetch(key);
        }

        rules
    }

    fn spawn_fetch(&self, origin: String) {
        let entries = self.entries.clone();
        let fetcher = self.fetcher.clone();

        tokio::spawn(async move {
            tracing::debug!("Fetching robots.txt for {}", origin);
            let body = fetcher.fetch(&origin).await;
            store_rules(&entries, &origin, &body);
        });
    }

    /// Fetches the host's rules inline unless they are cached or already being fetched
    ///
    /// Used to warm the cache for seed hosts before workers start.
    pub async fn prime(&self, url: &Url) {
        let key = origin_key(url);
        {
            let Ok(mut entries) = self.entries.lock() else {
                return;
            };
            let entry = entries.entry(key.clone()).or_insert(HostEntry {
                rules: None,
                fetch_in_flight: false,
            });
            if entry.rules.is_some() || entry.fetch_in_flight {
                return;
            }
            entry.fetch_in_flight = true;
        }

        let body = self.fetcher.fetch(&key).await;
        store_rules(&self.entries, &key, &body);
    }
}

fn store_rules(entries: &Mutex<HashMap<String, HostEntry>>, origin: &str, body: &str) {
    let rules = ParsedRobots::from_content(body);

    if let Ok(mut entries) = entries.lock() {
        let entry = entries.entry(origin.to_string()).or_insert(HostEntry {
            rules: None,
            fetch_in_flight: true,
        });
        entry.rules = Some(CachedRobots::new(rules));
        entry.fetch_in_flight = false;
    }
    tracing::debug!("Cached robots.txt for {}", origin);
}

/// Cache key for a URL's host
pub fn origin_key(url: &Url) -> String {
    url.origin().ascii_serialization()
}
