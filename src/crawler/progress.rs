//! Live run counters shared by the workers

use crate::output::CrawlSummary;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct RunCounters {
    pub seeds: AtomicU64,
    pub pages_attempted: AtomicU64,
    pub navigation_attempts: AtomicU64,
    pub pages_scraped: AtomicU64,
    pub pages_stored: AtomicU64,
    pub duplicates: AtomicU64,
    pub pages_skipped: AtomicU64,
    pub pages_failed: AtomicU64,
    pub persistence_errors: AtomicU64,
    pub links_enqueued: AtomicU64,
    pub api_hits: AtomicU64,
    pub worker_failures: AtomicU64,
}

impl RunCounters {
    /// Adds `n` to `counter` and returns the new value
    pub fn add(counter: &AtomicU64, n: u64) -> u64 {
        counter.fetch_add(n, Ordering::Relaxed) + n
    }

    pub fn bump(counter: &AtomicU64) -> u64 {
        Self::add(counter, 1)
    }

    pub fn summary(&self, duration: Duration) -> CrawlSummary {
        let get = |counter: &AtomicU64| counter.load(Ordering::Relaxed);

        CrawlSummary {
            seeds: get(&self.seeds),
            pages_attempted: get(&self.pages_attempted),
            navigation_attempts: get(&self.navigation_attempts),
            pages_scraped: get(&self.pages_scraped),
            pages_stored: get(&self.pages_stored),
            duplicates: get(&self.duplicates),
            pages_skipped: get(&self.pages_skipped),
            pages_failed: get(&self.pages_failed),
            persistence_errors: get(&self.persistence_errors),
            links_enqueued: get(&self.links_enqueued),
            api_hits: get(&self.api_hits),
            worker_failures: get(&self.worker_failures),
            duration,
        }
    }
}
