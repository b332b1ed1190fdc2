//! Output sink traits and types
//!
//! This module defines the append-only record writer interface and the
//! summary returned at the end of a crawl.

use crate::crawler::ScrapeRecord;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Append-only record sink
///
/// One record per call; the record must be durable when `write` returns.
#[async_trait]
pub trait RecordWriter: Send + Sync {
    async fn write(&self, record: &ScrapeRecord) -> OutputResult<()>;
}

/// Counters for one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// URLs pushed to the frontier at depth 0
    pub seeds: u64,

    /// Items that went through navigation
    pub pages_attempted: u64,

    /// Navigation attempts, retries included
    pub navigation_attempts: u64,

    /// Pages rendered and extracted
    pub pages_scraped: u64,

    /// Records newly written to the page store
    pub pages_stored: u64,

    /// Records the page store already had
    pub duplicates: u64,

    /// Items skipped before admission (visited, out of scope, robots, stored)
    pub pages_skipped: u64,

    /// Items abandoned after retries or extraction failure
    pub pages_failed: u64,

    /// Sink failures (writer or store)
    pub persistence_errors: u64,

    /// Links pushed back to the frontier
    pub links_enqueued: u64,

    /// API responses captured across all pages
    pub api_hits: u64,

    /// Workers that exited abnormally
    pub worker_failures: u64,

    pub duration: Duration,
}
