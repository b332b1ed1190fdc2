//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The shared URL frontier and in-run visited set
//! - Navigation with retry and backoff
//! - Deep interaction (scrolling, "load more" clicks) and snapshots
//! - HTML extraction into scrape records
//! - The worker pool and overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod interaction;
mod parser;
mod progress;
mod record;
mod snapshot;
mod visited;
mod worker;

pub use coordinator::Coordinator;
pub use fetcher::{navigate_with_retry, Navigated, NavigationFailure, RetryPolicy};
pub use frontier::{CrawlTask, DoneGuard, Frontier, FrontierItem};
pub use interaction::{run_interactions, scroll_until_stable, InteractionReport, HEIGHT_SCRIPT};
pub use parser::{parse_html, Extractor, HtmlExtractor, ParsedPage};
pub use progress::RunCounters;
pub use record::{ScrapeMeta, ScrapeRecord};
pub use snapshot::snapshot_stem;
pub use visited::VisitedSet;
pub use worker::{CrawlContext, Worker};

pub use crate::output::CrawlSummary;
pub use crate::render::ApiHit;

use crate::config::Config;
use crate::Result;

/// Runs a complete crawl with the default collaborators
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the page store and the JSONL log
/// 2. Start the configured render backend
/// 3. Seed the frontier and run the worker pool until it drains
/// 4. Return the run summary
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::config::load_config;
/// use sumi_harvest::crawler::crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let summary = crawl(config).await?;
/// println!("{} pages stored", summary.pages_stored);
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: Config) -> Result<CrawlSummary> {
    Coordinator::from_config(config).await?.run().await
}
