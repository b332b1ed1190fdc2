//! Crawler coordinator - main crawl orchestration logic
//!
//! This module wires the collaborators of one run together:
//! - Building the politeness layer and the frontier
//! - Collecting seeds (start URLs, form results, sitemaps)
//! - Running the worker pool until the frontier drains
//! - Delivering shutdown sentinels and collecting the summary

use crate::config::{BackendKind, Config};
use crate::crawler::parser::{Extractor, HtmlExtractor};
use crate::crawler::progress::RunCounters;
use crate::crawler::worker::{CrawlContext, Worker};
use crate::output::{CrawlSummary, JsonlWriter, RecordWriter};
use crate::politeness::PolitenessManager;
use crate::render::{build_http_client, HttpBackend, RenderBackend};
use crate::robots::{origin_key, HttpRobotsFetcher, RobotsCache, RobotsFetcher};
use crate::seeding::{seed_from_forms, FeedSeeder, SitemapSeeder};
use crate::storage::{PageStore, SqliteStore};
use crate::url::normalize_seed;
use crate::Result;
use reqwest::Client;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{JoinError, JoinSet};
use url::Url;

/// Timeout for robots.txt and sitemap requests
const AUXILIARY_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    backend: Arc<dyn RenderBackend>,
    robots: Arc<dyn RobotsFetcher>,
    extractor: Arc<dyn Extractor>,
    store: Arc<dyn PageStore>,
    writer: Arc<dyn RecordWriter>,
    http: Client,
}

impl Coordinator {
    /// Creates a coordinator around explicit collaborators
    ///
    /// Robots.txt and sitemaps are fetched over plain HTTP with the configured
    /// user agent; pages are extracted with [`HtmlExtractor`] unless replaced
    /// with [`Coordinator::with_extractor`].
    pub fn new(
        config: Config,
        backend: Arc<dyn RenderBackend>,
        store: Arc<dyn PageStore>,
        writer: Arc<dyn RecordWriter>,
    ) -> Result<Self> {
        let http = build_http_client(
            &config.browser.user_agent,
            config.browser.proxy.as_deref(),
            AUXILIARY_FETCH_TIMEOUT,
        )?;

        Ok(Self {
            config: Arc::new(config),
            backend,
            robots: Arc::new(HttpRobotsFetcher::new(http.clone())),
            extractor: Arc::new(HtmlExtractor),
            store,
            writer,
            http,
        })
    }

    /// Creates a coordinator with the default collaborators
    ///
    /// Opens the SQLite page store and the JSONL log named in the output
    /// config, and starts the configured render backend.
    pub async fn from_config(config: Config) -> Result<Self> {
        let store = SqliteStore::new(Path::new(&config.output.database_path))?;
        let writer = JsonlWriter::open(Path::new(&config.output.jsonl_path)).await?;

        let timeout = Duration::from_secs(config.browser.page_load_timeout_secs);
        let backend: Arc<dyn RenderBackend> = match config.browser.backend {
            BackendKind::Http => Arc::new(HttpBackend::new(timeout)),
            BackendKind::Chrome => launch_chrome(timeout).await?,
        };

        Self::new(config, backend, Arc::new(store), Arc::new(writer))
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_robots_fetcher(mut self, robots: Arc<dyn RobotsFetcher>) -> Self {
        self.robots = robots;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the crawl to completion
    ///
    /// 1. Seeds the frontier at depth 0
    /// 2. Starts `concurrency` workers
    /// 3. Waits until the frontier drains (or every worker has exited)
    /// 4. Sends one stop sentinel per worker and awaits them all
    ///
    /// Worker errors and panics are logged and counted, never propagated.
    pub async fn run(&self) -> Result<CrawlSummary> {
        let start_time = Instant::now();
        let crawler = &self.config.crawler;

        let robots = RobotsCache::new(self.robots.clone(), self.config.browser.user_agent.clone());
        let ctx = Arc::new(CrawlContext::new(
            self.config.clone(),
            PolitenessManager::new(crawler, robots),
            self.extractor.clone(),
            self.store.clone(),
            self.writer.clone(),
        ));

        let seeds = self.collect_seeds(&ctx).await;
        if seeds.is_empty() {
            tracing::warn!("No seed URL is in scope; nothing to crawl");
        }

        let mut primed = HashSet::new();
        for url in &seeds {
            if primed.insert(origin_key(url)) {
                ctx.politeness.prime(url).await;
            }
        }

        RunCounters::add(&ctx.counters.seeds, seeds.len() as u64);
        for url in seeds {
            ctx.frontier.push_url(url, 0);
        }

        let worker_count = crawler.concurrency as usize;
        tracing::info!(
            "Starting crawl: {} seeds, {} workers, max depth {}",
            ctx.frontier.outstanding(),
            worker_count,
            crawler.max_depth
        );

        let mut workers = JoinSet::new();
        for id in 0..worker_count {
            workers.spawn(Worker::new(id, ctx.clone(), self.backend.clone()).run());
        }

        loop {
            tokio::select! {
                _ = ctx.frontier.join() => break,
                joined = workers.join_next() => match joined {
                    Some(result) => record_worker_exit(result, &ctx.counters),
                    None => {
                        tracing::error!(
                            "Every worker exited with {} items outstanding",
                            ctx.frontier.outstanding()
                        );
                        break;
                    }
                },
            }
        }

        ctx.frontier.close(worker_count);
        while let Some(result) = workers.join_next().await {
            record_worker_exit(result, &ctx.counters);
        }
        self.backend.shutdown().await;

        let summary = ctx.counters.summary(start_time.elapsed());
        tracing::info!(
            "Crawl completed: {} pages scraped, {} stored, {} failed in {:?}",
            summary.pages_scraped,
            summary.pages_stored,
            summary.pages_failed,
            summary.duration
        );

        Ok(summary)
    }

    /// Start URLs, form results, sitemap entries and feed entries, in that order
    ///
    /// Only in-scope URLs are kept, each once.
    async fn collect_seeds(&self, ctx: &CrawlContext) -> Vec<Url> {
        let mut seen = HashSet::new();
        let mut seeds = Vec::new();
        let mut accept = |url: Url, source: &str| {
            if let Err(rejection) = ctx.scope.check(&url) {
                tracing::debug!("Dropping {} seed {} ({:?})", source, url, rejection);
                return;
            }
            if seen.insert(url.as_str().to_string()) {
                seeds.push(url);
            }
        };

        let mut start_urls = Vec::new();
        for raw in &self.config.crawler.start_urls {
            match normalize_seed(raw) {
                Ok(url) => start_urls.push(url),
                Err(e) => tracing::warn!("Ignoring start URL {}: {}", raw, e),
            }
        }
        for url in &start_urls {
            accept(url.clone(), "start");
        }

        let seeding = &self.config.seeding;

        if !seeding.forms.is_empty() {
            match self.backend.new_session(&ctx.session_options()).await {
                Ok(session) => {
                    let found = seed_from_forms(
                        session.as_ref(),
                        &seeding.forms,
                        self.extractor.as_ref(),
                        &ctx.scope,
                        &ctx.politeness,
                        Duration::from_millis(self.config.crawler.wait_after_load_ms),
                    )
                    .await;
                    session.close().await;

                    tracing::info!("Form seeding found {} URLs", found.len());
                    for url in found {
                        accept(url, "form");
                    }
                }
                Err(e) => tracing::warn!("Form seeding skipped: {}", e),
            }
        }

        if seeding.sitemaps.enabled {
            let seeder =
                SitemapSeeder::new(self.http.clone(), self.robots.clone(), seeding.sitemaps.max_urls);
            for url in seeder.discover(&start_urls).await {
                accept(url, "sitemap");
            }
        }

        if !seeding.feeds.urls.is_empty() {
            let seeder = FeedSeeder::new(self.http.clone(), seeding.feeds.max_items);
            for url in seeder.discover(&seeding.feeds.urls).await {
                accept(url, "feed");
            }
        }

        seeds
    }
}

fn record_worker_exit(result: std::result::Result<Result<()>, JoinError>, counters: &RunCounters) {
    match result {
        Ok(Ok(())) => return,
        Ok(Err(e)) => tracing::error!("Worker exited with error: {}", e),
        Err(e) if e.is_panic() => tracing::error!("Worker panicked: {}", e),
        Err(e) => tracing::error!("Worker task failed: {}", e),
    }
    RunCounters::bump(&counters.worker_failures);
}

#[cfg(feature = "chrome")]
async fn launch_chrome(timeout: Duration) -> Result<Arc<dyn RenderBackend>> {
    Ok(Arc::new(crate::render::ChromeBackend::launch(timeout).await?))
}

#[cfg(not(feature = "chrome"))]
async fn launch_chrome(_timeout: Duration) -> Result<Arc<dyn RenderBackend>> {
    Err(crate::render::RenderError::Unsupported(
        "the chrome backend requires the `chrome` feature",
    )
    .into())
}
