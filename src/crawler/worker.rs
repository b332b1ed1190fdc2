//! Fetch workers
//!
//! Each worker owns one render session and loops over the frontier until it
//! pops a stop sentinel. Per item it walks the [`WorkerState`] cycle:
//!
//! ```text
//! Idle -> Dequeued -> Admitted -> Navigating -> Rendering -> Extracting -> Persisting -> Idle
//!            |                         |             |            |
//!            +-> Idle (skipped)        +-------------+------------+-> Errored -> Idle
//! ```
//!
//! Every popped item is marked done exactly once, on every exit path.

use crate::config::Config;
use crate::crawler::fetcher::{navigate_with_retry, RetryPolicy};
use crate::crawler::frontier::{CrawlTask, Frontier, FrontierItem};
use crate::crawler::interaction::run_interactions;
use crate::crawler::parser::Extractor;
use crate::crawler::progress::RunCounters;
use crate::crawler::record::{ScrapeMeta, ScrapeRecord};
use crate::crawler::snapshot;
use crate::crawler::visited::VisitedSet;
use crate::output::RecordWriter;
use crate::politeness::PolitenessManager;
use crate::render::{RenderBackend, RenderPage, RenderSession, SessionOptions, SniffOptions};
use crate::state::WorkerState;
use crate::storage::{InsertOutcome, PageStore};
use crate::url::{extract_domain, resolve_links, ScopeRejection, ScopeRules};
use crate::{HarvestError, Result};
use chrono::Utc;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// State shared by every worker of one run
pub struct CrawlContext {
    pub config: Arc<Config>,
    pub frontier: Frontier,
    pub politeness: PolitenessManager,
    pub visited: VisitedSet,
    pub scope: ScopeRules,
    pub extractor: Arc<dyn Extractor>,
    pub store: Arc<dyn PageStore>,
    pub writer: Arc<dyn RecordWriter>,
    pub counters: RunCounters,
}

impl CrawlContext {
    pub fn new(
        config: Arc<Config>,
        politeness: PolitenessManager,
        extractor: Arc<dyn Extractor>,
        store: Arc<dyn PageStore>,
        writer: Arc<dyn RecordWriter>,
    ) -> Self {
        Self {
            scope: ScopeRules::from_config(&config.crawler),
            config,
            frontier: Frontier::new(),
            politeness,
            visited: VisitedSet::new(),
            extractor,
            store,
            writer,
            counters: RunCounters::default(),
        }
    }

    /// Session identity and capture settings for every worker
    pub fn session_options(&self) -> SessionOptions {
        let sniffing = &self.config.sniffing;

        SessionOptions {
            user_agent: self.config.browser.user_agent.clone(),
            proxy: self.config.browser.proxy.clone(),
            sniffing: sniffing.intercept_network.then_some(SniffOptions {
                capture_bodies: sniffing.capture_bodies,
                max_hits: sniffing.max_hits_per_page,
            }),
        }
    }
}

/// Why a dequeued item was dropped before admission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipReason {
    TooDeep,
    OutOfScope(ScopeRejection),
    RobotsDisallowed,
    AlreadyVisited,
    AlreadyStored,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooDeep => write!(f, "beyond max depth"),
            Self::OutOfScope(rejection) => write!(f, "out of scope: {:?}", rejection),
            Self::RobotsDisallowed => write!(f, "disallowed by robots.txt"),
            Self::AlreadyVisited => write!(f, "already visited"),
            Self::AlreadyStored => write!(f, "already stored"),
        }
    }
}

/// A rendered and extracted page, ready for the sinks
struct Visit {
    record: ScrapeRecord,
    links: Vec<Url>,
}

/// One member of the worker pool
pub struct Worker {
    id: usize,
    state: WorkerState,
    ctx: Arc<CrawlContext>,
    backend: Arc<dyn RenderBackend>,
    policy: RetryPolicy,
}

impl Worker {
    pub fn new(id: usize, ctx: Arc<CrawlContext>, backend: Arc<dyn RenderBackend>) -> Self {
        let policy = RetryPolicy::from_config(&ctx.config.crawler);
        Self {
            id,
            state: WorkerState::Idle,
            ctx,
            backend,
            policy,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Processes frontier items until a stop sentinel arrives
    pub async fn run(mut self) -> Result<()> {
        let session = self
            .backend
            .new_session(&self.ctx.session_options())
            .await?;
        tracing::debug!("Worker {} started", self.id);

        loop {
            let task = match self.ctx.frontier.pop().await {
                FrontierItem::Work(task) => task,
                FrontierItem::Stop => break,
            };

            let ctx = self.ctx.clone();
            let _done = ctx.frontier.done_guard();

            if let Err(e) = self.process(session.as_ref(), task).await {
                tracing::error!("Worker {}: {}", self.id, e);
                self.state = WorkerState::Idle;
            }
        }

        session.close().await;
        tracing::debug!("Worker {} stopped", self.id);
        Ok(())
    }

    async fn process(&mut self, session: &dyn RenderSession, task: CrawlTask) -> Result<()> {
        self.transition(WorkerState::Dequeued)?;

        if let Some(reason) = self.skip_reason(&task) {
            tracing::debug!("Skipping {} ({})", task.url, reason);
            RunCounters::bump(&self.ctx.counters.pages_skipped);
            return self.transition(WorkerState::Idle);
        }

        // skip_reason rejects URLs without a host
        let domain = extract_domain(&task.url).unwrap_or_default();
        let token = self.ctx.politeness.acquire(&domain, &task.url).await;
        self.transition(WorkerState::Admitted)?;
        tracing::debug!("Worker {} admitted {} (depth {})", self.id, task.url, task.depth);

        if let Some(visit) = self.visit(session, &task, &domain).await? {
            self.transition(WorkerState::Persisting)?;
            self.persist(&visit.record).await;
            self.enqueue_links(&task, visit.links);
        }

        self.ctx.politeness.release(token);
        self.transition(WorkerState::Idle)
    }

    /// Pre-admission checks; claims the URL in the visited set when it passes
    fn skip_reason(&self, task: &CrawlTask) -> Option<SkipReason> {
        let ctx = &self.ctx;

        if task.depth > ctx.config.crawler.max_depth {
            return Some(SkipReason::TooDeep);
        }
        if ctx.visited.contains(&task.url) {
            return Some(SkipReason::AlreadyVisited);
        }
        if let Err(rejection) = ctx.scope.check(&task.url) {
            return Some(SkipReason::OutOfScope(rejection));
        }
        if !ctx.politeness.is_allowed(&task.url) {
            return Some(SkipReason::RobotsDisallowed);
        }

        match ctx.store.exists(task.url.as_str()) {
            Ok(true) => return Some(SkipReason::AlreadyStored),
            Ok(false) => {}
            Err(e) => tracing::warn!("Store lookup failed for {}: {}", task.url, e),
        }

        if !ctx.visited.insert(&task.url) {
            return Some(SkipReason::AlreadyVisited);
        }

        None
    }

    /// Navigates, renders and extracts one page
    ///
    /// Returns `None` when the item was abandoned (state is then `Errored`).
    async fn visit(
        &mut self,
        session: &dyn RenderSession,
        task: &CrawlTask,
        domain: &str,
    ) -> Result<Option<Visit>> {
        self.transition(WorkerState::Navigating)?;
        RunCounters::bump(&self.ctx.counters.pages_attempted);

        let mut page = match session.open().await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Could not open a page for {}: {}", task.url, e);
                return self.abandon();
            }
        };

        let visit = self.visit_page(page.as_mut(), task, domain).await;
        page.close().await;
        visit
    }

    async fn visit_page(
        &mut self,
        page: &mut dyn RenderPage,
        task: &CrawlTask,
        domain: &str,
    ) -> Result<Option<Visit>> {
        let ctx = self.ctx.clone();
        let config = &ctx.config;

        let navigated = navigate_with_retry(page, &task.url, self.policy).await;
        let attempts = match &navigated {
            Ok(n) => n.retries + 1,
            Err(failure) => failure.attempts,
        };
        RunCounters::add(&ctx.counters.navigation_attempts, u64::from(attempts));

        let navigated = match navigated {
            Ok(navigated) => navigated,
            Err(failure) => {
                tracing::warn!(
                    "Giving up on {} after {} attempts: {}",
                    task.url,
                    failure.attempts,
                    failure.last_error
                );
                return self.abandon();
            }
        };

        self.transition(WorkerState::Rendering)?;

        if config.crawler.wait_after_load_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.crawler.wait_after_load_ms)).await;
        }

        if config.interaction.is_enabled() {
            let report = run_interactions(page, &config.interaction).await;
            tracing::debug!(
                "Interaction on {}: {} scrolls, {} clicks",
                task.url,
                report.scrolls,
                report.clicks
            );
        }

        let snapshot_dir = Path::new(&config.snapshots.directory);
        let screenshot = if config.snapshots.screenshot {
            take_screenshot(page, snapshot_dir, &task.url).await
        } else {
            None
        };

        let markup = match page.content().await {
            Ok(markup) => markup,
            Err(e) => {
                tracing::warn!("Could not capture markup for {}: {}", task.url, e);
                return self.abandon();
            }
        };

        let html_snapshot = if config.snapshots.raw_html {
            match snapshot::save_html(snapshot_dir, &task.url, &markup).await {
                Ok(path) => Some(path.display().to_string()),
                Err(e) => {
                    tracing::warn!("Could not save HTML snapshot for {}: {}", task.url, e);
                    None
                }
            }
        } else {
            None
        };

        self.transition(WorkerState::Extracting)?;

        let parsed = match ctx.extractor.extract(&task.url, &markup) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("{}", e);
                return self.abandon();
            }
        };

        let api_hits = page.drain_responses();
        RunCounters::add(&ctx.counters.api_hits, api_hits.len() as u64);

        let links = resolve_links(&parsed.links, &task.url);

        let scraped = RunCounters::bump(&ctx.counters.pages_scraped);
        if scraped % 10 == 0 {
            tracing::info!(
                "Progress: {} pages scraped, {} queued, {} in flight",
                scraped,
                ctx.frontier.len(),
                ctx.frontier.outstanding()
            );
        }

        let record = ScrapeRecord {
            url: task.url.to_string(),
            domain: domain.to_string(),
            title: parsed.title,
            text: parsed.text,
            links: links.iter().map(Url::to_string).collect(),
            meta: parsed.meta,
            scrape_meta: ScrapeMeta {
                depth: task.depth,
                timestamp: Utc::now(),
                status: navigated.navigation.status,
                retries: navigated.retries,
                user_agent: config.browser.user_agent.clone(),
                proxy: config.browser.proxy.clone(),
                api_hits,
                html_snapshot,
                screenshot,
            },
        };

        Ok(Some(Visit { record, links }))
    }

    /// Hands the record to both sinks; failures are logged, never fatal
    async fn persist(&self, record: &ScrapeRecord) {
        let counters = &self.ctx.counters;

        if let Err(e) = self.ctx.writer.write(record).await {
            tracing::warn!("Failed to write record for {}: {}", record.url, e);
            RunCounters::bump(&counters.persistence_errors);
        }

        match self.ctx.store.insert(record) {
            Ok(InsertOutcome::Inserted) => {
                RunCounters::bump(&counters.pages_stored);
            }
            Ok(InsertOutcome::Duplicate) => {
                tracing::debug!("{} already stored", record.url);
                RunCounters::bump(&counters.duplicates);
            }
            Err(e) => {
                tracing::warn!("Failed to store {}: {}", record.url, e);
                RunCounters::bump(&counters.persistence_errors);
            }
        }
    }

    fn enqueue_links(&self, task: &CrawlTask, links: Vec<Url>) {
        let ctx = &self.ctx;
        let next_depth = task.depth + 1;
        if next_depth > ctx.config.crawler.max_depth {
            return;
        }

        let mut enqueued = 0;
        for link in links {
            if ctx.visited.contains(&link) {
                continue;
            }
            if let Err(rejection) = ctx.scope.check_link(&link, &task.url) {
                tracing::trace!("Not following {} ({:?})", link, rejection);
                continue;
            }
            ctx.frontier.push_url(link, next_depth);
            enqueued += 1;
        }

        if enqueued > 0 {
            tracing::debug!("Enqueued {} links from {}", enqueued, task.url);
            RunCounters::add(&ctx.counters.links_enqueued, enqueued);
        }
    }

    fn abandon(&mut self) -> Result<Option<Visit>> {
        RunCounters::bump(&self.ctx.counters.pages_failed);
        self.transition(WorkerState::Errored)?;
        Ok(None)
    }

    fn transition(&mut self, next: WorkerState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!("Worker {}: {} -> {}", self.id, self.state, next);
        self.state = next;
        Ok(())
    }
}

async fn take_screenshot(page: &mut dyn RenderPage, dir: &Path, url: &Url) -> Option<String> {
    let path = match snapshot::screenshot_path(dir, url).await {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!("Could not prepare screenshot directory: {}", e);
            return None;
        }
    };

    match page.screenshot(&path).await {
        Ok(()) => Some(path.display().to_string()),
        Err(e) => {
            tracing::warn!("Screenshot of {} failed: {}", url, e);
            None
        }
    }
}
