//! Domain politeness
//!
//! Combines the per-host robots.txt cache with per-domain admission control.
//! Workers ask `is_allowed` before admission and then `acquire` a token that
//! is held for the whole fetch.

mod admission;

pub use admission::{AdmissionController, AdmissionToken, MAX_SPACING};

use crate::config::CrawlerConfig;
use crate::robots::RobotsCache;
use std::time::Duration;
use url::Url;

/// Shared politeness state owned by the coordinator
pub struct PolitenessManager {
    /// None when robots.txt is not respected
    robots: Option<RobotsCache>,
    admission: AdmissionController,
    max_crawl_delay: Duration,
}

impl PolitenessManager {
    pub fn new(config: &CrawlerConfig, robots: RobotsCache) -> Self {
        Self {
            robots: config.respect_robots.then_some(robots),
            admission: AdmissionController::new(config),
            max_crawl_delay: Duration::from_secs(config.max_crawl_delay_secs),
        }
    }

    /// Exclusion check; fails open while the host's rules are being fetched
    pub fn is_allowed(&self, url: &Url) -> bool {
        self.robots.as_ref().map_or(true, |robots| robots.is_allowed(url))
    }

    /// Fetches the URL host's robots.txt now, when robots.txt is respected
    pub async fn prime(&self, url: &Url) {
        if let Some(robots) = &self.robots {
            robots.prime(url).await;
        }
    }

    /// Robots.txt crawl delay for the URL's host, if cached
    ///
    /// Capped at the configured `max-crawl-delay-secs`.
    pub fn crawl_delay(&self, url: &Url) -> Option<Duration> {
        self.robots
            .as_ref()
            .and_then(|robots| robots.crawl_delay(url))
            .map(|delay| delay.min(self.max_crawl_delay))
    }

    /// Waits until a request to `url`'s domain may proceed
    ///
    /// The robots.txt crawl delay, when larger than the configured spacing,
    /// is honored as the spacing for this admission.
    pub async fn acquire(&self, domain: &str, url: &Url) -> AdmissionToken {
        let crawl_delay = self.crawl_delay(url);
        self.admission.acquire(domain, crawl_delay).await
    }

    /// Releases an admission slot; never blocks
    pub fn release(&self, token: AdmissionToken) {
        tracing::trace!("Releasing admission for {}", token.domain());
        drop(token);
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }
}
