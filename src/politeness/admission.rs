//! Per-domain admission control
//!
//! Bounds in-flight requests per domain with a counting permit and enforces a
//! minimum spacing between admissions to the same domain.

use crate::config::CrawlerConfig;
use crate::state::DomainState;
use crate::url::matches_wildcard;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Upper bound on the spacing of a single admission
pub const MAX_SPACING: Duration = Duration::from_secs(24 * 60 * 60);

/// A permit representing one in-flight request slot for a domain
///
/// Dropping the token releases the slot.
#[derive(Debug)]
pub struct AdmissionToken {
    domain: String,
    admitted_at: Instant,
    _permit: Option<OwnedSemaphorePermit>,
}

impl AdmissionToken {
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Instant the spacing wait ended and the request was allowed through
    pub fn admitted_at(&self) -> Instant {
        self.admitted_at
    }
}

struct DomainSlot {
    state: Mutex<DomainState>,
    permits: Option<Arc<Semaphore>>,
}

/// Rate and concurrency admission controller, keyed by domain
pub struct AdmissionController {
    slots: Mutex<HashMap<String, Arc<DomainSlot>>>,
    default_spacing: Duration,
    spacing_overrides: Vec<(String, Duration)>,
    per_domain_concurrency: u32,
}

impl AdmissionController {
    pub fn new(config: &CrawlerConfig) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            default_spacing: Duration::from_millis(config.min_request_spacing_ms),
            spacing_overrides: config
                .domain_spacing
                .iter()
                .map(|o| (o.domain.clone(), Duration::from_millis(o.min_request_spacing_ms)))
                .collect(),
            per_domain_concurrency: config.per_domain_concurrency,
        }
    }

    /// Configured spacing for a domain (first matching override, else the global default)
    pub fn spacing_for(&self, domain: &str) -> Duration {
        self.spacing_overrides
            .iter()
            .find(|(pattern, _)| matches_wildcard(pattern, domain))
            .map(|(_, spacing)| *spacing)
            .unwrap_or(self.default_spacing)
    }

    /// Waits for a domain slot and returns the token holding it
    ///
    /// `extra_delay` (a robots.txt crawl delay) raises the spacing for this
    /// admission when it exceeds the configured value.
    pub async fn acquire(&self, domain: &str, extra_delay: Option<Duration>) -> AdmissionToken {
        let slot = self.slot(domain);

        let permit = match &slot.permits {
            // The semaphore is never closed, so acquisition only fails on shutdown
            Some(permits) => permits.clone().acquire_owned().await.ok(),
            None => None,
        };

        let spacing = self
            .spacing_for(domain)
            .max(extra_delay.unwrap_or(Duration::ZERO))
            .min(MAX_SPACING);

        let wait = lock(&slot.state).reserve_slot(spacing, Instant::now());
        if !wait.is_zero() {
            tracing::debug!("Waiting {:?} before requesting {}", wait, domain);
            tokio::time::sleep(wait).await;
        }

        AdmissionToken {
            domain: domain.to_string(),
            admitted_at: Instant::now(),
            _permit: permit,
        }
    }

    /// Number of requests admitted to a domain so far
    pub fn request_count(&self, domain: &str) -> u64 {
        lock(&self.slots)
            .get(domain)
            .map(|slot| lock(&slot.state).request_count)
            .unwrap_or(0)
    }

    fn slot(&self, domain: &str) -> Arc<DomainSlot> {
        let mut slots = lock(&self.slots);
        slots
            .entry(domain.to_string())
            .or_insert_with(|| {
                Arc::new(DomainSlot {
                    state: Mutex::new(DomainState::new()),
                    permits: (self.per_domain_concurrency > 0)
                        .then(|| Arc::new(Semaphore::new(self.per_domain_concurrency as usize))),
                })
            })
            .clone()
    }
}

/// Locks a mutex, recovering the data if a previous holder panicked
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
