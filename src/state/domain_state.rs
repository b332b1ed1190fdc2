use std::time::Duration;
use tokio::time::Instant;

/// Tracks the request-spacing state of a domain during crawling
///
/// The slot bookkeeping lives here; the caller guards a `DomainState` with a
/// mutex and performs the returned wait after releasing it.
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    /// Number of requests admitted to this domain in the current crawl
    pub request_count: u64,

    /// Admission instant of the most recent request (may lie in the future
    /// when that request is still waiting for its slot)
    pub last_request_time: Option<Instant>,
}

impl DomainState {
    /// Creates a new DomainState with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, spacing: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        match last.checked_add(spacing) {
            Some(ready_at) => (ready_at > now).then(|| ready_at - now),
            // beyond the clock's range: wait the full spacing from now
            None => Some(spacing),
        }
    }

    /// Reserves the next admission slot and returns how long to wait for it
    ///
    /// Check and update happen in one call so two callers holding the lock in
    /// turn always get slots at least `spacing` apart.
    pub fn reserve_slot(&mut self, spacing: Duration, now: Instant) -> Duration {
        let wait = self
            .time_until_next_request(spacing, now)
            .unwrap_or(Duration::ZERO);
        self.record_request(now.checked_add(wait).unwrap_or(now));
        wait
    }

    /// Records that a request was admitted at `at`
    pub fn record_request(&mut self, at: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(at);
    }
}
