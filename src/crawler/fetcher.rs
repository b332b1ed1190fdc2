//! Page navigation with bounded retry
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | Navigation error (DNS, TLS, connect, timeout) | Retry with backoff |
//! | HTTP status ≥ 400 | Retry with backoff |
//! | Retries exhausted | Give up; the item is abandoned |
//!
//! After a failed attempt `a` (0-based) the worker sleeps `base * 2^a`.

use crate::config::CrawlerConfig;
use crate::render::{Navigation, RenderPage};
use std::time::Duration;
use url::Url;

/// Retry budget for one navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
        }
    }

    /// Delay after failed attempt `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// A successful navigation
#[derive(Debug, Clone)]
pub struct Navigated {
    pub navigation: Navigation,
    /// Failed attempts before this one
    pub retries: u32,
}

/// Every attempt failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationFailure {
    pub attempts: u32,
    pub last_error: String,
}

/// Navigates `page` to `url`, retrying failures per `policy`
pub async fn navigate_with_retry(
    page: &mut dyn RenderPage,
    url: &Url,
    policy: RetryPolicy,
) -> Result<Navigated, NavigationFailure> {
    let mut attempt = 0;

    loop {
        let error = match page.navigate(url).await {
            Ok(navigation) if !navigation.is_error() => {
                return Ok(Navigated {
                    navigation,
                    retries: attempt,
                });
            }
            Ok(navigation) => format!("HTTP {}", navigation.status),
            Err(e) => e.to_string(),
        };

        if attempt >= policy.max_retries {
            return Err(NavigationFailure {
                attempts: attempt + 1,
                last_error: error,
            });
        }

        let delay = policy.backoff(attempt);
        tracing::debug!(
            "Navigation to {} failed ({}), retry {}/{} in {:?}",
            url,
            error,
            attempt + 1,
            policy.max_retries,
            delay
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
