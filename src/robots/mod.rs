//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching robots.txt files.

mod cache;
mod parser;

pub use cache::{origin_key, CachedRobots, RobotsCache};
pub use parser::ParsedRobots;

use async_trait::async_trait;
use reqwest::Client;

/// Source of raw robots.txt bodies
///
/// Implementations never fail: any error or non-2xx response is reported as
/// an empty body, which parses to an allow-all ruleset.
#[async_trait]
pub trait RobotsFetcher: Send + Sync {
    /// Fetches `{origin}/robots.txt`
    async fn fetch(&self, origin: &str) -> String;
}

/// Fetches robots.txt over HTTP
pub struct HttpRobotsFetcher {
    client: Client,
}

impl HttpRobotsFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RobotsFetcher for HttpRobotsFetcher {
    async fn fetch(&self, origin: &str) -> String {
        let robots_url = format!("{}/robots.txt", origin.trim_end_matches('/'));

        let response = match self.client.get(&robots_url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("robots.txt fetch failed for {}: {}", origin, e);
                return String::new();
            }
        };

        if !response.status().is_success() {
            tracing::debug!(
                "robots.txt for {} returned HTTP {}, treating as allow-all",
                origin,
                response.status()
            );
            return String::new();
        }

        response.text().await.unwrap_or_default()
    }
}
