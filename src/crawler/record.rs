//! Records handed to the persistence sinks

use crate::render::ApiHit;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The full structured result of one page visit
///
/// Built once per successfully rendered page and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeRecord {
    pub url: String,
    pub domain: String,
    pub title: Option<String>,
    pub text: String,
    /// Absolute, normalized links found on the page (before scope filtering)
    pub links: Vec<String>,
    pub meta: BTreeMap<String, String>,
    pub scrape_meta: ScrapeMeta,
}

/// Timing and identity data for one visit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeMeta {
    pub depth: u32,
    pub timestamp: DateTime<Utc>,
    /// HTTP status of the final navigation
    pub status: u16,
    /// Failed navigation attempts before the successful one
    pub retries: u32,
    pub user_agent: String,
    pub proxy: Option<String>,
    pub api_hits: Vec<ApiHit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_snapshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}
