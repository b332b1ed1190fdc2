//! Passive capture of in-page API traffic
//!
//! Backends push observed responses into a [`ResponseBuffer`] while a page is
//! open; the worker drains it once before building the page's record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// One API-looking response observed during a page visit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiHit {
    pub url: String,
    pub method: String,
    /// Headers sent with the request
    pub headers: BTreeMap<String, String>,
    pub status: u16,
    pub response_body: Option<String>,
}

/// Options for network interception on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SniffOptions {
    pub capture_bodies: bool,
    pub max_hits: usize,
}

/// Classifies a response as API traffic
///
/// XHR/fetch requests always count; otherwise the URL is checked for the
/// usual API markers.
pub fn is_api_request(url: &str, resource_type: Option<&str>) -> bool {
    if let Some(kind) = resource_type {
        let kind = kind.to_ascii_lowercase();
        if kind == "xhr" || kind == "fetch" {
            return true;
        }
    }

    let url = url.to_ascii_lowercase();
    let path = url.split(['?', '#']).next().unwrap_or("");

    url.contains("/api/") || path.ends_with(".json") || url.contains("graphql")
}

/// Bounded, shareable buffer of API hits for a single page visit
#[derive(Debug, Clone)]
pub struct ResponseBuffer {
    inner: Arc<Mutex<BufferInner>>,
    options: SniffOptions,
}

#[derive(Debug, Default)]
struct BufferInner {
    hits: Vec<ApiHit>,
    dropped: usize,
}

impl ResponseBuffer {
    pub fn new(options: SniffOptions) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BufferInner::default())),
            options,
        }
    }

    pub fn options(&self) -> SniffOptions {
        self.options
    }

    /// Records a hit; returns false once the buffer is full
    ///
    /// Bodies are stripped when body capture is disabled.
    pub fn push(&self, mut hit: ApiHit) -> bool {
        if !self.options.capture_bodies {
            hit.response_body = None;
        }

        let Ok(mut inner) = self.inner.lock() else {
            return false;
        };
        if inner.hits.len() >= self.options.max_hits {
            inner.dropped += 1;
            return false;
        }
        inner.hits.push(hit);
        true
    }

    /// Takes every buffered hit, leaving the buffer empty
    pub fn drain(&self) -> Vec<ApiHit> {
        match self.inner.lock() {
            Ok(mut inner) => {
                if inner.dropped > 0 {
                    tracing::debug!("Dropped {} API hits over the per-page limit", inner.dropped);
                    inner.dropped = 0;
                }
                std::mem::take(&mut inner.hits)
            }
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.hits.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
