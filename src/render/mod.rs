//! Render backends
//!
//! A backend hands out isolated sessions (one per worker); a session opens a
//! page per visit. Two implementations ship with the crate: a static HTTP
//! backend and, behind the `chrome` feature, headless Chromium over CDP.

mod http;
mod sniffer;

#[cfg(feature = "chrome")]
mod chrome;

#[cfg(test)]
pub(crate) mod scripted;

pub use http::{build_http_client, HttpBackend};
pub use sniffer::{is_api_request, ApiHit, ResponseBuffer, SniffOptions};

#[cfg(feature = "chrome")]
pub use chrome::ChromeBackend;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised by render backends
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Page load timed out after {0:?}")]
    Timeout(Duration),

    #[error("Operation not supported by this backend: {0}")]
    Unsupported(&'static str),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for render operations
pub type RenderResult<T> = std::result::Result<T, RenderError>;

/// Outcome of a page load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
}

impl Navigation {
    /// HTTP status ≥ 400 counts as a failed navigation
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

/// Identity and capture settings for one worker's session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub user_agent: String,
    pub proxy: Option<String>,
    /// Some when in-page network traffic should be captured
    pub sniffing: Option<SniffOptions>,
}

/// Shared render engine (one per run)
#[async_trait]
pub trait RenderBackend: Send + Sync {
    /// Creates an isolated browsing session
    async fn new_session(&self, options: &SessionOptions) -> RenderResult<Box<dyn RenderSession>>;

    /// Tears the engine down once every worker has exited
    async fn shutdown(&self) {}
}

/// Isolated browsing context (cookies and storage are not shared between sessions)
#[async_trait]
pub trait RenderSession: Send + Sync {
    async fn open(&self) -> RenderResult<Box<dyn RenderPage>>;

    async fn close(&self) {}
}

/// One page visit
#[async_trait]
pub trait RenderPage: Send {
    /// Loads `url`; fails on timeout, DNS, TLS or connection errors
    async fn navigate(&mut self, url: &Url) -> RenderResult<Navigation>;

    /// Current rendered markup
    async fn content(&mut self) -> RenderResult<String>;

    async fn evaluate(&mut self, script: &str) -> RenderResult<serde_json::Value>;

    async fn click(&mut self, selector: &str) -> RenderResult<()>;

    async fn screenshot(&mut self, path: &Path) -> RenderResult<()>;

    /// Takes the API hits observed since the last drain
    fn drain_responses(&mut self) -> Vec<ApiHit>;

    async fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_error_status() {
        let ok = Navigation {
            status: 200,
            headers: BTreeMap::new(),
        };
        let redirect = Navigation {
            status: 304,
            ..ok.clone()
        };
        let missing = Navigation {
            status: 404,
            ..ok.clone()
        };
        let server = Navigation {
            status: 503,
            ..ok.clone()
        };

        assert!(!ok.is_error());
        assert!(!redirect.is_error());
        assert!(missing.is_error());
        assert!(server.is_error());
    }
}
