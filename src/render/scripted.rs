//! In-memory render backend for deterministic tests

use crate::render::{
    ApiHit, Navigation, RenderBackend, RenderError, RenderPage, RenderResult, RenderSession,
    SessionOptions,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use url::Url;

/// Script that reads the document height
pub(crate) const HEIGHT_SCRIPT: &str = "document.body.scrollHeight";

#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedPage {
    pub html: String,
    pub status: u16,
    /// Navigation errors to raise before the page loads
    pub failures: u32,
    pub api_hits: Vec<ApiHit>,
    /// Successive values returned by the page-height script
    pub heights: VecDeque<i64>,
    /// Remaining successful clicks per selector
    pub clickable: HashMap<String, u32>,
}

#[derive(Debug, Default)]
struct ScriptState {
    pages: HashMap<String, ScriptedPage>,
    attempts: Vec<String>,
    sessions: Vec<SessionOptions>,
    scripts: Vec<String>,
    clicks: Vec<String>,
}

/// Backend serving canned pages keyed by URL
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedBackend {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `html` with status 200 at `url`
    pub fn page(self, url: &str, html: &str) -> Self {
        self.with_page(url, |p| p.html = html.to_string())
    }

    /// Adjusts (or creates) the canned page at `url`
    pub fn with_page(self, url: &str, adjust: impl FnOnce(&mut ScriptedPage)) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let page = state.pages.entry(url.to_string()).or_insert(ScriptedPage {
                status: 200,
                ..Default::default()
            });
            adjust(page);
        }
        self
    }

    /// Every navigation attempt so far, in order
    pub fn attempts(&self) -> Vec<String> {
        self.state.lock().unwrap().attempts.clone()
    }

    pub fn attempts_for(&self, url: &str) -> usize {
        self.attempts().iter().filter(|u| u.as_str() == url).count()
    }

    pub fn sessions(&self) -> Vec<SessionOptions> {
        self.state.lock().unwrap().sessions.clone()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.state.lock().unwrap().scripts.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }
}

#[async_trait]
impl RenderBackend for ScriptedBackend {
    async fn new_session(&self, options: &SessionOptions) -> RenderResult<Box<dyn RenderSession>> {
        self.state.lock().unwrap().sessions.push(options.clone());
        Ok(Box::new(ScriptedSession {
            state: self.state.clone(),
        }))
    }
}

struct ScriptedSession {
    state: Arc<Mutex<ScriptState>>,
}

#[async_trait]
impl RenderSession for ScriptedSession {
    async fn open(&self) -> RenderResult<Box<dyn RenderPage>> {
        Ok(Box::new(ScriptedTab {
            state: self.state.clone(),
            current: None,
            pending_hits: Vec::new(),
        }))
    }
}

struct ScriptedTab {
    state: Arc<Mutex<ScriptState>>,
    current: Option<String>,
    pending_hits: Vec<ApiHit>,
}

#[async_trait]
impl RenderPage for ScriptedTab {
    async fn navigate(&mut self, url: &Url) -> RenderResult<Navigation> {
        let mut state = self.state.lock().unwrap();
        state.attempts.push(url.to_string());

        let Some(page) = state.pages.get_mut(url.as_str()) else {
            self.current = None;
            return Ok(Navigation {
                status: 404,
                headers: BTreeMap::new(),
            });
        };

        if page.failures > 0 {
            page.failures -= 1;
            return Err(RenderError::Navigation(format!("scripted failure for {}", url)));
        }

        self.current = Some(url.to_string());
        self.pending_hits = page.api_hits.clone();
        Ok(Navigation {
            status: page.status,
            headers: BTreeMap::new(),
        })
    }

    async fn content(&mut self) -> RenderResult<String> {
        let state = self.state.lock().unwrap();
        self.current
            .as_ref()
            .and_then(|url| state.pages.get(url))
            .map(|page| page.html.clone())
            .ok_or_else(|| RenderError::Backend("no document loaded".to_string()))
    }

    async fn evaluate(&mut self, script: &str) -> RenderResult<serde_json::Value> {
        let mut state = self.state.lock().unwrap();
        state.scripts.push(script.to_string());

        if script != HEIGHT_SCRIPT {
            return Ok(serde_json::Value::Null);
        }

        let url = self.current.clone().unwrap_or_default();
        let Some(page) = state.pages.get_mut(&url) else {
            return Err(RenderError::Backend("no document loaded".to_string()));
        };
        let height = if page.heights.len() > 1 {
            page.heights.pop_front()
        } else {
            page.heights.front().copied()
        };
        Ok(serde_json::json!(height.unwrap_or(0)))
    }

    async fn click(&mut self, selector: &str) -> RenderResult<()> {
        let mut state = self.state.lock().unwrap();
        let url = self.current.clone().unwrap_or_default();
        let remaining = state
            .pages
            .get_mut(&url)
            .and_then(|page| page.clickable.get_mut(selector));

        match remaining {
            Some(n) if *n > 0 => {
                *n -= 1;
                state.clicks.push(selector.to_string());
                Ok(())
            }
            _ => Err(RenderError::Backend(format!("no element matches {}", selector))),
        }
    }

    async fn screenshot(&mut self, path: &Path) -> RenderResult<()> {
        tokio::fs::write(path, b"scripted-png").await?;
        Ok(())
    }

    fn drain_responses(&mut self) -> Vec<ApiHit> {
        std::mem::take(&mut self.pending_hits)
    }
}
