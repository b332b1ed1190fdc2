//! Static HTTP render backend
//!
//! Fetches documents with reqwest and serves the response body as the
//! rendered markup. Script evaluation, clicks and screenshots are not
//! available; the worker treats those as failed interaction steps.

use crate::render::{
    is_api_request, ApiHit, Navigation, RenderBackend, RenderError, RenderPage, RenderResult,
    RenderSession, ResponseBuffer, SessionOptions,
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Proxy};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Accept header sent with document requests
const ACCEPT_DOCUMENTS: &str = "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8";

/// Builds an HTTP client with the session's identity
///
/// # Arguments
///
/// * `user_agent` - Sent with every request
/// * `proxy` - Optional proxy URL applied to all schemes
/// * `timeout` - Upper bound on a single request, including the body
pub fn build_http_client(
    user_agent: &str,
    proxy: Option<&str>,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

/// Render backend that performs plain HTTP GETs
pub struct HttpBackend {
    page_load_timeout: Duration,
}

impl HttpBackend {
    pub fn new(page_load_timeout: Duration) -> Self {
        Self { page_load_timeout }
    }
}

#[async_trait]
impl RenderBackend for HttpBackend {
    async fn new_session(&self, options: &SessionOptions) -> RenderResult<Box<dyn RenderSession>> {
        let client = build_http_client(
            &options.user_agent,
            options.proxy.as_deref(),
            self.page_load_timeout,
        )
        .map_err(|e| RenderError::Backend(format!("failed to build HTTP client: {}", e)))?;

        Ok(Box::new(HttpSession {
            client,
            options: options.clone(),
            timeout: self.page_load_timeout,
        }))
    }
}

struct HttpSession {
    client: Client,
    options: SessionOptions,
    timeout: Duration,
}

#[async_trait]
impl RenderSession for HttpSession {
    async fn open(&self) -> RenderResult<Box<dyn RenderPage>> {
        Ok(Box::new(HttpPage {
            client: self.client.clone(),
            user_agent: self.options.user_agent.clone(),
            timeout: self.timeout,
            body: None,
            buffer: self.options.sniffing.map(ResponseBuffer::new),
        }))
    }
}

struct HttpPage {
    client: Client,
    user_agent: String,
    timeout: Duration,
    body: Option<String>,
    buffer: Option<ResponseBuffer>,
}

#[async_trait]
impl RenderPage for HttpPage {
    async fn navigate(&mut self, url: &Url) -> RenderResult<Navigation> {
        let request = self
            .client
            .get(url.clone())
            .header(ACCEPT, ACCEPT_DOCUMENTS)
            .build()
            .map_err(|e| classify_error(e, self.timeout))?;

        // The client adds its user agent at send time
        let mut sent = header_map(request.headers());
        sent.entry(USER_AGENT.as_str().to_string())
            .or_insert_with(|| self.user_agent.clone());

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| classify_error(e, self.timeout))?;

        let status = response.status().as_u16();
        let headers = header_map(response.headers());
        let final_url = response.url().to_string();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));

        let body = response
            .text()
            .await
            .map_err(|e| classify_error(e, self.timeout))?;

        if let Some(buffer) = &self.buffer {
            if is_json || is_api_request(&final_url, None) {
                buffer.push(ApiHit {
                    url: final_url,
                    method: "GET".to_string(),
                    headers: sent,
                    status,
                    response_body: Some(body.clone()),
                });
            }
        }

        self.body = Some(body);
        Ok(Navigation { status, headers })
    }

    async fn content(&mut self) -> RenderResult<String> {
        self.body
            .clone()
            .ok_or_else(|| RenderError::Backend("no document loaded".to_string()))
    }

    async fn evaluate(&mut self, _script: &str) -> RenderResult<serde_json::Value> {
        Err(RenderError::Unsupported("script evaluation"))
    }

    async fn click(&mut self, _selector: &str) -> RenderResult<()> {
        Err(RenderError::Unsupported("click"))
    }

    async fn screenshot(&mut self, _path: &Path) -> RenderResult<()> {
        Err(RenderError::Unsupported("screenshot"))
    }

    fn drain_responses(&mut self) -> Vec<ApiHit> {
        self.buffer
            .as_ref()
            .map(ResponseBuffer::drain)
            .unwrap_or_default()
    }
}

fn classify_error(error: reqwest::Error, timeout: Duration) -> RenderError {
    if error.is_timeout() {
        RenderError::Timeout(timeout)
    } else {
        RenderError::Navigation(error.to_string())
    }
}

fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}
