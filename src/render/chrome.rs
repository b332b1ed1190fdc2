//! Headless Chromium render backend (CDP via chromiumoxide)
//!
//! One browser process is shared by the run. Every session is its own browser
//! context so cookies and storage never leak between workers; the proxy is
//! applied per context and the user agent per page.

use crate::render::{
    is_api_request, ApiHit, Navigation, RenderBackend, RenderError, RenderPage, RenderResult,
    RenderSession, ResponseBuffer, SessionOptions,
};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventRequestWillBeSent, EventResponseReceived,
    GetResponseBodyParams, RequestId, ResourceType,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

/// Shared headless browser
pub struct ChromeBackend {
    browser: Arc<Browser>,
    handler: JoinHandle<()>,
    page_load_timeout: Duration,
}

impl ChromeBackend {
    /// Launches the browser and spawns its CDP event loop
    pub async fn launch(page_load_timeout: Duration) -> RenderResult<Self> {
        let config = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .request_timeout(page_load_timeout)
            .build()
            .map_err(|e| RenderError::Backend(format!("browser config error: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Backend(format!("browser launch failed: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("CDP handler event error: {}", e);
                }
            }
        });

        tracing::info!("Launched headless browser");

        Ok(Self {
            browser: Arc::new(browser),
            handler,
            page_load_timeout,
        })
    }
}

#[async_trait]
impl RenderBackend for ChromeBackend {
    async fn new_session(&self, options: &SessionOptions) -> RenderResult<Box<dyn RenderSession>> {
        let mut params = CreateBrowserContextParams::default();
        params.dispose_on_detach = Some(true);
        params.proxy_server = options.proxy.clone();

        let context_id = self
            .browser
            .execute(params)
            .await
            .map_err(backend_error)?
            .result
            .browser_context_id;

        Ok(Box::new(ChromeSession {
            browser: self.browser.clone(),
            context_id,
            options: options.clone(),
            page_load_timeout: self.page_load_timeout,
        }))
    }

    async fn shutdown(&self) {
        // Closing requires exclusive access; the CDP loop is stopped instead and
        // the child process is killed when the last handle drops.
        self.handler.abort();
    }
}

struct ChromeSession {
    browser: Arc<Browser>,
    context_id: BrowserContextId,
    options: SessionOptions,
    page_load_timeout: Duration,
}

#[async_trait]
impl RenderSession for ChromeSession {
    async fn open(&self) -> RenderResult<Box<dyn RenderPage>> {
        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(self.context_id.clone())
            .build()
            .map_err(RenderError::Backend)?;

        let page = self.browser.new_page(target).await.map_err(backend_error)?;
        page.set_user_agent(SetUserAgentOverrideParams::new(self.options.user_agent.clone()))
            .await
            .map_err(backend_error)?;
        page.execute(EnableParams::default())
            .await
            .map_err(backend_error)?;

        let documents = Arc::new(Mutex::new(HashMap::new()));
        let buffer = self.options.sniffing.map(ResponseBuffer::new);
        let listener = spawn_listener(&page, documents.clone(), buffer.clone()).await?;

        Ok(Box::new(ChromeTab {
            page,
            documents,
            buffer,
            listener,
            timeout: self.page_load_timeout,
        }))
    }

    async fn close(&self) {
        let params = DisposeBrowserContextParams::new(self.context_id.clone());
        if let Err(e) = self.browser.execute(params).await {
            tracing::debug!("Failed to dispose browser context: {}", e);
        }
    }
}

/// Document responses seen on a page, keyed by URL
type DocumentResponses = Arc<Mutex<HashMap<String, Navigation>>>;

/// Method and headers of requests still awaiting a response
///
/// Entries leave on the response or on a loading failure, so a long-lived
/// page holds only what is in flight.
struct PendingRequests<K> {
    sent: HashMap<K, (String, BTreeMap<String, String>)>,
}

impl<K: Eq + Hash> PendingRequests<K> {
    fn new() -> Self {
        Self {
            sent: HashMap::new(),
        }
    }

    fn record(&mut self, id: K, method: &str, headers: &serde_json::Value) {
        self.sent
            .insert(id, (method.to_string(), header_map(headers)));
    }

    fn forget(&mut self, id: &K) {
        self.sent.remove(id);
    }

    /// Removes the entry; unknown requests are reported as a bare GET
    fn take(&mut self, id: &K) -> (String, BTreeMap<String, String>) {
        self.sent
            .remove(id)
            .unwrap_or_else(|| ("GET".to_string(), BTreeMap::new()))
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.sent.len()
    }
}

/// Watches network events for the page's lifetime
///
/// Records document responses (for the navigation status) and pushes
/// API-looking responses into the sniff buffer.
async fn spawn_listener(
    page: &Page,
    documents: DocumentResponses,
    buffer: Option<ResponseBuffer>,
) -> RenderResult<JoinHandle<()>> {
    let mut requests = page
        .event_listener::<EventRequestWillBeSent>()
        .await
        .map_err(backend_error)?;
    let mut responses = page
        .event_listener::<EventResponseReceived>()
        .await
        .map_err(backend_error)?;
    let mut failures = page
        .event_listener::<EventLoadingFailed>()
        .await
        .map_err(backend_error)?;
    let page = page.clone();

    Ok(tokio::spawn(async move {
        let mut pending: PendingRequests<RequestId> = PendingRequests::new();

        loop {
            tokio::select! {
                Some(event) = requests.next() => {
                    pending.record(
                        event.request_id.clone(),
                        &event.request.method,
                        event.request.headers.inner(),
                    );
                }
                Some(event) = failures.next() => {
                    pending.forget(&event.request_id);
                }
                Some(event) = responses.next() => {
                    let (method, sent_headers) = pending.take(&event.request_id);
                    let status = u16::try_from(event.response.status).unwrap_or(0);

                    if event.r#type == ResourceType::Document {
                        let headers = header_map(event.response.headers.inner());
                        if let Ok(mut documents) = documents.lock() {
                            documents.insert(
                                event.response.url.clone(),
                                Navigation { status, headers },
                            );
                        }
                        continue;
                    }

                    let Some(buffer) = &buffer else { continue };
                    let kind = resource_type_name(&event.r#type);
                    if !is_api_request(&event.response.url, Some(kind)) {
                        continue;
                    }

                    let response_body = if buffer.options().capture_bodies {
                        page.execute(GetResponseBodyParams::new(event.request_id.clone()))
                            .await
                            .ok()
                            .map(|body| body.result.body.clone())
                    } else {
                        None
                    };

                    buffer.push(ApiHit {
                        url: event.response.url.clone(),
                        method,
                        headers: sent_headers,
                        status,
                        response_body,
                    });
                }
                else => break,
            }
        }
    }))
}

struct ChromeTab {
    page: Page,
    documents: DocumentResponses,
    buffer: Option<ResponseBuffer>,
    listener: JoinHandle<()>,
    timeout: Duration,
}

#[async_trait]
impl RenderPage for ChromeTab {
    async fn navigate(&mut self, url: &Url) -> RenderResult<Navigation> {
        match tokio::time::timeout(self.timeout, self.page.goto(url.as_str())).await {
            Err(_) => return Err(RenderError::Timeout(self.timeout)),
            Ok(Err(e)) => return Err(RenderError::Navigation(e.to_string())),
            Ok(Ok(_)) => {}
        }

        let final_url = self
            .page
            .url()
            .await
            .map_err(backend_error)?
            .unwrap_or_else(|| url.to_string());

        let documents = self
            .documents
            .lock()
            .map_err(|_| RenderError::Backend("document map poisoned".to_string()))?;

        // Without a recorded document response (e.g. served from cache) assume success
        Ok(documents
            .get(&final_url)
            .or_else(|| documents.get(url.as_str()))
            .cloned()
            .unwrap_or(Navigation {
                status: 200,
                headers: BTreeMap::new(),
            }))
    }

    async fn content(&mut self) -> RenderResult<String> {
        self.page.content().await.map_err(backend_error)
    }

    async fn evaluate(&mut self, script: &str) -> RenderResult<serde_json::Value> {
        let result = self.page.evaluate(script).await.map_err(backend_error)?;
        Ok(result
            .into_value::<serde_json::Value>()
            .unwrap_or(serde_json::Value::Null))
    }

    async fn click(&mut self, selector: &str) -> RenderResult<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(backend_error)?;
        element.click().await.map_err(backend_error)?;
        Ok(())
    }

    async fn screenshot(&mut self, path: &Path) -> RenderResult<()> {
        let params = ScreenshotParams::builder().full_page(true).build();
        self.page
            .save_screenshot(params, path)
            .await
            .map_err(backend_error)?;
        Ok(())
    }

    fn drain_responses(&mut self) -> Vec<ApiHit> {
        self.buffer
            .as_ref()
            .map(ResponseBuffer::drain)
            .unwrap_or_default()
    }

    async fn close(&mut self) {
        self.listener.abort();
        if let Err(e) = self.page.clone().close().await {
            tracing::debug!("Failed to close page: {}", e);
        }
    }
}

fn resource_type_name(kind: &ResourceType) -> &'static str {
    match kind {
        ResourceType::Xhr => "xhr",
        ResourceType::Fetch => "fetch",
        ResourceType::Document => "document",
        _ => "other",
    }
}

fn header_map(headers: &serde_json::Value) -> BTreeMap<String, String> {
    headers
        .as_object()
        .map(|map| {
            map.iter()
                .map(|(k, v)| {
                    let value = v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string());
                    (k.to_ascii_lowercase(), value)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn backend_error(error: chromiumoxide::error::CdpError) -> RenderError {
    RenderError::Backend(error.to_string())
}
