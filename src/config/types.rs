use serde::Deserialize;

/// File extensions that are never worth rendering (binary assets)
pub const DEFAULT_DENIED_EXTENSIONS: &[&str] = &[
    "pdf", "zip", "gz", "tar", "rar", "7z", "exe", "dmg", "iso", "png", "jpg", "jpeg", "gif",
    "webp", "svg", "ico", "bmp", "mp3", "mp4", "avi", "mov", "wav", "woff", "woff2", "ttf", "css",
    "js",
];

/// Main configuration structure for Sumi-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub interaction: InteractionConfig,
    #[serde(default)]
    pub sniffing: SniffingConfig,
    #[serde(default)]
    pub snapshots: SnapshotConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub seeding: SeedingConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// URLs pushed to the frontier at depth 0
    #[serde(default)]
    pub start_urls: Vec<String>,

    /// Maximum depth to crawl from seed URLs
    pub max_depth: u32,

    /// Number of fetch workers
    pub concurrency: u32,

    /// Maximum in-flight requests per domain (0 = unbounded)
    #[serde(default)]
    pub per_domain_concurrency: u32,

    /// Minimum time between requests to the same domain (milliseconds)
    #[serde(default = "default_spacing_ms")]
    pub min_request_spacing_ms: u64,

    /// Per-domain spacing overrides
    #[serde(default)]
    pub domain_spacing: Vec<DomainSpacing>,

    /// Navigation retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential navigation backoff (milliseconds)
    #[serde(default = "default_backoff_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_true")]
    pub respect_robots: bool,

    /// Ceiling applied to robots.txt crawl delays (seconds)
    #[serde(default = "default_max_crawl_delay")]
    pub max_crawl_delay_secs: u64,

    #[serde(default)]
    pub follow_external: bool,

    /// Domain patterns (e.g., "example.com" or "*.example.com")
    #[serde(default)]
    pub allow_domains: Vec<String>,

    #[serde(default)]
    pub deny_domains: Vec<String>,

    /// Lowercase extensions without the leading dot
    #[serde(default = "default_denied_extensions")]
    pub denied_extensions: Vec<String>,

    /// Extra settle time after navigation (milliseconds)
    #[serde(default)]
    pub wait_after_load_ms: u64,
}

/// Minimum request spacing for one domain
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DomainSpacing {
    pub domain: String,
    pub min_request_spacing_ms: u64,
}

/// Which render backend drives page loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Http,
    Chrome,
}

/// Render backend configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BrowserConfig {
    #[serde(default = "default_backend")]
    pub backend: BackendKind,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub proxy: Option<String>,

    /// Upper bound the backend enforces on a single page load
    #[serde(default = "default_page_load_timeout")]
    pub page_load_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            user_agent: default_user_agent(),
            proxy: None,
            page_load_timeout_secs: default_page_load_timeout(),
        }
    }
}

/// Deep-interaction steps run after navigation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InteractionConfig {
    #[serde(default)]
    pub scroll: bool,

    #[serde(default = "default_scroll_iterations")]
    pub max_scroll_iterations: u32,

    #[serde(default = "default_interaction_wait")]
    pub scroll_wait_ms: u64,

    /// CSS selectors for "load more"-style controls
    #[serde(default)]
    pub click_selectors: Vec<String>,

    #[serde(default = "default_max_clicks")]
    pub max_clicks: u32,

    #[serde(default = "default_interaction_wait")]
    pub click_wait_ms: u64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            scroll: false,
            max_scroll_iterations: default_scroll_iterations(),
            scroll_wait_ms: default_interaction_wait(),
            click_selectors: Vec::new(),
            max_clicks: default_max_clicks(),
            click_wait_ms: default_interaction_wait(),
        }
    }
}

impl InteractionConfig {
    /// Returns true if any interaction step is configured
    pub fn is_enabled(&self) -> bool {
        self.scroll || !self.click_selectors.is_empty()
    }
}

/// In-page network sniffing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SniffingConfig {
    #[serde(default)]
    pub intercept_network: bool,

    #[serde(default = "default_true")]
    pub capture_bodies: bool,

    #[serde(default = "default_max_hits")]
    pub max_hits_per_page: usize,
}

impl Default for SniffingConfig {
    fn default() -> Self {
        Self {
            intercept_network: false,
            capture_bodies: true,
            max_hits_per_page: default_max_hits(),
        }
    }
}

/// Raw markup / screenshot snapshots
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SnapshotConfig {
    #[serde(default)]
    pub raw_html: bool,

    #[serde(default)]
    pub screenshot: bool,

    #[serde(default = "default_snapshot_dir")]
    pub directory: String,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            raw_html: false,
            screenshot: false,
            directory: default_snapshot_dir(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the append-only JSONL record log
    pub jsonl_path: String,

    /// Path to the SQLite page store
    pub database_path: String,
}

/// Priming passes run before the steady-state crawl
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedingConfig {
    #[serde(default)]
    pub forms: Vec<FormSeed>,

    #[serde(default)]
    pub sitemaps: SitemapSeeding,

    #[serde(default)]
    pub feeds: FeedSeeding,
}

impl SeedingConfig {
    pub fn has_sources(&self) -> bool {
        !self.forms.is_empty() || self.sitemaps.enabled || !self.feeds.urls.is_empty()
    }
}

/// A search form filled once per query to harvest seed links
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FormSeed {
    pub url: String,
    pub input_selector: String,
    pub submit_selector: String,
    pub queries: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SitemapSeeding {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_sitemap_max_urls")]
    pub max_urls: usize,
}

impl Default for SitemapSeeding {
    fn default() -> Self {
        Self {
            enabled: false,
            max_urls: default_sitemap_max_urls(),
        }
    }
}

/// RSS or Atom feeds whose entry links become seeds
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FeedSeeding {
    #[serde(default)]
    pub urls: Vec<String>,

    /// Entries taken from each feed
    #[serde(default = "default_feed_max_items")]
    pub max_items: usize,
}

impl Default for FeedSeeding {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            max_items: default_feed_max_items(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_spacing_ms() -> u64 {
    500
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_denied_extensions() -> Vec<String> {
    DEFAULT_DENIED_EXTENSIONS
        .iter()
        .map(|e| e.to_string())
        .collect()
}

fn default_backend() -> BackendKind {
    BackendKind::Http
}

fn default_user_agent() -> String {
    format!("sumi-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_page_load_timeout() -> u64 {
    30
}

fn default_scroll_iterations() -> u32 {
    10
}

fn default_interaction_wait() -> u64 {
    500
}

fn default_max_clicks() -> u32 {
    5
}

fn default_max_hits() -> usize {
    200
}

fn default_snapshot_dir() -> String {
    "exports/snapshots".to_string()
}

fn default_sitemap_max_urls() -> usize {
    2000
}

fn default_feed_max_items() -> usize {
    500
}

fn default_max_crawl_delay() -> u64 {
    60
}
