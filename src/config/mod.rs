//! Configuration module for Sumi-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BackendKind, BrowserConfig, Config, CrawlerConfig, DomainSpacing, FeedSeeding, FormSeed,
    InteractionConfig, OutputConfig, SeedingConfig, SitemapSeeding, SnapshotConfig,
    SniffingConfig, DEFAULT_DENIED_EXTENSIONS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

/// Minimal valid configuration for unit tests, adjusted by `adjust`
#[cfg(test)]
pub(crate) fn test_config(adjust: impl FnOnce(&mut Config)) -> Config {
    let mut config = parse_config(
        r#"
[crawler]
start-urls = ["https://example.com/"]
max-depth = 1
concurrency = 1
min-request-spacing-ms = 0
backoff-base-ms = 10

[output]
jsonl-path = "pages.jsonl"
database-path = "pages.db"
"#,
    )
    .expect("test config must parse");
    adjust(&mut config);
    config
}

/// Crawler section of [`test_config`], adjusted by `adjust`
#[cfg(test)]
pub(crate) fn test_crawler_config(adjust: impl FnOnce(&mut CrawlerConfig)) -> CrawlerConfig {
    let mut crawler = test_config(|_| {}).crawler;
    adjust(&mut crawler);
    crawler
}
