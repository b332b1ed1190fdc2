use crate::config::types::{
    Config, CrawlerConfig, InteractionConfig, OutputConfig, SeedingConfig,
};
use crate::ConfigError;
use url::Url;

/// One hour
const MAX_SPACING_MS: u64 = 3_600_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler, &config.seeding)?;
    validate_interaction_config(&config.interaction)?;
    validate_output_config(&config.output)?;
    validate_seeding_config(&config.seeding)?;
    if let Some(proxy) = &config.browser.proxy {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(
    config: &CrawlerConfig,
    seeding: &SeedingConfig,
) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.start_urls.is_empty() && !seeding.has_sources() {
        return Err(ConfigError::Validation(
            "start-urls cannot be empty unless a seeding source is configured".to_string(),
        ));
    }

    for seed in &config.start_urls {
        validate_http_url(seed, "start URL")?;
    }

    for spacing in std::iter::once(config.min_request_spacing_ms)
        .chain(config.domain_spacing.iter().map(|d| d.min_request_spacing_ms))
    {
        if spacing > MAX_SPACING_MS {
            return Err(ConfigError::Validation(format!(
                "min-request-spacing-ms must be <= {}, got {}",
                MAX_SPACING_MS, spacing
            )));
        }
    }

    if config.max_crawl_delay_secs > MAX_SPACING_MS / 1000 {
        return Err(ConfigError::Validation(format!(
            "max-crawl-delay-secs must be <= {}, got {}",
            MAX_SPACING_MS / 1000,
            config.max_crawl_delay_secs
        )));
    }

    if config.backoff_base_ms > 60_000 {
        return Err(ConfigError::Validation(format!(
            "backoff-base-ms must be <= 60000, got {}",
            config.backoff_base_ms
        )));
    }

    for pattern in config.allow_domains.iter().chain(&config.deny_domains) {
        validate_domain_pattern(pattern)?;
    }

    for entry in &config.domain_spacing {
        validate_domain_pattern(&entry.domain)?;
    }

    for ext in &config.denied_extensions {
        if ext.is_empty() || ext.starts_with('.') {
            return Err(ConfigError::Validation(format!(
                "denied extension '{}' must be non-empty and have no leading dot",
                ext
            )));
        }
    }

    Ok(())
}

fn validate_interaction_config(config: &InteractionConfig) -> Result<(), ConfigError> {
    if config.max_scroll_iterations > 1000 {
        return Err(ConfigError::Validation(format!(
            "max-scroll-iterations must be <= 1000, got {}",
            config.max_scroll_iterations
        )));
    }

    if config.click_selectors.iter().any(|s| s.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "click-selectors cannot contain empty selectors".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.jsonl_path.is_empty() {
        return Err(ConfigError::Validation(
            "jsonl-path cannot be empty".to_string(),
        ));
    }

    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_seeding_config(config: &SeedingConfig) -> Result<(), ConfigError> {
    for form in &config.forms {
        validate_http_url(&form.url, "form URL")?;

        if form.input_selector.trim().is_empty() || form.submit_selector.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "Form seed '{}' needs both an input and a submit selector",
                form.url
            )));
        }

        if form.queries.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Form seed '{}' must have at least one query",
                form.url
            )));
        }
    }

    for feed in &config.feeds.urls {
        validate_http_url(feed, "feed URL")?;
    }

    Ok(())
}

fn validate_http_url(raw: &str, what: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", what, raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            what, raw
        )));
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    match pattern.strip_prefix("*.") {
        Some(domain) => validate_domain_string(domain),
        None => validate_domain_string(pattern),
    }
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}
