//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest rendering crawler.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use sumi_harvest::config::{load_config_with_hash, BackendKind, Config};
use sumi_harvest::crawler::crawl;
use sumi_harvest::output::{load_statistics, print_statistics, print_summary};
use sumi_harvest::storage::open_storage;
use tracing_subscriber::EnvFilter;

/// Sumi-Harvest: A polite rendering crawler
///
/// Sumi-Harvest renders pages through a browser backend, extracts their
/// text, links, metadata and API traffic, and stores one record per page
/// while respecting robots.txt and per-domain rate limits.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version)]
#[command(about = "A polite rendering crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show page counts from the page store and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_harvest=info,warn"),
            1 => EnvFilter::new("sumi_harvest=debug,info"),
            2 => EnvFilter::new("sumi_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated crawl plan
fn handle_dry_run(config: &Config) {
    let crawler = &config.crawler;
    println!("=== Sumi-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", crawler.max_depth);
    println!("  Workers: {}", crawler.concurrency);
    match crawler.per_domain_concurrency {
        0 => println!("  Per-domain concurrency: unbounded"),
        n => println!("  Per-domain concurrency: {}", n),
    }
    println!("  Request spacing: {}ms", crawler.min_request_spacing_ms);
    for spacing in &crawler.domain_spacing {
        println!(
            "    {}: {}ms",
            spacing.domain, spacing.min_request_spacing_ms
        );
    }
    println!(
        "  Retries: {} (backoff base {}ms)",
        crawler.max_retries, crawler.backoff_base_ms
    );
    println!("  Respect robots.txt: {}", crawler.respect_robots);
    println!("  Follow external links: {}", crawler.follow_external);

    println!("\nBrowser:");
    let backend = match config.browser.backend {
        BackendKind::Http => "http",
        BackendKind::Chrome => "chrome",
    };
    println!("  Backend: {}", backend);
    println!("  User agent: {}", config.browser.user_agent);
    if let Some(proxy) = &config.browser.proxy {
        println!("  Proxy: {}", proxy);
    }
    println!("  Network sniffing: {}", config.sniffing.intercept_network);
    println!(
        "  Deep interaction: {}",
        if config.interaction.is_enabled() { "on" } else { "off" }
    );

    println!("\nOutput:");
    println!("  JSONL: {}", config.output.jsonl_path);
    println!("  Database: {}", config.output.database_path);

    println!("\nStart URLs ({}):", crawler.start_urls.len());
    for url in &crawler.start_urls {
        println!("  - {}", url);
    }
    if !crawler.allow_domains.is_empty() {
        println!("\nAllowed Domains ({}):", crawler.allow_domains.len());
        for domain in &crawler.allow_domains {
            println!("  - {}", domain);
        }
    }
    if !crawler.deny_domains.is_empty() {
        println!("\nDenied Domains ({}):", crawler.deny_domains.len());
        for domain in &crawler.deny_domains {
            println!("  - {}", domain);
        }
    }

    let seeding = &config.seeding;
    let form_queries: usize = seeding.forms.iter().map(|f| f.queries.len()).sum();
    println!("\nSeeding:");
    println!(
        "  Forms: {} ({} queries)",
        seeding.forms.len(),
        form_queries
    );
    if seeding.sitemaps.enabled {
        println!("  Sitemaps: up to {} URLs", seeding.sitemaps.max_urls);
    } else {
        println!("  Sitemaps: off");
    }
    if !seeding.feeds.urls.is_empty() {
        println!(
            "  Feeds: {} (up to {} items each)",
            seeding.feeds.urls.len(),
            seeding.feeds.max_items
        );
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start crawling with {} start URLs",
        crawler.start_urls.len()
    );
}

/// Handles the --stats mode: shows statistics from the page store
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let store = open_storage(Path::new(&config.output.database_path))
        .context("failed to open page store")?;
    let stats = load_statistics(&store).context("failed to read page store")?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Start URLs: {}, form seeds: {}, sitemaps: {}, feeds: {}",
        config.crawler.start_urls.len(),
        config.seeding.forms.len(),
        config.seeding.sitemaps.enabled,
        config.seeding.feeds.urls.len()
    );

    match crawl(config).await {
        Ok(summary) => {
            tracing::info!("Crawl completed successfully");
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
