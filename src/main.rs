//! Page-Harvest main entry point
//!
//! This is the command-line interface for the Page-Harvest storefront crawler.

use anyhow::Context;
use clap::Parser;
use page_harvest::config::{load_config_with_hash, Config};
use page_harvest::crawler::{crawl, Coordinator};
use page_harvest::model::CrawlRequest;
use page_harvest::render::{ChromiumLauncher, PageRenderer};
use page_harvest::server::{self, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Page-Harvest: a bounded storefront crawler
///
/// Page-Harvest renders a site's pages in headless Chromium (following its
/// sitemap when one exists) and extracts product and article records from
/// the rendered markup.
#[derive(Parser, Debug)]
#[command(name = "page-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A bounded storefront crawler", long_about = None)]
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

    /// Crawl this URL once and print the report as JSON
    #[arg(long, value_name = "URL", conflicts_with_all = ["serve", "dry_run"])]
    url: Option<String>,

    /// Website id forwarded to the delivery service
    #[arg(long, requires = "url")]
    website_id: Option<String>,

    /// Chatbot id forwarded to the delivery service
    #[arg(long, requires = "url")]
    chatbot_id: Option<String>,

    /// Serve `GET /scrape` on the configured address (default mode)
    #[arg(long, conflicts_with = "dry_run")]
    serve: bool,

    /// Validate config and print the effective settings without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if let Some(url) = cli.url {
        let request = CrawlRequest {
            url,
            website_id: cli.website_id,
            chatbot_id: cli.chatbot_id,
        };
        handle_crawl(config, &request).await?;
    } else {
        if !cli.serve {
            tracing::debug!("No --url given, starting the HTTP front end");
        }
        handle_serve(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("page_harvest=info,warn"),
            1 => EnvFilter::new("page_harvest=debug,info"),
            2 => EnvFilter::new("page_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    // Logs go to stderr so `--url` output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: prints the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Page-Harvest Dry Run ===\n");

    println!("Crawler:");
    println!("  Max URLs per crawl: {}", config.crawler.max_urls);
    println!("  Delay between pages: {}ms", config.crawler.page_delay_ms);
    println!("  Max sitemap depth: {}", config.crawler.max_sitemap_depth);
    println!("  HTTP timeout: {}ms", config.crawler.http_timeout_ms);

    println!("\nRenderer:");
    println!("  User agent: {}", config.renderer.user_agent);
    println!("  Accept-Language: {}", config.renderer.accept_language);
    println!("  Headless: {}", config.renderer.headless);
    if let Some(path) = &config.renderer.chrome_path {
        println!("  Chrome: {}", path);
    }
    println!("  Wait until: {:?}", config.renderer.wait_until);
    println!(
        "  Navigation: {} attempts, {}ms timeout, {}ms backoff",
        config.renderer.max_navigation_attempts,
        config.renderer.navigation_timeout_ms,
        config.renderer.retry_backoff_ms
    );
    println!(
        "  Capabilities: detect-challenge={}, lazy-load={}, stealth={}",
        config.renderer.detect_challenge, config.renderer.lazy_load, config.renderer.stealth
    );

    println!("\nDelivery:");
    match &config.delivery.classify_endpoint {
        Some(endpoint) => println!(
            "  Classify: {} (fallback {})",
            endpoint,
            if config.delivery.classify_fallback { "on" } else { "off" }
        ),
        None => println!("  Classify: disabled"),
    }
    match &config.delivery.save_endpoint {
        Some(endpoint) => println!("  Save: {}", endpoint),
        None => println!("  Save: disabled"),
    }

    println!("\nServer:");
    println!("  Bind: {}", config.server.bind);

    println!("\n✓ Configuration is valid");
}

/// Handles the --url mode: one crawl, report on stdout
async fn handle_crawl(config: Config, request: &CrawlRequest) -> anyhow::Result<()> {
    let report = crawl(config, request)
        .await
        .context("failed to set up crawler")?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// Handles the default mode: the HTTP front end
async fn handle_serve(config: Config) -> anyhow::Result<()> {
    let bind = config.server.bind.clone();
    let renderer = PageRenderer::new(ChromiumLauncher, config.renderer.clone());
    let coordinator = Coordinator::new(config, renderer).context("failed to set up crawler")?;
    let state = Arc::new(AppState::new(coordinator));

    server::start(&bind, state).await
}
