//! Crawl orchestration
//!
//! This module contains the core crawling logic, including:
//! - Sitemap-driven or single-page crawl selection
//! - Strictly sequential, bounded and paced page processing
//! - Cross-page deduplication of extracted records

mod aggregate;
mod coordinator;

pub use aggregate::CrawlAggregate;
pub use coordinator::Coordinator;

use crate::config::Config;
use crate::model::{CrawlReport, CrawlRequest};
use crate::render::{ChromiumLauncher, PageRenderer};
use crate::Result;
use url::Url;

/// Runs a complete crawl with a Chromium renderer
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `request` - Seed URL and correlation ids
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The crawl ran; the report may still be `Failed`
/// * `Err(HarvestError)` - The crawler could not be set up
pub async fn crawl(config: Config, request: &CrawlRequest) -> Result<CrawlReport> {
    let renderer = PageRenderer::new(ChromiumLauncher, config.renderer.clone());
    let coordinator = Coordinator::new(config, renderer)?;
    Ok(coordinator.run(request).await)
}

/// Accepts only absolute http(s) URLs
///
/// Applied to the seed URL and to every page a sitemap lists, so neither can
/// point the browser at `file:`, `data:` or browser-internal pages.
pub fn check_target(raw: &str) -> std::result::Result<(), String> {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(url) => Err(format!("unsupported URL scheme: {}", url.scheme())),
        Err(e) => Err(format!("invalid URL: {}", e)),
    }
}
