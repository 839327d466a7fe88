//! HTTP fetcher for sitemap discovery
//!
//! This module handles the plain HTTP requests made outside the browser:
//! - Building the shared HTTP client with the configured user agent
//! - GET requests for `sitemap.xml` probes and sitemap documents
//! - Error classification (transport failure vs. non-success status)

use super::SitemapError;
use crate::config::Config;
use reqwest::Client;
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// The client identifies itself with the renderer's user agent so that
/// sitemap probes look like the browser that later renders the pages.
///
/// # Arguments
///
/// * `config` - The full configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use page_harvest::config::Config;
/// use page_harvest::sitemap::build_http_client;
///
/// let client = build_http_client(&Config::default()).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_millis(config.crawler.http_timeout_ms);

    Client::builder()
        .user_agent(config.renderer.user_agent.clone())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and returns its body as text
///
/// # Returns
///
/// * `Ok(String)` - The response body of a 2xx response
/// * `Err(SitemapError::Status)` - The server answered with a non-success status
/// * `Err(SitemapError::Http)` - Transport failure (connect, timeout, body read)
pub async fn fetch_text(client: &Client, url: &str) -> Result<String, SitemapError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| SitemapError::Http {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(SitemapError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(|source| SitemapError::Http {
        url: url.to_string(),
        source,
    })
}
