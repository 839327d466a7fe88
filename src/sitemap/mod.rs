//! Sitemap discovery and flattening
//!
//! This module finds a site's `sitemap.xml` and turns it, including nested
//! sitemap indexes, into one ordered list of page URLs. Failures never reach
//! the caller: a missing or broken sitemap is reported as absence, and a
//! broken child sitemap contributes nothing while its siblings still resolve.

mod fetcher;
mod parser;

pub use fetcher::{build_http_client, fetch_text};
pub use parser::{parse_sitemap, SitemapDocument};

use futures::future::{BoxFuture, FutureExt};
use reqwest::Client;
use std::collections::HashSet;
use thiserror::Error;

/// Sitemap retrieval and parsing errors
#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("malformed sitemap XML: {0}")]
    Xml(String),

    #[error("unexpected root element <{0}>")]
    UnexpectedRoot(String),

    #[error("document has no root element")]
    Empty,
}

/// Builds the conventional sitemap location for a site
///
/// Plain concatenation, tolerating a trailing slash on the base.
pub fn sitemap_location(base_url: &str) -> String {
    if base_url.ends_with('/') {
        format!("{}sitemap.xml", base_url)
    } else {
        format!("{}/sitemap.xml", base_url)
    }
}

/// True when a body opens with an XML declaration
///
/// Leading whitespace and a UTF-8 byte order mark are skipped.
pub fn looks_like_xml(body: &str) -> bool {
    body.trim_start_matches(|c: char| c == '\u{feff}' || c.is_whitespace())
        .starts_with("<?xml")
}

/// Resolves sitemaps over HTTP
#[derive(Debug, Clone)]
pub struct SitemapResolver {
    client: Client,
    max_depth: u32,
}

impl SitemapResolver {
    /// Creates a resolver
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used for every sitemap request
    /// * `max_depth` - Deepest index nesting followed; the root sitemap is depth 0
    pub fn new(client: Client, max_depth: u32) -> Self {
        Self { client, max_depth }
    }

    /// Looks for `{base_url}/sitemap.xml`
    ///
    /// # Returns
    ///
    /// * `Some(url)` - The probe answered 2xx with a body that starts with `<?xml`
    /// * `None` - Anything else, including transport errors
    pub async fn probe_sitemap(&self, base_url: &str) -> Option<String> {
        let candidate = sitemap_location(base_url);
        tracing::debug!("Probing for sitemap at {}", candidate);

        match fetch_text(&self.client, &candidate).await {
            Ok(body) if looks_like_xml(&body) => {
                tracing::info!("Found sitemap at {}", candidate);
                Some(candidate)
            }
            Ok(_) => {
                tracing::debug!("{} is not an XML document", candidate);
                None
            }
            Err(e) => {
                tracing::debug!("No sitemap: {}", e);
                None
            }
        }
    }

    /// Flattens a sitemap into page URLs
    ///
    /// Children of a sitemap index are resolved in document order and their
    /// URLs concatenated. A sitemap already visited during this call
    /// contributes nothing the second time, and branches deeper than the
    /// configured depth are skipped. Duplicate page URLs are preserved.
    pub async fn resolve_urls(&self, sitemap_url: &str) -> Vec<String> {
        let mut visited = HashSet::new();
        let urls = self
            .resolve_branch(sitemap_url.to_string(), 0, &mut visited)
            .await;

        tracing::info!(
            "Resolved {} URLs from {} ({} sitemaps visited)",
            urls.len(),
            sitemap_url,
            visited.len()
        );
        urls
    }

    fn resolve_branch<'a>(
        &'a self,
        sitemap_url: String,
        depth: u32,
        visited: &'a mut HashSet<String>,
    ) -> BoxFuture<'a, Vec<String>> {
        async move {
            if depth > self.max_depth {
                tracing::warn!(
                    "Skipping {}: sitemap nesting exceeds depth {}",
                    sitemap_url,
                    self.max_depth
                );
                return Vec::new();
            }

            if !visited.insert(sitemap_url.clone()) {
                tracing::debug!("Already visited {}, skipping", sitemap_url);
                return Vec::new();
            }

            let document = match fetch_text(&self.client, &sitemap_url).await {
                Ok(body) => parse_sitemap(&body),
                Err(e) => Err(e),
            };

            match document {
                Ok(SitemapDocument::UrlSet(urls)) => {
                    tracing::debug!("{} lists {} URLs", sitemap_url, urls.len());
                    urls
                }
                Ok(SitemapDocument::Index(children)) => {
                    tracing::debug!(
                        "{} is an index of {} sitemaps",
                        sitemap_url,
                        children.len()
                    );
                    let mut urls = Vec::new();
                    for child in children {
                        urls.extend(self.resolve_branch(child, depth + 1, &mut *visited).await);
                    }
                    urls
                }
                Err(e) => {
                    tracing::warn!("Failed to load sitemap {}: {}", sitemap_url, e);
                    Vec::new()
                }
            }
        }
        .boxed()
    }
}
