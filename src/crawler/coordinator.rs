//! Crawler coordinator - main crawl orchestration logic
//!
//! This module sequences one crawl:
//! - Probing for a sitemap and choosing single-page or full-site mode
//! - Bounding the sitemap's URL list
//! - Rendering, extracting and (optionally) classifying each page in order
//! - Folding page results into the cross-page aggregate
//! - Handing the final records to the delivery gateway

use crate::config::Config;
use crate::crawler::{check_target, CrawlAggregate};
use crate::delivery::{DeliveryGateway, DeliveryOutcome};
use crate::extract::extract_records;
use crate::model::{
    ArticleRecord, CrawlReport, CrawlRequest, PageReport, PageResult, ProductRecord, SiteReport,
    FULL_SITE_STATUS,
};
use crate::render::{PageSource, RenderError, RenderedPage};
use crate::sitemap::{build_http_client, SitemapResolver};
use crate::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main crawler coordinator structure
pub struct Coordinator<S> {
    config: Arc<Config>,
    resolver: SitemapResolver,
    source: S,
    gateway: Option<DeliveryGateway>,
}

impl<S: PageSource> Coordinator<S> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `source` - Renders pages; usually a [`crate::render::PageRenderer`]
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - An HTTP client could not be built
    pub fn new(config: Config, source: S) -> Result<Self> {
        let client = build_http_client(&config)?;
        let resolver = SitemapResolver::new(client, config.crawler.max_sitemap_depth);
        let gateway = DeliveryGateway::from_config(&config.delivery)?;

        Ok(Self {
            config: Arc::new(config),
            resolver,
            source,
            gateway,
        })
    }

    /// Renders one page without extracting or delivering anything
    ///
    /// Exercises the whole browser pipeline (launch, navigate, sanitize,
    /// release) and returns the size of the sanitized markup.
    pub async fn check_render(&self, url: &str) -> std::result::Result<usize, RenderError> {
        let page = self.source.render(url).await?;
        Ok(page.html.len())
    }

    /// Runs one crawl to completion
    ///
    /// A sitemap at `{url}/sitemap.xml` selects full-site mode; otherwise only
    /// the seed page is rendered. Per-page failures in full-site mode are
    /// counted and skipped. In single-page mode a render failure becomes
    /// [`CrawlReport::Failed`].
    pub async fn run(&self, request: &CrawlRequest) -> CrawlReport {
        tracing::info!("Starting crawl of {}", request.url);
        let start_time = Instant::now();

        let report = match self.resolver.probe_sitemap(&request.url).await {
            Some(sitemap_url) => self.crawl_site(request, sitemap_url).await,
            None => {
                tracing::info!("No sitemap found, crawling {} only", request.url);
                self.crawl_single(request).await
            }
        };

        tracing::info!(
            "Crawl of {} finished in {:.1}s: {} products, {} articles",
            request.url,
            start_time.elapsed().as_secs_f64(),
            report.products().len(),
            report.articles().len()
        );

        report
    }

    async fn crawl_single(&self, request: &CrawlRequest) -> CrawlReport {
        let page = self.crawl_page(request, &request.url).await;

        if let Some(error) = page.error {
            tracing::error!("Crawl of {} failed: {}", request.url, error);
            return CrawlReport::Failed { error };
        }

        let delivery = self.deliver(request, &page.products, &page.articles).await;

        CrawlReport::SinglePage(PageReport {
            url: request.url.clone(),
            products: page.products,
            articles: page.articles,
            delivery,
        })
    }

    async fn crawl_site(&self, request: &CrawlRequest, sitemap_url: String) -> CrawlReport {
        let mut urls = self.resolver.resolve_urls(&sitemap_url).await;
        urls.retain(|url| match check_target(url) {
            Ok(()) => true,
            Err(reason) => {
                tracing::warn!("Skipping sitemap entry {}: {}", url, reason);
                false
            }
        });

        let max_urls = self.config.crawler.max_urls;
        if urls.len() > max_urls {
            tracing::info!(
                "Sitemap lists {} URLs, crawling the first {}",
                urls.len(),
                max_urls
            );
            urls.truncate(max_urls);
        }

        let delay = Duration::from_millis(self.config.crawler.page_delay_ms);
        let mut aggregate = CrawlAggregate::new();
        let mut pages_failed = 0;

        for (index, url) in urls.iter().enumerate() {
            if index > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            tracing::info!("[{}/{}] Crawling {}", index + 1, urls.len(), url);
            let page = self.crawl_page(request, url).await;

            if page.is_failure() {
                pages_failed += 1;
            }

            aggregate.absorb(page);
        }

        let (products, articles) = aggregate.finalize();
        let delivery = self.deliver(request, &products, &articles).await;

        CrawlReport::FullSite(SiteReport {
            status: FULL_SITE_STATUS,
            sitemap_url,
            url: request.url.clone(),
            products,
            articles,
            pages_crawled: urls.len(),
            pages_failed,
            delivery,
        })
    }

    /// Renders and processes one page; failures become an empty result
    async fn crawl_page(&self, request: &CrawlRequest, url: &str) -> PageResult {
        match self.source.render(url).await {
            Ok(rendered) => self.process_page(request, rendered).await,
            Err(e) => {
                tracing::warn!("Failed to render {}: {}", url, e);
                PageResult::failed(url, e.to_string())
            }
        }
    }

    /// Extracts records and merges classifier output when extraction under-yields
    async fn process_page(&self, request: &CrawlRequest, rendered: RenderedPage) -> PageResult {
        let mut extraction = extract_records(&rendered.html, &rendered.url);

        if let Some(gateway) = &self.gateway {
            if gateway.should_classify(&extraction) {
                let remote = gateway
                    .classify(request, &rendered.url, &rendered.html)
                    .await;
                extraction.absorb(remote, &rendered.url);
            }
        }

        tracing::debug!(
            "{}: {} products, {} articles",
            rendered.url,
            extraction.products.len(),
            extraction.articles.len()
        );

        PageResult {
            source_url: rendered.url,
            products: extraction.products,
            articles: extraction.articles,
            error: None,
        }
    }

    async fn deliver(
        &self,
        request: &CrawlRequest,
        products: &[ProductRecord],
        articles: &[ArticleRecord],
    ) -> Option<DeliveryOutcome> {
        match &self.gateway {
            Some(gateway) => gateway.save(request, products, articles).await,
            None => None,
        }
    }
}
