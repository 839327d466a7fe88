//! Record and report types shared by the extractor, the crawler and the front end

use crate::delivery::DeliveryOutcome;
use serde::{Deserialize, Serialize};

/// Status tag carried by full-site reports
pub const FULL_SITE_STATUS: &str = "done (full site)";

/// A product card found on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(default)]
    pub name: String,
    /// Raw price text as displayed, possibly empty
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub url: String,
}

impl ProductRecord {
    /// Cross-page identity: lower-cased `name|url`
    pub fn identity_key(&self) -> String {
        format!("{}|{}", self.name, self.url).to_lowercase()
    }
}

/// An article or blog-post teaser found on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub image: String,
}

impl ArticleRecord {
    /// Cross-page identity: lower-cased `title|url`
    pub fn identity_key(&self) -> String {
        format!("{}|{}", self.title, self.url).to_lowercase()
    }
}

/// One inbound unit of work
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CrawlRequest {
    pub url: String,
    /// Opaque correlation id forwarded to the delivery service
    #[serde(default)]
    pub website_id: Option<String>,
    /// Opaque correlation id forwarded to the delivery service
    #[serde(default)]
    pub chatbot_id: Option<String>,
}

impl CrawlRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

/// Records produced by one rendered page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageResult {
    pub source_url: String,
    pub products: Vec<ProductRecord>,
    pub articles: Vec<ArticleRecord>,
    /// Why the page contributed nothing, if it failed
    pub error: Option<String>,
}

impl PageResult {
    pub fn failed(source_url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            error: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Response document of one crawl
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CrawlReport {
    FullSite(SiteReport),
    SinglePage(PageReport),
    Failed { error: String },
}

impl CrawlReport {
    pub fn products(&self) -> &[ProductRecord] {
        match self {
            Self::FullSite(report) => &report.products,
            Self::SinglePage(report) => &report.products,
            Self::Failed { .. } => &[],
        }
    }

    pub fn articles(&self) -> &[ArticleRecord] {
        match self {
            Self::FullSite(report) => &report.articles,
            Self::SinglePage(report) => &report.articles,
            Self::Failed { .. } => &[],
        }
    }
}

/// Bounded multi-page crawl driven by a sitemap
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteReport {
    pub status: &'static str,
    pub sitemap_url: String,
    pub url: String,
    pub products: Vec<ProductRecord>,
    pub articles: Vec<ArticleRecord>,
    pub pages_crawled: usize,
    pub pages_failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryOutcome>,
}

/// Seed page only, no sitemap found
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageReport {
    pub url: String,
    pub products: Vec<ProductRecord>,
    pub articles: Vec<ArticleRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryOutcome>,
}
