//! Page-Harvest: a bounded storefront crawler
//!
//! This crate crawls a website (through its sitemap when one exists), renders each page
//! in a headless browser, and extracts product and article records from the rendered
//! markup using structural heuristics. Records are deduplicated across the whole crawl.

pub mod config;
pub mod crawler;
pub mod delivery;
pub mod extract;
pub mod model;
pub mod render;
pub mod server;
pub mod sitemap;

use thiserror::Error;

/// Main error type for Page-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Delivery error: {0}")]
    Delivery(#[from] delivery::DeliveryError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Page-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, CrawlAggregate};
pub use extract::{extract_records, to_absolute_url, Extraction};
pub use model::{ArticleRecord, CrawlReport, CrawlRequest, PageResult, ProductRecord};
