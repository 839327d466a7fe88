use crate::config::types::{Config, CrawlerConfig, DeliveryConfig, RendererConfig, ServerConfig};
use crate::ConfigError;
use std::net::SocketAddr;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_renderer_config(&config.renderer)?;
    validate_delivery_config(&config.delivery)?;
    validate_server_config(&config.server)?;
    Ok(())
}

/// Validates crawl bounds
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_urls < 1 || config.max_urls > 1000 {
        return Err(ConfigError::Validation(format!(
            "max_urls must be between 1 and 1000, got {}",
            config.max_urls
        )));
    }

    if config.http_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "http_timeout_ms must be >= 100ms, got {}ms",
            config.http_timeout_ms
        )));
    }

    Ok(())
}

/// Validates browser and render pipeline settings
fn validate_renderer_config(config: &RendererConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.max_navigation_attempts < 1 || config.max_navigation_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max_navigation_attempts must be between 1 and 10, got {}",
            config.max_navigation_attempts
        )));
    }

    if config.navigation_timeout_ms < 1000 {
        return Err(ConfigError::Validation(format!(
            "navigation_timeout_ms must be >= 1000ms, got {}ms",
            config.navigation_timeout_ms
        )));
    }

    if config.scroll_step_px == 0 {
        return Err(ConfigError::Validation(
            "scroll_step_px must be > 0".to_string(),
        ));
    }

    if config.window_width == 0 || config.window_height == 0 {
        return Err(ConfigError::Validation(format!(
            "window size must be non-zero, got {}x{}",
            config.window_width, config.window_height
        )));
    }

    Ok(())
}

/// Validates delivery endpoints and chunking
fn validate_delivery_config(config: &DeliveryConfig) -> Result<(), ConfigError> {
    for endpoint in [&config.classify_endpoint, &config.save_endpoint]
        .into_iter()
        .flatten()
    {
        validate_endpoint(endpoint)?;
    }

    if config.classify_fallback && config.classify_endpoint.is_none() {
        return Err(ConfigError::Validation(
            "classify_fallback requires classify_endpoint".to_string(),
        ));
    }

    if config.chunk_bytes < 1024 {
        return Err(ConfigError::Validation(format!(
            "chunk_bytes must be >= 1024, got {}",
            config.chunk_bytes
        )));
    }

    Ok(())
}

/// Validates the server bind address
fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    config.bind.parse::<SocketAddr>().map_err(|e| {
        ConfigError::Validation(format!("Invalid bind address '{}': {}", config.bind, e))
    })?;
    Ok(())
}

/// Endpoints must be absolute http(s) URLs
fn validate_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    let url = Url::parse(endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid endpoint '{}': {}", endpoint, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Endpoint '{}' must use http or https",
            endpoint
        )));
    }

    Ok(())
}
