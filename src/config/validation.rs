use crate::config::types::{
    AppConfig, CrawlConfig, CrawlRequest, HttpConfig, PoolConfig, SiteAssetsConfig,
};
use crate::url::normalize_start_url;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// File names inside a host directory that utility scripts may not take
const RESERVED_FILE_NAMES: &[&str] = &["favicon.ico", "sitemap.xml"];

/// Validates the entire configuration
pub fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    validate_pool_config(&config.pool)?;
    validate_http_config(&config.http)?;
    validate_site_assets(&config.site_assets)?;

    if config.defaults.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "defaults.max-pages must be >= 1, got {}",
            config.defaults.max_pages
        )));
    }

    for job in &config.jobs {
        validate_request(job)?;
    }
    Ok(())
}

/// Validates a job submission before it is resolved against defaults
pub fn validate_request(request: &CrawlRequest) -> Result<(), ConfigError> {
    validate_start_url(&request.start_url)?;

    if let Some(0) = request.max_pages {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1, got 0".to_string(),
        ));
    }

    if let Some(domain) = request.sitemap_domain.as_deref() {
        validate_sitemap_domain(domain)?;
    }
    Ok(())
}

/// Validates a resolved job configuration
pub fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    validate_start_url(&config.start_url)?;

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if let Some(domain) = config.sitemap_domain.as_deref() {
        validate_sitemap_domain(domain)?;
    }
    Ok(())
}

fn validate_start_url(raw: &str) -> Result<(), ConfigError> {
    if raw.trim().is_empty() {
        return Err(ConfigError::Validation(
            "start-url is required and cannot be blank".to_string(),
        ));
    }
    normalize_start_url(raw).map_err(|e| ConfigError::InvalidUrl(e.to_string()))?;
    Ok(())
}

fn validate_sitemap_domain(raw: &str) -> Result<(), ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(());
    }
    let url = Url::parse(trimmed)
        .map_err(|e| ConfigError::InvalidUrl(format!("sitemap-domain '{}': {}", trimmed, e)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "sitemap-domain must be an http(s) URL, got '{}'",
            trimmed
        )));
    }
    Ok(())
}

/// Validates worker pool sizing
fn validate_pool_config(config: &PoolConfig) -> Result<(), ConfigError> {
    if config.workers > 256 {
        return Err(ConfigError::Validation(format!(
            "pool.workers must be between 0 and 256, got {}",
            config.workers
        )));
    }

    if config.queue_capacity < 1 {
        return Err(ConfigError::Validation(format!(
            "pool.queue-capacity must be >= 1, got {}",
            config.queue_capacity
        )));
    }
    Ok(())
}

/// Validates HTTP timeouts and retry settings
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "http.user-agent cannot be empty".to_string(),
        ));
    }

    if config.page_timeout_secs == 0 || config.asset_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "http timeouts must be greater than zero".to_string(),
        ));
    }

    if !(1..=10).contains(&config.asset_attempts) {
        return Err(ConfigError::Validation(format!(
            "http.asset-attempts must be between 1 and 10, got {}",
            config.asset_attempts
        )));
    }
    Ok(())
}

/// Validates injected site asset names
fn validate_site_assets(config: &SiteAssetsConfig) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for script in &config.scripts {
        let name = script.file.trim();
        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\']);
        if !plain {
            return Err(ConfigError::Validation(format!(
                "site-assets script file must be a plain file name, got '{}'",
                script.file
            )));
        }

        if RESERVED_FILE_NAMES.contains(&name) {
            return Err(ConfigError::Validation(format!(
                "site-assets script file '{}' is reserved",
                name
            )));
        }

        if !seen.insert(name.to_string()) {
            return Err(ConfigError::Validation(format!(
                "site-assets script file '{}' is listed twice",
                name
            )));
        }
    }
    Ok(())
}
