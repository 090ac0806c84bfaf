//! Site-Mirror: an offline website mirroring engine
//!
//! This crate crawls a website breadth-first, downloads every referenced asset and
//! rewrites links inside HTML, CSS and script so that the copy can be served from a
//! local root instead of the original domain.

pub mod config;
pub mod crawler;
pub mod output;
pub mod rewrite;
pub mod site;
pub mod state;
pub mod storage;
pub mod tasks;
pub mod url;

use thiserror::Error;

/// Main error type for Site-Mirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Unexpected HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTML error for {url}: {message}")]
    Html { url: String, message: String },

    #[error("Asset previously failed: {url}")]
    PreviouslyFailed { url: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("{0}")]
    Setup(String),

    #[error("Job cancelled")]
    Cancelled,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to parse JSON job: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for Site-Mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{AppConfig, CrawlConfig, ReplacementRule};
pub use crawler::{crawl, CrawlEngine};
pub use state::{JobSummary, TaskStatus};
pub use tasks::{SubmitError, TaskManager, TaskSnapshot};
pub use url::{is_page_like, normalize_start_url};
