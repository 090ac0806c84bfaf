//! Configuration module for Site-Mirror
//!
//! This module handles loading, parsing, and validating the TOML application
//! configuration as well as the per-job [`CrawlConfig`] payloads.
//!
//! # Example
//!
//! ```no_run
//! use site_mirror::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mirror.toml")).unwrap();
//! println!("Default depth: {}", config.defaults.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AppConfig, CrawlConfig, CrawlRequest, DefaultsConfig, HttpConfig, PoolConfig,
    ReplacementRule, ScriptAssetEntry, SiteAssetsConfig, StorageConfig, DEFAULT_USER_AGENT,
};

// Re-export parser and validation functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, load_job_file, parse_config};
pub use validation::{validate_crawl_config, validate_request};
