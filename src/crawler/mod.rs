//! Crawler module for site mirroring
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with timeouts and bounded retries
//! - Anchor extraction for frontier expansion
//! - The level-synchronized BFS frontier
//! - The per-job crawl engine

mod engine;
mod env;
mod fetcher;
mod frontier;
mod parser;

pub use engine::CrawlEngine;
pub use env::JobEnv;
pub use fetcher::{build_http_client, FetchResult, Fetcher};
pub use frontier::Frontier;
pub use parser::{parse_html, ParsedPage};

use crate::config::{CrawlConfig, HttpConfig};
use crate::site::SiteAssets;
use crate::state::JobSummary;
use crate::MirrorError;
use std::path::Path;

/// Runs a complete mirroring job
///
/// This is the main entry point for mirroring a single site. It will:
/// 1. Build the HTTP fetcher
/// 2. Create the job output directory
/// 3. Crawl and rewrite pages breadth-first
/// 4. Write the sitemap
///
/// # Arguments
///
/// * `config` - The job configuration
/// * `output_base` - Base directory for job output trees
/// * `http` - HTTP client settings
/// * `site_assets` - Protected files written into every host directory
///
/// # Returns
///
/// * `Ok(JobSummary)` - The job ran; per-page errors are in the summary
/// * `Err(MirrorError)` - Setup failed or the job was cancelled
pub async fn crawl(
    config: CrawlConfig,
    output_base: &Path,
    http: &HttpConfig,
    site_assets: SiteAssets,
) -> Result<JobSummary, MirrorError> {
    let fetcher = Fetcher::new(http)?;
    CrawlEngine::new(config, output_base, fetcher, site_assets).run().await
}
