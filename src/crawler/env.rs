//! Read-only collaborators shared by every stage of one job

use crate::config::CrawlConfig;
use crate::crawler::Fetcher;
use crate::site::SiteAssets;
use std::path::PathBuf;

/// Everything a job needs besides its mutable [`JobContext`]
///
/// [`JobContext`]: crate::state::JobContext
#[derive(Debug, Clone)]
pub struct JobEnv {
    pub fetcher: Fetcher,
    pub config: CrawlConfig,
    /// The job's output directory; host directories are created inside it
    pub output_root: PathBuf,
    pub site_assets: SiteAssets,
}
