//! Crawl engine - breadth-first mirroring of one site
//!
//! This module contains the main crawl loop of a job:
//! - Resolving the start URL and preparing the output directory
//! - Walking the frontier level by level within the depth and page bounds
//! - Fetching, rewriting and saving each page
//! - Expanding the frontier from anchors and script-harvested pages
//! - Writing the sitemap once the crawl is done

use crate::config::CrawlConfig;
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::parse_html;
use crate::crawler::{FetchResult, Fetcher, JobEnv};
use crate::output::write_sitemap;
use crate::rewrite::LinkRewriter;
use crate::site::{sanitize_segment, SiteAssets};
use crate::state::{JobContext, JobSummary};
use crate::url::{is_http_like, is_page_like, is_sitemap_xml, normalize_start_url, same_host, strip_fragment};
use crate::MirrorError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Runs one mirroring job
pub struct CrawlEngine {
    config: CrawlConfig,
    output_base: PathBuf,
    fetcher: Fetcher,
    site_assets: SiteAssets,
    cancel: Arc<AtomicBool>,
}

impl CrawlEngine {
    /// Creates an engine writing under `output_base`
    ///
    /// # Arguments
    ///
    /// * `config` - The job configuration
    /// * `output_base` - Base directory shared by all jobs
    /// * `fetcher` - HTTP fetcher for pages and assets
    /// * `site_assets` - Protected files written into every host directory
    pub fn new(
        config: CrawlConfig,
        output_base: impl Into<PathBuf>,
        fetcher: Fetcher,
        site_assets: SiteAssets,
    ) -> Self {
        Self {
            config,
            output_base: output_base.into(),
            fetcher,
            site_assets,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Uses an externally owned cancellation flag, checked between pages
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Runs the job to completion
    ///
    /// Per-page and per-resource failures end up in the summary's error list.
    /// Only setup failures ([`MirrorError::Setup`]) and cancellation
    /// ([`MirrorError::Cancelled`]) are returned as errors.
    pub async fn run(self) -> Result<JobSummary, MirrorError> {
        let started = Instant::now();

        let start = normalize_start_url(&self.config.start_url).map_err(|e| {
            MirrorError::Setup(format!("Invalid start URL '{}': {}", self.config.start_url, e))
        })?;
        let output_dir = prepare_output_dir(&self.output_base, self.config.output_name.as_deref(), &start).await?;

        tracing::info!(
            url = %start,
            output = %output_dir.display(),
            max_depth = self.config.max_depth,
            max_pages = self.config.max_pages,
            "starting mirror"
        );

        let env = JobEnv {
            fetcher: self.fetcher,
            config: self.config,
            output_root: output_dir.clone(),
            site_assets: self.site_assets,
        };
        let mut ctx = JobContext::new();

        crawl_pages(&env, &mut ctx, &start, &self.cancel).await?;

        match write_sitemap(
            &env.output_root,
            &start,
            ctx.saved_pages(),
            env.config.sitemap_domain.as_deref(),
        )
        .await
        {
            Ok(path) => tracing::debug!(path = %path.display(), "sitemap written"),
            Err(e) => ctx.record_job_error(format!("generate sitemap failed: {}", e)),
        }

        let summary = ctx.into_summary(output_dir, started.elapsed());
        tracing::info!(
            pages = summary.pages_downloaded,
            assets = summary.assets_downloaded,
            errors = summary.errors.len(),
            elapsed_ms = summary.elapsed_ms,
            "mirror finished"
        );
        Ok(summary)
    }
}

/// Creates `<base>/<output name or host>` and returns its absolute path
async fn prepare_output_dir(base: &Path, output_name: Option<&str>, start: &Url) -> Result<PathBuf, MirrorError> {
    let name = output_name
        .map(sanitize_segment)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| sanitize_segment(start.host_str().unwrap_or("unknown-host")));

    let dir = base.join(name);
    let setup_error =
        |e: std::io::Error| MirrorError::Setup(format!("Cannot create output directory {}: {}", dir.display(), e));

    tokio::fs::create_dir_all(&dir).await.map_err(setup_error)?;
    tokio::fs::canonicalize(&dir).await.map_err(setup_error)
}

/// Level-synchronized BFS over the site
async fn crawl_pages(env: &JobEnv, ctx: &mut JobContext, start: &Url, cancel: &AtomicBool) -> Result<(), MirrorError> {
    let config = &env.config;
    let mut frontier = Frontier::new(strip_fragment(start));

    while !frontier.is_empty() && ctx.pages_downloaded() < config.max_pages && frontier.depth() <= config.max_depth {
        if cancel.load(Ordering::SeqCst) {
            tracing::info!(pages = ctx.pages_downloaded(), "job cancelled");
            return Err(MirrorError::Cancelled);
        }

        let Some(url) = frontier.pop() else {
            break;
        };
        if !frontier.mark_visited(&url) {
            frontier.finish_item();
            continue;
        }

        let depth = frontier.depth();
        tracing::debug!(url = %url, depth, "visiting");

        let outcome = process_page(env, ctx, &url, depth).await;
        let pending = ctx.take_pending_pages();

        match outcome {
            Ok(Some(links)) => {
                if config.debug_only_home {
                    tracing::info!("debug-only-home set, stopping after the first page");
                    break;
                }
                for next in links.into_iter().chain(pending) {
                    if should_enqueue(&next, start, config, &frontier) {
                        tracing::trace!(url = %next, depth = depth + 1, "enqueue");
                        frontier.push(next);
                    }
                }
            }
            Ok(None) => tracing::debug!(url = %url, "404, skipped"),
            Err(e) => ctx.record_error(url.as_str(), e),
        }

        frontier.finish_item();
    }

    tracing::debug!(
        pages = ctx.pages_downloaded(),
        depth = frontier.depth(),
        remaining = frontier.len(),
        "crawl loop ended"
    );
    Ok(())
}

/// Fetches, rewrites and saves one page; returns its anchor targets, or `None` on 404
async fn process_page(
    env: &JobEnv,
    ctx: &mut JobContext,
    url: &Url,
    depth: u32,
) -> Result<Option<Vec<Url>>, MirrorError> {
    let (status_code, final_url, body) = match env.fetcher.fetch_page(url).await? {
        FetchResult::NotFound => return Ok(None),
        FetchResult::Success {
            status_code,
            final_url,
            body,
            ..
        } => (status_code, final_url, body),
    };

    if status_code >= 400 {
        tracing::warn!(url = %url, status = status_code, "saving error page");
    }
    if &final_url != url {
        tracing::debug!(url = %url, final_url = %final_url, "redirected");
    }

    let parsed = parse_html(&body, url);
    let rewriter = LinkRewriter::new(env, url);
    let path = rewriter.rewrite_and_save(ctx, &body).await?;
    ctx.record_page(url);

    tracing::info!(
        url = %url,
        depth,
        title = parsed.title.as_deref().unwrap_or(""),
        path = %path.display(),
        "page saved"
    );
    Ok(Some(parsed.links))
}

fn should_enqueue(url: &Url, start: &Url, config: &CrawlConfig, frontier: &Frontier) -> bool {
    is_http_like(url)
        && !is_sitemap_xml(url)
        && (!config.same_domain || same_host(start, url))
        && is_page_like(url)
        && !frontier.is_visited(url)
}
