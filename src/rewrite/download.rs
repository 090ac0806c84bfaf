//! Dedup-gated resource downloads
//!
//! Every resource a page references goes through the same gate before any
//! network I/O: protected site files are never fetched, assets that already
//! failed are not retried, and a URL is claimed in the job's [`DedupStore`]
//! before it is downloaded.
//!
//! [`DedupStore`]: crate::state::DedupStore

use super::css::rewrite_css_urls;
use super::replace::apply_replacements;
use super::script::{extract_assets, rewrite_links};
use crate::crawler::JobEnv;
use crate::site::map_to_local_path;
use crate::state::JobContext;
use crate::url::strip_fragment;
use crate::MirrorError;
use std::path::{Path, PathBuf};
use url::Url;

/// Where a referenced resource lives in the mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOutcome {
    /// Fetched and written by this call
    Downloaded(PathBuf),
    /// Claimed earlier in the job
    Existing(PathBuf),
    /// Maps onto a protected site file; nothing was fetched
    Protected(PathBuf),
}

impl AssetOutcome {
    /// Local path the reference should point at
    pub fn path(&self) -> &Path {
        match self {
            AssetOutcome::Downloaded(p) | AssetOutcome::Existing(p) | AssetOutcome::Protected(p) => p,
        }
    }
}

enum Claim {
    Fresh(Url, PathBuf),
    Done(AssetOutcome),
}

fn claim(env: &JobEnv, ctx: &mut JobContext, url: &Url) -> Result<Claim, MirrorError> {
    let url = strip_fragment(url);
    let local = map_to_local_path(&env.output_root, &url, false);

    if env.site_assets.is_protected(&env.output_root, &url) {
        tracing::debug!(url = %url, "protected site asset, not downloading");
        return Ok(Claim::Done(AssetOutcome::Protected(local)));
    }
    if ctx.dedup.has_failed(url.as_str()) {
        return Err(MirrorError::PreviouslyFailed {
            url: url.to_string(),
        });
    }
    if !ctx.dedup.try_claim_asset(url.as_str()) {
        return Ok(Claim::Done(AssetOutcome::Existing(local)));
    }
    Ok(Claim::Fresh(url, local))
}

async fn write_file(path: &Path, body: &[u8]) -> Result<(), MirrorError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, body).await?;
    Ok(())
}

/// Downloads a binary asset verbatim
///
/// Returns [`MirrorError::PreviouslyFailed`] without touching the network when
/// an earlier download of the same URL failed; callers skip that error so a
/// broken asset is reported once per job.
pub async fn download_asset(
    env: &JobEnv,
    ctx: &mut JobContext,
    url: &Url,
    referer: &Url,
) -> Result<AssetOutcome, MirrorError> {
    let (url, local) = match claim(env, ctx, url)? {
        Claim::Fresh(url, local) => (url, local),
        Claim::Done(outcome) => return Ok(outcome),
    };

    let result = async {
        let bytes = env.fetcher.fetch_binary(&url, Some(referer)).await?;
        write_file(&local, &bytes).await
    }
    .await;

    match result {
        Ok(()) => {
            ctx.record_asset();
            tracing::debug!(url = %url, path = %local.display(), "asset saved");
            Ok(AssetOutcome::Downloaded(local))
        }
        Err(e) => {
            ctx.dedup.mark_failed(url.as_str());
            Err(e)
        }
    }
}

/// Downloads a stylesheet, rewrites its `url(...)` references relative to its
/// own location, applies the replacement rules and saves it
pub async fn mirror_stylesheet(
    env: &JobEnv,
    ctx: &mut JobContext,
    url: &Url,
    referer: &Url,
) -> Result<AssetOutcome, MirrorError> {
    let (url, local) = match claim(env, ctx, url)? {
        Claim::Fresh(url, local) => (url, local),
        Claim::Done(outcome) => return Ok(outcome),
    };

    let bytes = match env.fetcher.fetch_binary(&url, Some(referer)).await {
        Ok(bytes) => bytes,
        Err(e) => {
            ctx.dedup.mark_failed(url.as_str());
            return Err(e);
        }
    };

    let css = String::from_utf8_lossy(&bytes);
    let rewritten = rewrite_css_urls(env, ctx, &css, &url, &local).await;
    let replaced = apply_replacements(&rewritten, &env.config.replace_rules);

    if let Err(e) = write_file(&local, replaced.as_bytes()).await {
        ctx.dedup.mark_failed(url.as_str());
        return Err(e);
    }
    ctx.record_asset();
    tracing::debug!(url = %url, "stylesheet saved");
    Ok(AssetOutcome::Downloaded(local))
}

/// Downloads a script, rewrites its navigation links, applies the replacement
/// rules, saves it and then scans it for embedded assets
pub async fn mirror_script(
    env: &JobEnv,
    ctx: &mut JobContext,
    url: &Url,
    page_url: &Url,
) -> Result<AssetOutcome, MirrorError> {
    let (url, local) = match claim(env, ctx, url)? {
        Claim::Fresh(url, local) => (url, local),
        Claim::Done(outcome) => return Ok(outcome),
    };

    let bytes = match env.fetcher.fetch_binary(&url, Some(page_url)).await {
        Ok(bytes) => bytes,
        Err(e) => {
            ctx.dedup.mark_failed(url.as_str());
            return Err(e);
        }
    };

    let text = String::from_utf8_lossy(&bytes);
    let rewritten = rewrite_links(&text, page_url, &env.output_root, ctx);
    let replaced = apply_replacements(&rewritten, &env.config.replace_rules);

    if let Err(e) = write_file(&local, replaced.as_bytes()).await {
        ctx.dedup.mark_failed(url.as_str());
        return Err(e);
    }
    ctx.record_asset();
    tracing::debug!(url = %url, "script saved");

    extract_assets(env, ctx, &text, url.as_str(), &url, page_url).await;
    Ok(AssetOutcome::Downloaded(local))
}
