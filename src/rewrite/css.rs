use super::download::download_asset;
use super::patterns::{find_urls, CSS_URL};
use super::{splice, Edit};
use crate::crawler::JobEnv;
use crate::site::relative_path;
use crate::state::JobContext;
use crate::url::{is_http_like, resolve_link};
use crate::MirrorError;
use std::path::Path;
use url::Url;

/// Rewrites every `url(...)` in a stylesheet or inline style
///
/// References resolve against `base` (the stylesheet URL, or the page for
/// inline styles) and are downloaded through the job's claim gate. Each match
/// is replaced with `url('<relative path>')` computed from the directory of
/// `current_local`. `data:` URIs, blank values and fragment references are kept
/// as written, as is any reference whose download fails.
pub async fn rewrite_css_urls(
    env: &JobEnv,
    ctx: &mut JobContext,
    css: &str,
    base: &Url,
    current_local: &Path,
) -> String {
    let from_dir = current_local.parent().unwrap_or(current_local);
    let mut edits = Vec::new();

    for found in find_urls(&CSS_URL, css) {
        let raw = found.raw.trim();
        if raw.is_empty() || raw.starts_with('#') || raw.to_ascii_lowercase().starts_with("data:") {
            continue;
        }
        let Some(abs) = resolve_link(base, raw).filter(is_http_like) else {
            continue;
        };

        match download_asset(env, ctx, &abs, base).await {
            Ok(outcome) => {
                let rel = relative_path(from_dir, outcome.path());
                edits.push(Edit::new(found.full, format!("url('{}')", rel)));
            }
            Err(MirrorError::PreviouslyFailed { .. }) => {}
            Err(e) => ctx.record_error(abs.as_str(), e),
        }
    }

    splice(css, edits)
}
