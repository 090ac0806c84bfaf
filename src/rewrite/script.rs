//! Script text rewriting
//!
//! Scripts are never executed, so navigation targets and embedded assets are
//! found with the layered matchers in [`patterns`](super::patterns):
//!
//! 1. [`rewrite_links`] rewrites navigation expressions to site-root paths and
//!    harvests page-like targets into the job's pending pages
//! 2. [`collect_pending_pages`] runs a looser scan for quoted page paths
//! 3. [`extract_assets`] downloads images, stylesheets and scripts referenced
//!    from the text, at most once per scan key

use super::download::download_asset;
use super::patterns::{find_urls, non_overlapping, MatchKind, EMBEDDED_ASSETS, INDEX_SUFFIX, NAVIGATION, PENDING_PAGES};
use super::{splice, Edit};
use crate::crawler::JobEnv;
use crate::site::root_relative_path;
use crate::state::JobContext;
use crate::url::{is_http_like, is_image_path, is_page_like, same_host, strip_fragment};
use crate::MirrorError;
use std::collections::HashSet;
use std::path::Path;
use url::Url;

/// Undoes the backslash escaping common in script string literals
///
/// # Examples
///
/// ```
/// use site_mirror::rewrite::sanitize_js_url;
///
/// assert_eq!(sanitize_js_url(r" \/news\/list.do\?id\=3\\ "), "/news/list.do?id=3");
/// ```
pub fn sanitize_js_url(raw: &str) -> String {
    raw.trim()
        .trim_end_matches('\\')
        .replace("\\/", "/")
        .replace("\\?", "?")
        .replace("\\&", "&")
        .replace("\\=", "=")
        .replace("\\#", "#")
}

/// Rewrites navigation expressions inside script text
///
/// Same-host targets become paths relative to the site root (`/news/`,
/// `/about.html`) so the script works from any page depth; cross-host
/// navigation becomes `/`. Only the URL itself is replaced, so the original
/// quoting (literal or backslash-escaped) is preserved. Page-like targets and
/// quoted page paths are added to the job's pending pages.
pub fn rewrite_links(text: &str, page_url: &Url, root: &Path, ctx: &mut JobContext) -> String {
    let mut edits = Vec::new();

    for found in non_overlapping(&NAVIGATION, text) {
        let cleaned = sanitize_js_url(found.raw);
        if cleaned.is_empty() {
            continue;
        }
        let abs = match page_url.join(&cleaned) {
            Ok(abs) if is_http_like(&abs) => abs,
            _ => continue,
        };
        let cross_host = !same_host(page_url, &abs);

        if found.matcher.kind == MatchKind::AbsoluteLiteral {
            // plain literals are not navigation, so offsite ones stay as written
            if !cross_host {
                edits.push(Edit::new(found.span, local_target(root, &abs)));
            }
            continue;
        }

        if is_page_like(&abs) {
            ctx.add_pending_page(strip_fragment(&abs));
        }

        let replacement = if cross_host {
            "/".to_string()
        } else {
            local_target(root, &abs)
        };
        tracing::trace!(matcher = found.matcher.name, from = %cleaned, to = %replacement, "script link");
        edits.push(Edit::new(found.span, replacement));
    }

    collect_pending_pages(text, page_url, ctx);

    let rewritten = splice(text, edits);
    collapse_index_suffix(&rewritten)
}

/// Site-root path of a same-host target, keeping its fragment
fn local_target(root: &Path, abs: &Url) -> String {
    let mut target = root_relative_path(root, abs, is_page_like(abs));
    if let Some(fragment) = abs.fragment().filter(|f| !f.is_empty()) {
        target.push('#');
        target.push_str(fragment);
    }
    target
}

/// Collapses remaining `href`/`src` references to `/.../index.html` into `/.../`
fn collapse_index_suffix(text: &str) -> String {
    let edits = find_urls(&INDEX_SUFFIX, text)
        .into_iter()
        .map(|found| {
            let collapsed = found.raw.len() - "index.html".len();
            Edit::new(found.span.clone(), &found.raw[..collapsed])
        })
        .collect();
    splice(text, edits)
}

/// Adds quoted rooted paths that look like pages to the pending pages
///
/// Matches `/.../index.html`, `/.../`, `.do`/`.jsp`/`.html` paths and any other
/// rooted path whose resolved URL is page-like.
pub fn collect_pending_pages(text: &str, page_url: &Url, ctx: &mut JobContext) {
    for matcher in PENDING_PAGES.iter() {
        for found in find_urls(*matcher, text) {
            let Ok(abs) = page_url.join(found.raw) else {
                continue;
            };
            if is_http_like(&abs) && is_page_like(&abs) {
                ctx.add_pending_page(strip_fragment(&abs));
            }
        }
    }
}

/// Downloads assets referenced from script text
///
/// The scan runs at most once per `scan_key` within a job: external scripts
/// use their URL, inline scripts a page-scoped key. Each distinct raw match is
/// tried once per call; loose matches must name an image, while `<link>` and
/// `<script>` fragments download the stylesheet or script verbatim.
pub async fn extract_assets(
    env: &JobEnv,
    ctx: &mut JobContext,
    text: &str,
    scan_key: &str,
    base: &Url,
    referer: &Url,
) {
    if !ctx.dedup.try_claim_script(scan_key) {
        tracing::debug!(script = %scan_key, "script already scanned");
        return;
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for matcher in EMBEDDED_ASSETS.iter() {
        for found in find_urls(*matcher, text) {
            let raw = found.raw.trim();
            if raw.is_empty() {
                continue;
            }

            let cleaned = sanitize_js_url(raw);
            if matcher.kind == MatchKind::Image && !is_image_path(&cleaned) {
                continue;
            }
            if !seen.insert(raw) {
                continue;
            }

            let Some(abs) = resolve_embedded(&cleaned, base) else {
                continue;
            };
            tracing::debug!(matcher = matcher.name, url = %abs, "embedded asset");

            match download_asset(env, ctx, &abs, referer).await {
                Ok(_) | Err(MirrorError::PreviouslyFailed { .. }) => {}
                Err(e) => ctx.record_error(abs.as_str(), e),
            }
        }
    }
}

/// Resolves an embedded reference; a token without a recognized prefix is
/// treated as site-root relative
fn resolve_embedded(cleaned: &str, base: &Url) -> Option<Url> {
    const PREFIXES: [&str; 6] = ["http://", "https://", "//", "/", "./", "../"];

    let lower = cleaned.to_ascii_lowercase();
    let rooted = if PREFIXES.iter().any(|p| lower.starts_with(p)) {
        cleaned.to_string()
    } else {
        format!("/{}", cleaned)
    };

    base.join(&rooted)
        .ok()
        .filter(is_http_like)
        .map(|u| strip_fragment(&u))
}
