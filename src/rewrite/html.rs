//! Page rewriting
//!
//! [`LinkRewriter`] takes one fetched page, downloads everything it references
//! and rewrites every reference so the saved copy works from the local mirror.
//!
//! # Rewrite Order
//!
//! 1. Resource tags (`img[src]`, `script[src]`, `link[href]`)
//! 2. Inline `style` attributes and `<style>` blocks
//! 3. Site assets (favicon and utility scripts)
//! 4. Inline scripts and event-handler attributes
//! 5. Meta allow-list
//! 6. Lazy-load attributes, then `srcset`
//! 7. Anchors
//! 8. `<source src>`
//! 9. Title, heading and sitemap link
//! 10. Serialization and replacement rules
//!
//! A failing resource is recorded on the job and leaves its reference as it
//! was; the page itself is always saved.

use super::augment;
use super::css::rewrite_css_urls;
use super::download::{download_asset, mirror_script, mirror_stylesheet, AssetOutcome};
use super::replace::apply_replacements;
use super::script::{extract_assets, rewrite_links};
use crate::crawler::JobEnv;
use crate::site::{map_to_local_path, normalize_index_link, relative_path};
use crate::state::JobContext;
use crate::url::{is_http_like, is_page_like, is_sitemap_xml, resolve_link, same_host, strip_fragment};
use crate::MirrorError;
use kuchiki::traits::*;
use kuchiki::{ElementData, NodeDataRef, NodeRef};
use std::path::{Path, PathBuf};
use url::Url;

const LAZY_ATTRS: &[&str] = &["data-src", "data-original", "data-lazy", "data-echo"];

const SCRIPT_ATTRS: &[&str] = &[
    "onclick",
    "onmouseover",
    "onfocus",
    "onsubmit",
    "onload",
    "onchange",
    "data-href",
    "data-url",
    "data-link",
];

const PAGE_LINK_RELS: &[&str] = &["canonical", "alternate", "prev", "next"];

/// Rewrites and saves one page
pub struct LinkRewriter<'a> {
    env: &'a JobEnv,
    page_url: &'a Url,
    page_local: PathBuf,
    page_dir: PathBuf,
}

impl<'a> LinkRewriter<'a> {
    /// Creates a rewriter for the page at `page_url`, saved at its mapped local path
    pub fn new(env: &'a JobEnv, page_url: &'a Url) -> Self {
        let page_local = map_to_local_path(&env.output_root, page_url, true);
        let page_dir = page_local
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| env.output_root.clone());
        Self {
            env,
            page_url,
            page_local,
            page_dir,
        }
    }

    /// Rewrites the page and writes it to its local path
    pub async fn rewrite_and_save(&self, ctx: &mut JobContext, html: &str) -> Result<PathBuf, MirrorError> {
        let rewritten = self.rewrite(ctx, html).await?;
        if let Some(parent) = self.page_local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.page_local, rewritten.as_bytes()).await?;
        Ok(self.page_local.clone())
    }

    /// Rewrites the page and returns the final HTML
    pub async fn rewrite(&self, ctx: &mut JobContext, html: &str) -> Result<String, MirrorError> {
        let document = kuchiki::parse_html().one(html);

        self.rewrite_resource_tags(ctx, &document).await;
        self.rewrite_inline_styles(ctx, &document).await;

        if let Err(e) = self.env.site_assets.ensure(&self.env.output_root, self.page_url).await {
            ctx.record_error(self.page_url.as_str(), format!("site assets: {}", e));
        }
        augment::link_site_assets(&document, &self.env.site_assets, self.is_home());

        self.rewrite_inline_scripts(ctx, &document).await;
        augment::filter_meta(&document);
        self.rewrite_lazy_images(ctx, &document).await;
        self.rewrite_srcsets(ctx, &document).await;
        self.rewrite_anchors(ctx, &document).await;
        self.rewrite_media_sources(ctx, &document).await;

        let title = augment::apply_title(&document, self.env.config.title_suffix.as_deref());
        augment::insert_heading(&document, &title);
        augment::append_sitemap_link(&document);

        let mut out = Vec::new();
        document.serialize(&mut out).map_err(|e| MirrorError::Html {
            url: self.page_url.to_string(),
            message: format!("serialize failed: {}", e),
        })?;
        let serialized = String::from_utf8_lossy(&out);
        Ok(apply_replacements(&serialized, &self.env.config.replace_rules))
    }

    fn is_home(&self) -> bool {
        matches!(self.page_url.path(), "" | "/" | "/index.html")
    }

    /// Relative reference from this page to a local file, keeping the fragment of `url`
    fn relative_ref(&self, target: &Path, url: &Url) -> String {
        let mut rel = relative_path(&self.page_dir, target);
        if let Some(fragment) = url.fragment().filter(|f| !f.is_empty()) {
            rel.push('#');
            rel.push_str(fragment);
        }
        rel
    }

    /// Link to another page of the mirror; offsite pages become `/`
    fn page_link(&self, url: &Url) -> String {
        if !same_host(self.page_url, url) {
            return "/".to_string();
        }
        let local = map_to_local_path(&self.env.output_root, &strip_fragment(url), true);
        let mut link = normalize_index_link(&relative_path(&self.page_dir, &local));
        if let Some(fragment) = url.fragment().filter(|f| !f.is_empty()) {
            link.push('#');
            link.push_str(fragment);
        }
        link
    }

    fn resolve(&self, raw: &str) -> Option<Url> {
        resolve_link(self.page_url, raw).filter(is_http_like)
    }

    /// Downloads a binary asset and returns the reference to write back
    async fn asset_ref(&self, ctx: &mut JobContext, url: &Url) -> Option<String> {
        let outcome = download_asset(self.env, ctx, url, self.page_url).await;
        self.outcome_ref(ctx, url, outcome)
    }

    fn outcome_ref(
        &self,
        ctx: &mut JobContext,
        url: &Url,
        outcome: Result<AssetOutcome, MirrorError>,
    ) -> Option<String> {
        match outcome {
            Ok(outcome) => Some(self.relative_ref(outcome.path(), url)),
            Err(MirrorError::PreviouslyFailed { .. }) => None,
            Err(e) => {
                ctx.record_error(url.as_str(), e);
                None
            }
        }
    }

    async fn rewrite_resource_tags(&self, ctx: &mut JobContext, document: &NodeRef) {
        for el in select_all(document, "img[src], script[src], link[href]") {
            let tag = el.name.local.to_string();
            let attr_name = if tag == "link" { "href" } else { "src" };
            let Some(abs) = attr(&el, attr_name).and_then(|v| self.resolve(&v)) else {
                continue;
            };
            if is_sitemap_xml(&abs) {
                continue;
            }

            let outcome = match tag.as_str() {
                "link" => {
                    let rel = attr(&el, "rel").unwrap_or_default().to_ascii_lowercase();
                    let rels: Vec<&str> = rel.split_whitespace().collect();
                    if rels.iter().any(|r| matches!(*r, "dns-prefetch" | "preconnect")) || rel.contains("icon") {
                        continue;
                    }
                    if rels.iter().any(|r| PAGE_LINK_RELS.contains(r)) && is_page_like(&abs) {
                        set_attr(&el, "href", self.page_link(&abs));
                        continue;
                    }
                    if rels.contains(&"stylesheet") || abs.path().to_ascii_lowercase().ends_with(".css") {
                        mirror_stylesheet(self.env, ctx, &abs, self.page_url).await
                    } else {
                        download_asset(self.env, ctx, &abs, self.page_url).await
                    }
                }
                "script" => mirror_script(self.env, ctx, &abs, self.page_url).await,
                _ => download_asset(self.env, ctx, &abs, self.page_url).await,
            };

            if let Some(reference) = self.outcome_ref(ctx, &abs, outcome) {
                set_attr(&el, attr_name, reference);
            }
        }
    }

    async fn rewrite_inline_styles(&self, ctx: &mut JobContext, document: &NodeRef) {
        for el in select_all(document, "[style]") {
            let Some(style) = attr(&el, "style") else {
                continue;
            };
            let rewritten = rewrite_css_urls(self.env, ctx, &style, self.page_url, &self.page_local).await;
            if rewritten != style {
                set_attr(&el, "style", rewritten);
            }
        }

        for el in select_all(document, "style") {
            let css = el.text_contents();
            if css.trim().is_empty() {
                continue;
            }
            let rewritten = rewrite_css_urls(self.env, ctx, &css, self.page_url, &self.page_local).await;
            if rewritten != css {
                replace_text(el.as_node(), &rewritten);
            }
        }
    }

    async fn rewrite_inline_scripts(&self, ctx: &mut JobContext, document: &NodeRef) {
        let root = &self.env.output_root;

        for (index, el) in select_all(document, "script:not([src])").into_iter().enumerate() {
            let text = el.text_contents();
            if text.trim().is_empty() {
                continue;
            }
            let rewritten = rewrite_links(&text, self.page_url, root, ctx);
            let scan_key = format!("{}#inline-{}", strip_fragment(self.page_url), index);
            extract_assets(self.env, ctx, &text, &scan_key, self.page_url, self.page_url).await;
            if rewritten != text {
                replace_text(el.as_node(), &rewritten);
            }
        }

        let selector = SCRIPT_ATTRS
            .iter()
            .map(|a| format!("[{}]", a))
            .collect::<Vec<_>>()
            .join(", ");
        for el in select_all(document, &selector) {
            for name in SCRIPT_ATTRS {
                let Some(value) = attr(&el, name) else {
                    continue;
                };
                let rewritten = rewrite_links(&value, self.page_url, root, ctx);
                if rewritten != value {
                    set_attr(&el, name, rewritten);
                }
            }
        }
    }

    async fn rewrite_lazy_images(&self, ctx: &mut JobContext, document: &NodeRef) {
        let selector = LAZY_ATTRS
            .iter()
            .map(|a| format!("[{}]", a))
            .collect::<Vec<_>>()
            .join(", ");

        for el in select_all(document, &selector) {
            let mut first_rewritten: Option<String> = None;
            for name in LAZY_ATTRS {
                let Some(abs) = attr(&el, name).and_then(|v| self.resolve(&v)) else {
                    continue;
                };
                if let Some(reference) = self.asset_ref(ctx, &abs).await {
                    set_attr(&el, name, reference.clone());
                    first_rewritten.get_or_insert(reference);
                }
            }

            let missing_src = attr(&el, "src").map_or(true, |s| s.trim().is_empty());
            if &*el.name.local == "img" && missing_src {
                if let Some(reference) = first_rewritten {
                    set_attr(&el, "src", reference);
                }
            }
        }
    }

    async fn rewrite_srcsets(&self, ctx: &mut JobContext, document: &NodeRef) {
        for el in select_all(document, "img[srcset], source[srcset]") {
            let Some(srcset) = attr(&el, "srcset") else {
                continue;
            };
            if srcset.contains("data:") {
                continue;
            }

            let mut rebuilt = Vec::new();
            for item in srcset.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let mut parts = item.split_whitespace();
                let Some(raw) = parts.next() else {
                    continue;
                };
                let descriptor = parts.collect::<Vec<_>>().join(" ");

                let reference = match self.resolve(raw) {
                    Some(abs) => self.asset_ref(ctx, &abs).await,
                    None => None,
                };
                let url_part = reference.unwrap_or_else(|| raw.to_string());
                if descriptor.is_empty() {
                    rebuilt.push(url_part);
                } else {
                    rebuilt.push(format!("{} {}", url_part, descriptor));
                }
            }
            set_attr(&el, "srcset", rebuilt.join(", "));
        }
    }

    async fn rewrite_anchors(&self, ctx: &mut JobContext, document: &NodeRef) {
        for el in select_all(document, "a[href]") {
            let Some(href) = attr(&el, "href") else {
                continue;
            };
            let Some(abs) = self.resolve(&href) else {
                continue;
            };

            if !same_host(self.page_url, &abs) {
                set_attr(&el, "href", "/".to_string());
            } else if is_page_like(&abs) {
                set_attr(&el, "href", self.page_link(&abs));
            } else if let Some(reference) = self.asset_ref(ctx, &abs).await {
                set_attr(&el, "href", reference);
            }
        }
    }

    async fn rewrite_media_sources(&self, ctx: &mut JobContext, document: &NodeRef) {
        for el in select_all(document, "source[src]") {
            let Some(abs) = attr(&el, "src").and_then(|v| self.resolve(&v)) else {
                continue;
            };
            if let Some(reference) = self.asset_ref(ctx, &abs).await {
                set_attr(&el, "src", reference);
            }
        }
    }
}

/// Collects all elements matching `selector`; an invalid selector matches nothing
pub(super) fn select_all(node: &NodeRef, selector: &str) -> Vec<NodeDataRef<ElementData>> {
    match node.select(selector) {
        Ok(matches) => matches.collect(),
        Err(()) => {
            tracing::warn!(selector, "invalid selector");
            Vec::new()
        }
    }
}

pub(super) fn select_first(node: &NodeRef, selector: &str) -> Option<NodeRef> {
    node.select_first(selector).ok().map(|el| el.as_node().clone())
}

pub(super) fn attr(el: &NodeDataRef<ElementData>, name: &str) -> Option<String> {
    el.attributes.borrow().get(name).map(str::to_string)
}

pub(super) fn set_attr(el: &NodeDataRef<ElementData>, name: &str, value: String) {
    el.attributes.borrow_mut().insert(name, value);
}

/// Replaces all children of `node` with a single text node
pub(super) fn replace_text(node: &NodeRef, text: &str) {
    for child in node.children().collect::<Vec<_>>() {
        child.detach();
    }
    node.append(NodeRef::new_text(text));
}

/// Parses a snippet and returns its first element matching `selector`, detached
pub(super) fn element_from_html(html: &str, selector: &str) -> Option<NodeRef> {
    let fragment = kuchiki::parse_html().one(html);
    let node = select_first(&fragment, selector)?;
    node.detach();
    Some(node)
}
