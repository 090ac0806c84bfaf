//! Page augmentation
//!
//! Cosmetic changes applied to every mirrored page after its links are
//! rewritten: title suffix and matching heading, meta allow-list, favicon and
//! utility script references, and a sitemap link.

use super::html::{attr, element_from_html, replace_text, select_all, select_first};
use crate::site::{SiteAssets, FAVICON_HREF, SITEMAP_FILE};
use kuchiki::iter::NodeIterator;
use kuchiki::NodeRef;

const META_NAMES: &[&str] = &[
    "district",
    "viewport",
    "format-detection",
    "theme-color",
    "renderer",
    "referrer",
    "description",
];

const META_NAME_PREFIXES: &[&str] = &["apple-mobile-web-app-", "msapplication-"];

const COLUMN_SELECTORS: &[&str] = &[
    ".row > [class*=col-]",
    "[class*=col-sm-], [class*=col-md-], [class*=col-lg-], [class*=col-xl-]",
];

/// Elements whose children are raw text; a heading can never go inside them
const RAW_TEXT_TAGS: &[&str] = &["script", "style", "noscript", "template", "textarea"];

/// Applies the title suffix and returns the resulting title text
///
/// With a non-blank suffix the title becomes `original-suffix` (or just the
/// suffix when the page had no title); without one the original is kept.
pub fn apply_title(document: &NodeRef, suffix: Option<&str>) -> String {
    let existing = select_first(document, "title");
    let original = existing
        .as_ref()
        .map(|t| t.text_contents().trim().to_string())
        .unwrap_or_default();

    let suffix = match suffix.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s,
        None => return original,
    };

    let title = if original.is_empty() {
        suffix.to_string()
    } else {
        format!("{}-{}", original, suffix)
    };

    match existing {
        Some(node) => replace_text(&node, &title),
        None => {
            if let (Some(head), Some(node)) = (
                select_first(document, "head"),
                element_from_html("<title></title>", "title"),
            ) {
                replace_text(&node, &title);
                head.append(node);
            }
        }
    }
    title
}

/// Inserts an `h1` carrying `title` at the top of the main content container
pub fn insert_heading(document: &NodeRef, title: &str) {
    let title = title.trim();
    if title.is_empty() {
        return;
    }
    let Some(body) = select_first(document, "body") else {
        return;
    };
    let Some(heading) = element_from_html(
        r#"<h1 class="mirror-title" style="margin:0;font-size:inherit;font-weight:inherit;"></h1>"#,
        "h1",
    ) else {
        return;
    };
    replace_text(&heading, title);
    heading_target(&body).prepend(heading);
}

fn heading_target(body: &NodeRef) -> NodeRef {
    if let Some(header) = select_first(body, "header") {
        return header;
    }

    if let Some(container) = select_first(body, "body > div, body > main, body > section") {
        for selector in COLUMN_SELECTORS {
            if let Some(column) = select_first(&container, selector) {
                return column;
            }
        }
    }

    body.children()
        .elements()
        .find(|el| !RAW_TEXT_TAGS.contains(&&*el.name.local))
        .map(|el| el.as_node().clone())
        .unwrap_or_else(|| body.clone())
}

/// Removes every `<meta>` outside the allow-list
///
/// `http-equiv` and `charset` metas are always kept; named metas are kept when
/// the name is allowed; everything else, including `property` metadata, goes.
pub fn filter_meta(document: &NodeRef) {
    for meta in select_all(document, "meta") {
        let keep = {
            let attrs = meta.attributes.borrow();
            if attrs.contains("http-equiv") || attrs.contains("charset") {
                true
            } else {
                attrs
                    .get("name")
                    .map(|n| is_allowed_meta_name(&n.trim().to_ascii_lowercase()))
                    .unwrap_or(false)
            }
        };
        if !keep {
            meta.as_node().detach();
        }
    }
}

fn is_allowed_meta_name(name: &str) -> bool {
    META_NAMES.contains(&name) || META_NAME_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Points the page at the site favicon and utility scripts
///
/// Existing icon links are replaced by a single favicon link at the top of
/// `<head>`; each utility script is appended to `<head>` unless already
/// referenced. Home-only scripts are linked from the home page only.
pub fn link_site_assets(document: &NodeRef, assets: &SiteAssets, is_home: bool) {
    let Some(head) = select_first(document, "head") else {
        return;
    };

    for link in select_all(&head, "link[rel]") {
        let is_icon = attr(&link, "rel")
            .map(|rel| rel.to_ascii_lowercase().contains("icon"))
            .unwrap_or(false);
        if is_icon {
            link.as_node().detach();
        }
    }

    let favicon = format!(r#"<link rel="icon" type="image/x-icon" href="{}">"#, FAVICON_HREF);
    if let Some(link) = element_from_html(&favicon, "link") {
        head.prepend(link);
    }

    for script in assets.scripts_for_page(is_home) {
        let src = script.src();
        let present = select_all(document, "script[src]")
            .iter()
            .any(|s| attr(s, "src").as_deref() == Some(src.as_str()));
        if present {
            continue;
        }
        let html = format!(
            r#"<script src="{}"></script>"#,
            html_escape::encode_double_quoted_attribute(&src)
        );
        if let Some(node) = element_from_html(&html, "script") {
            head.append(node);
        }
    }
}

/// Appends a link to the sitemap unless the page already has one
pub fn append_sitemap_link(document: &NodeRef) {
    let present = select_all(document, "a[href]").iter().any(|a| {
        attr(a, "href")
            .map(|h| h.trim().to_ascii_lowercase().ends_with(SITEMAP_FILE))
            .unwrap_or(false)
    });
    if present {
        return;
    }

    let html = format!(r#"<a href="/{}">Sitemap</a>"#, SITEMAP_FILE);
    if let (Some(body), Some(link)) = (select_first(document, "body"), element_from_html(&html, "a")) {
        body.append(link);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuchiki::traits::*;

    fn parse(html: &str) -> NodeRef {
        kuchiki::parse_html().one(html)
    }

    fn serialize(doc: &NodeRef) -> String {
        let mut out = Vec::new();
        doc.serialize(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_title_suffix() {
        let doc = parse("<html><head><title> News </title></head><body></body></html>");
        assert_eq!(apply_title(&doc, Some("Archive")), "News-Archive");
        assert_eq!(select_first(&doc, "title").unwrap().text_contents(), "News-Archive");
    }

    #[test]
    fn test_title_without_suffix_is_kept() {
        let doc = parse("<html><head><title>News</title></head><body></body></html>");
        assert_eq!(apply_title(&doc, Some("  ")), "News");
        assert_eq!(apply_title(&doc, None), "News");
    }

    #[test]
    fn test_missing_title_is_created() {
        let doc = parse("<html><head></head><body></body></html>");
        assert_eq!(apply_title(&doc, Some("Archive")), "Archive");
        assert!(serialize(&doc).contains("<title>Archive</title>"));
    }

    #[test]
    fn test_heading_prefers_header() {
        let doc = parse("<body><div><p>x</p></div><header><nav>n</nav></header></body>");
        insert_heading(&doc, "Home");
        let header = select_first(&doc, "header").unwrap();
        let first = header.children().elements().next().unwrap();
        assert_eq!(&*first.name.local, "h1");
        assert_eq!(first.text_contents(), "Home");
    }

    #[test]
    fn test_heading_prefers_grid_column() {
        let doc = parse(
            r#"<body><div class="container"><div class="row"><div class="col-md-8"><p>x</p></div></div></div></body>"#,
        );
        insert_heading(&doc, "Home");
        let column = select_first(&doc, ".col-md-8").unwrap();
        let first = column.children().elements().next().unwrap();
        assert_eq!(&*first.name.local, "h1");
    }

    #[test]
    fn test_heading_skips_leading_script() {
        let doc = parse("<body><script>var a = 1;</script><p>x</p></body>");
        insert_heading(&doc, "Home");
        let p = select_first(&doc, "p").unwrap();
        assert_eq!(&*p.children().elements().next().unwrap().name.local, "h1");
        assert_eq!(select_first(&doc, "script").unwrap().text_contents(), "var a = 1;");
    }

    #[test]
    fn test_heading_falls_back_to_body() {
        let doc = parse("<body>plain text</body>");
        insert_heading(&doc, "Home");
        let body = select_first(&doc, "body").unwrap();
        assert_eq!(&*body.children().elements().next().unwrap().name.local, "h1");
    }

    #[test]
    fn test_meta_allow_list() {
        let doc = parse(
            r##"<head>
<meta charset="utf-8">
<meta http-equiv="X-UA-Compatible" content="IE=edge">
<meta name="viewport" content="width=device-width">
<meta name="msapplication-TileColor" content="#fff">
<meta name="apple-mobile-web-app-capable" content="yes">
<meta name="keywords" content="a,b">
<meta property="og:title" content="x">
<meta name="twitter:card" content="summary">
</head>"##,
        );
        filter_meta(&doc);
        let html = serialize(&doc);
        assert!(html.contains("charset"));
        assert!(html.contains("X-UA-Compatible"));
        assert!(html.contains("viewport"));
        assert!(html.contains("msapplication-TileColor"));
        assert!(html.contains("apple-mobile-web-app-capable"));
        assert!(!html.contains("keywords"));
        assert!(!html.contains("og:title"));
        assert!(!html.contains("twitter:card"));
    }

    #[test]
    fn test_site_assets_linked_once() {
        let doc = parse(
            r#"<html><head><link rel="shortcut icon" href="/old.ico"><script src="/templets/common.js"></script></head><body></body></html>"#,
        );
        let assets = SiteAssets::default();
        link_site_assets(&doc, &assets, false);

        let html = serialize(&doc);
        assert!(!html.contains("old.ico"));
        let icons = select_all(&doc, "link[rel=icon]");
        assert_eq!(icons.len(), 1);
        assert_eq!(attr(&icons[0], "href").as_deref(), Some("/favicon.ico"));
        assert_eq!(attr(&icons[0], "type").as_deref(), Some("image/x-icon"));
        assert_eq!(html.matches("/templets/common.js").count(), 1);
        assert!(!html.contains("/templets/home.js"));

        let home = parse("<html><head></head><body></body></html>");
        link_site_assets(&home, &assets, true);
        assert!(serialize(&home).contains("/templets/home.js"));
    }

    #[test]
    fn test_sitemap_link() {
        let doc = parse("<body><p>x</p></body>");
        append_sitemap_link(&doc);
        append_sitemap_link(&doc);
        let html = serialize(&doc);
        assert_eq!(html.matches(r#"<a href="/sitemap.xml">Sitemap</a>"#).count(), 1);
    }
}
