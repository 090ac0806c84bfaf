//! HTML parser for frontier expansion
//!
//! This module reads a fetched page (before rewriting) to extract:
//! - Anchor targets to follow
//! - The page title, for progress logging

use crate::url::{is_http_like, resolve_link, strip_fragment};
use scraper::{Html, Selector};
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Anchor targets, absolute and without fragments, in document order
    pub links: Vec<Url>,
}

/// Parses HTML content and extracts anchor targets and the title
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document, `rel="nofollow"` included
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - Fragment-only links
/// - Anything that does not resolve to `http`/`https`
///
/// Resource tags (`link`, `script`, `img`) never expand the frontier.
///
/// # Example
///
/// ```
/// use site_mirror::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page#top">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links[0].as_str(), "https://example.com/page");
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        links: extract_links(&document, base_url),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            let resolved = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(base_url, href))
                .filter(is_http_like);

            if let Some(url) = resolved {
                links.push(strip_fragment(&url));
            }
        }
    }

    links
}
