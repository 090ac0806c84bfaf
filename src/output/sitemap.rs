//! Sitemap generation
//!
//! Builds a sitemaps.org `urlset` from the pages a job saved and writes it to
//! `<host dir>/sitemap.xml`, overwriting any previous one.

use crate::site::{host_dir, SITEMAP_FILE};
use crate::MirrorError;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use url::Url;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Returns the `<loc>` prefix: the override when given, otherwise `https://<host>`
///
/// Trailing slashes are removed so that page paths can be appended directly.
pub fn sitemap_base(start: &Url, domain_override: Option<&str>) -> String {
    let base = match domain_override.map(str::trim).filter(|d| !d.is_empty()) {
        Some(domain) => domain.to_string(),
        None => format!("https://{}", start.host_str().unwrap_or("unknown-host")),
    };
    base.trim_end_matches('/').to_string()
}

/// Renders the sitemap XML for the given page URLs
///
/// Each page contributes `base + path`; pages that share a path are listed
/// once. Entries are sorted, so equal inputs give byte-identical output.
///
/// Paths are emitted as crawled with the query dropped: an extensionless path
/// such as `https://h/a` stays `/a` and gets no trailing `/`.
pub fn build_sitemap<'a>(pages: impl IntoIterator<Item = &'a str>, base: &str, lastmod: NaiveDate) -> String {
    let locs: BTreeSet<String> = pages
        .into_iter()
        .filter_map(|page| Url::parse(page).ok())
        .map(|url| {
            let path = match url.path() {
                "" => "/",
                p => p,
            };
            format!("{}{}", base, path)
        })
        .collect();

    let today = lastmod.format("%Y-%m-%d").to_string();
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(&format!("<urlset xmlns=\"{}\">\n", SITEMAP_NS));
    for loc in &locs {
        xml.push_str("  <url>\n");
        xml.push_str(&format!(
            "    <loc>{}</loc>\n",
            html_escape::encode_quoted_attribute(loc)
        ));
        xml.push_str(&format!("    <lastmod>{}</lastmod>\n", today));
        xml.push_str("    <changefreq>weekly</changefreq>\n");
        xml.push_str("    <priority>0.5</priority>\n");
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");
    xml
}

/// Writes the sitemap for a job into the start host's directory
///
/// # Arguments
///
/// * `root` - The job output directory
/// * `start` - The job's start URL; its host names the target directory
/// * `pages` - Saved page URLs
/// * `domain_override` - Optional `<loc>` prefix
pub async fn write_sitemap(
    root: &Path,
    start: &Url,
    pages: &BTreeSet<String>,
    domain_override: Option<&str>,
) -> Result<PathBuf, MirrorError> {
    let base = sitemap_base(start, domain_override);
    let today = chrono::Local::now().date_naive();
    let xml = build_sitemap(pages.iter().map(String::as_str), &base, today);

    let dir = host_dir(root, start);
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(SITEMAP_FILE);
    tokio::fs::write(&path, xml.as_bytes()).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn locs(xml: &str) -> Vec<&str> {
        xml.lines()
            .filter_map(|l| l.trim().strip_prefix("<loc>"))
            .filter_map(|l| l.strip_suffix("</loc>"))
            .collect()
    }

    #[test]
    fn test_paths_are_kept_as_crawled() {
        let xml = build_sitemap(["https://h/a", "https://h/b/"], "https://h", date());
        assert_eq!(locs(&xml), vec!["https://h/a", "https://h/b/"]);
    }

    #[test]
    fn test_entry_fields() {
        let xml = build_sitemap(["https://h/"], "https://h", date());
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
        assert!(xml.contains("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">"));
        assert!(xml.contains("<lastmod>2024-05-01</lastmod>"));
        assert!(xml.contains("<changefreq>weekly</changefreq>"));
        assert!(xml.contains("<priority>0.5</priority>"));
    }

    #[test]
    fn test_domain_override() {
        let start = Url::parse("https://old.example.com/news/").unwrap();
        assert_eq!(sitemap_base(&start, None), "https://old.example.com");
        assert_eq!(sitemap_base(&start, Some(" https://new.example.org/ ")), "https://new.example.org");
        assert_eq!(sitemap_base(&start, Some("  ")), "https://old.example.com");

        let xml = build_sitemap(["https://old.example.com/news/"], "https://new.example.org", date());
        assert_eq!(locs(&xml), vec!["https://new.example.org/news/"]);
    }

    #[test]
    fn test_query_pages_share_one_entry_and_escape() {
        let xml = build_sitemap(
            ["https://h/list.do?id=1", "https://h/list.do?id=2", "https://h/a&b"],
            "https://h",
            date(),
        );
        assert_eq!(locs(&xml), vec!["https://h/a&amp;b", "https://h/list.do"]);
    }

    #[tokio::test]
    async fn test_write_sitemap_into_host_dir() {
        let dir = TempDir::new().unwrap();
        let start = Url::parse("https://example.com/").unwrap();
        let pages: BTreeSet<String> = ["https://example.com/".to_string()].into_iter().collect();

        let path = write_sitemap(dir.path(), &start, &pages, None).await.unwrap();
        assert_eq!(path, dir.path().join("example.com").join("sitemap.xml"));
        let xml = std::fs::read_to_string(path).unwrap();
        assert!(xml.contains("<loc>https://example.com/</loc>"));
    }
}
