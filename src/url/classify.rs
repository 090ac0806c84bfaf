use url::Url;

/// Extensions that mark a URL as a static asset rather than a page
pub const NON_PAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "svg", "ico", "css", "js", "json", "map", "pdf", "doc",
    "docx", "xls", "xlsx", "ppt", "pptx", "zip", "rar", "7z", "gz", "tar",
];

/// Extensions eligible for loose image harvesting inside scripts
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg", "ico"];

const PAGE_EXTENSIONS: &[&str] = &["html", "htm", "shtml", "xhtml"];

/// Returns the lowercase extension of the last path segment, if any
fn extension_of(path: &str) -> Option<String> {
    let last = path.rsplit('/').next().unwrap_or(path);
    match last.rfind('.') {
        Some(idx) if idx + 1 < last.len() => Some(last[idx + 1..].to_ascii_lowercase()),
        _ => None,
    }
}

/// Classifies a URL path as page-like
///
/// Empty paths, directory paths, `.html`-family files and anything without a
/// recognized non-page extension are pages.
pub fn is_page_like_path(path: &str) -> bool {
    if path.is_empty() || path.ends_with('/') {
        return true;
    }

    match extension_of(path) {
        None => true,
        Some(ext) if PAGE_EXTENSIONS.contains(&ext.as_str()) => true,
        Some(ext) => !NON_PAGE_EXTENSIONS.contains(&ext.as_str()),
    }
}

/// Classifies a URL as page-like (an HTML document rather than an asset)
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_mirror::url::is_page_like;
///
/// assert!(is_page_like(&Url::parse("https://example.com/about").unwrap()));
/// assert!(is_page_like(&Url::parse("https://example.com/list.do?id=3").unwrap()));
/// assert!(!is_page_like(&Url::parse("https://example.com/logo.png").unwrap()));
/// ```
pub fn is_page_like(url: &Url) -> bool {
    is_page_like_path(url.path())
}

/// Returns true if the path (query already stripped) ends in an image extension
pub fn is_image_path(path: &str) -> bool {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    extension_of(path).map_or(false, |ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Returns true for `http` and `https` URLs
pub fn is_http_like(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Returns true if the URL points at a `sitemap.xml` file
pub fn is_sitemap_xml(url: &Url) -> bool {
    url.path().to_ascii_lowercase().ends_with("/sitemap.xml")
}
