use std::path::{Component, Path, PathBuf};
use url::Url;

/// Directory used when a URL carries no host
const UNKNOWN_HOST: &str = "unknown-host";

/// Percent-decodes a path segment and replaces everything outside `[A-Za-z0-9._-]` with `-`
///
/// # Examples
///
/// ```
/// use site_mirror::site::sanitize_segment;
///
/// assert_eq!(sanitize_segment("hello%20world.png"), "hello-world.png");
/// assert_eq!(sanitize_segment("a&b=c"), "a-b-c");
/// ```
pub fn sanitize_segment(raw: &str) -> String {
    let decoded = urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string());

    let sanitized: String = decoded
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();

    // keep decoded dot segments inside the host directory
    if sanitized == "." || sanitized == ".." {
        sanitized.replace('.', "-")
    } else {
        sanitized
    }
}

/// Returns the top-level directory for the URL's host under `root`
pub fn host_dir(root: &Path, url: &Url) -> PathBuf {
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .map(|h| sanitize_segment(&h.to_lowercase()))
        .unwrap_or_else(|| UNKNOWN_HOST.to_string());
    root.join(host)
}

/// Maps an absolute URL to its local file path under `root`
///
/// The mapping is a pure function of its arguments:
///
/// - the host becomes the top-level directory
/// - every path segment is sanitized independently
/// - pages ending in `/` get `index.html`; extensionless pages get `.html`
/// - a query string is folded into the file name as `_q_<query>`, before the
///   extension when there is one
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use url::Url;
/// use site_mirror::site::map_to_local_path;
///
/// let root = Path::new("/out");
/// let url = Url::parse("https://example.com/news/").unwrap();
/// assert_eq!(
///     map_to_local_path(root, &url, true),
///     Path::new("/out/example.com/news/index.html")
/// );
/// ```
pub fn map_to_local_path(root: &Path, url: &Url, is_page: bool) -> PathBuf {
    let raw_path = url.path();
    let mut segments: Vec<String> = raw_path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(sanitize_segment)
        .collect();

    if is_page {
        if raw_path.is_empty() || raw_path.ends_with('/') {
            segments.push("index.html".to_string());
        } else if let Some(last) = segments.last_mut() {
            if !last.contains('.') {
                last.push_str(".html");
            }
        }
    }

    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        let suffix = format!("_q_{}", sanitize_segment(query));
        match segments.last_mut() {
            Some(last) => match last.rfind('.') {
                Some(dot) if dot > 0 => last.insert_str(dot, &suffix),
                _ => {
                    last.push_str(&suffix);
                    if is_page {
                        last.push_str(".html");
                    }
                }
            },
            None => {
                let ext = if is_page { ".html" } else { "" };
                segments.push(format!("index{}{}", suffix, ext));
            }
        }
    }

    let mut path = host_dir(root, url);
    for segment in segments {
        path.push(segment);
    }
    path
}

/// Computes the path of `target` relative to the directory `from_dir`, using `/` separators
pub fn relative_path(from_dir: &Path, target: &Path) -> String {
    match pathdiff::diff_paths(target, from_dir) {
        Some(rel) => {
            let parts: Vec<String> = rel
                .components()
                .filter_map(|c| match c {
                    Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                    Component::ParentDir => Some("..".to_string()),
                    _ => None,
                })
                .collect();
            parts.join("/")
        }
        None => target.to_string_lossy().replace('\\', "/"),
    }
}

/// Collapses `index.html` endings of a page link
///
/// A link ending in `/index.html` keeps its directory with a trailing `/`; a
/// link that is exactly `index.html` becomes `/`.
pub fn normalize_index_link(rel: &str) -> String {
    if rel == "index.html" {
        "/".to_string()
    } else if let Some(prefix) = rel.strip_suffix("/index.html") {
        format!("{}/", prefix)
    } else {
        rel.to_string()
    }
}

/// Computes a path relative to the site root (the host directory), starting with `/`
///
/// Used inside rewritten scripts, where `../` chains relative to the current page
/// would break as soon as the script is shared between pages.
pub fn root_relative_path(root: &Path, url: &Url, is_page: bool) -> String {
    let local = map_to_local_path(root, url, is_page);
    let rel = relative_path(&host_dir(root, url), &local);
    let rooted = format!("/{}", rel);

    if !is_page {
        return rooted;
    }
    match rooted.strip_suffix("index.html") {
        Some(prefix) if prefix.ends_with('/') => prefix.to_string(),
        _ => rooted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_mapping_is_pure() {
        let root = Path::new("/out/site");
        let u = url("https://example.com/a/b?x=1");
        assert_eq!(
            map_to_local_path(root, &u, true),
            map_to_local_path(root, &u, true)
        );
    }

    #[test]
    fn test_root_page_maps_to_index() {
        let root = Path::new("/out");
        assert_eq!(
            map_to_local_path(root, &url("https://example.com"), true),
            Path::new("/out/example.com/index.html")
        );
    }

    #[test]
    fn test_extensionless_page_gets_html() {
        let root = Path::new("/out");
        assert_eq!(
            map_to_local_path(root, &url("https://example.com/about"), true),
            Path::new("/out/example.com/about.html")
        );
    }

    #[test]
    fn test_extensionless_asset_is_unchanged() {
        let root = Path::new("/out");
        assert_eq!(
            map_to_local_path(root, &url("https://example.com/font/icons"), false),
            Path::new("/out/example.com/font/icons")
        );
    }

    #[test]
    fn test_segments_are_sanitized_independently() {
        let root = Path::new("/out");
        assert_eq!(
            map_to_local_path(root, &url("https://example.com/my%20dir/a+b(1).png"), false),
            Path::new("/out/example.com/my-dir/a-b-1-.png")
        );
    }

    #[test]
    fn test_query_goes_before_extension() {
        let root = Path::new("/out");
        assert_eq!(
            map_to_local_path(root, &url("https://example.com/css/site.css?v=2"), false),
            Path::new("/out/example.com/css/site_q_v-2.css")
        );
    }

    #[test]
    fn test_query_on_extensionless_page() {
        let root = Path::new("/out");
        let plain = map_to_local_path(root, &url("https://example.com/list"), true);
        let queried = map_to_local_path(root, &url("https://example.com/list?page=2"), true);
        assert_eq!(plain, Path::new("/out/example.com/list.html"));
        assert_eq!(queried, Path::new("/out/example.com/list_q_page-2.html"));
    }

    #[test]
    fn test_query_on_extensionless_asset() {
        let root = Path::new("/out");
        assert_eq!(
            map_to_local_path(root, &url("https://example.com/api/img?id=4"), false),
            Path::new("/out/example.com/api/img_q_id-4")
        );
    }

    #[test]
    fn test_query_on_directory_page() {
        let root = Path::new("/out");
        assert_eq!(
            map_to_local_path(root, &url("https://example.com/news/?p=3"), true),
            Path::new("/out/example.com/news/index_q_p-3.html")
        );
    }

    #[test]
    fn test_query_without_path_asset() {
        let root = Path::new("/out");
        assert_eq!(
            map_to_local_path(root, &url("https://example.com/?a=b"), false),
            Path::new("/out/example.com/index_q_a-b")
        );
    }

    #[test]
    fn test_relative_path_siblings_and_parents() {
        let from = Path::new("/out/example.com/news");
        assert_eq!(
            relative_path(from, Path::new("/out/example.com/news/a.html")),
            "a.html"
        );
        assert_eq!(
            relative_path(from, Path::new("/out/example.com/css/site.css")),
            "../css/site.css"
        );
    }

    #[test]
    fn test_index_normalization() {
        assert_eq!(normalize_index_link("index.html"), "/");
        assert_eq!(normalize_index_link("../news/index.html"), "../news/");
        assert_eq!(normalize_index_link("about.html"), "about.html");
    }

    #[test]
    fn test_root_relative_paths() {
        let root = Path::new("/out");
        assert_eq!(
            root_relative_path(root, &url("https://example.com/"), true),
            "/"
        );
        assert_eq!(
            root_relative_path(root, &url("https://example.com/news/index.html"), true),
            "/news/"
        );
        assert_eq!(
            root_relative_path(root, &url("https://example.com/about"), true),
            "/about.html"
        );
        assert_eq!(
            root_relative_path(root, &url("https://example.com/img/a.png"), false),
            "/img/a.png"
        );
    }

    #[test]
    fn test_unknown_host() {
        let root = Path::new("/out");
        let u = url("file:///tmp/a.png");
        assert_eq!(
            map_to_local_path(root, &u, false),
            Path::new("/out/unknown-host/tmp/a.png")
        );
    }
}
