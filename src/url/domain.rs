use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_mirror::url::extract_host;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_host(&url), Some("example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true when both URLs carry the same host
///
/// Ports and schemes are ignored: the mirror keys its directory tree on the
/// host alone.
pub fn same_host(a: &Url, b: &Url) -> bool {
    match (extract_host(a), extract_host(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_subdomain() {
        let url = Url::parse("https://blog.example.com/post").unwrap();
        assert_eq!(extract_host(&url), Some("blog.example.com".to_string()));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("https://example.com:8080/").unwrap();
        assert_eq!(extract_host(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_same_host_ignores_scheme_and_port() {
        let a = Url::parse("http://example.com/a").unwrap();
        let b = Url::parse("https://example.com:8443/b").unwrap();
        assert!(same_host(&a, &b));
    }

    #[test]
    fn test_subdomain_is_a_different_host() {
        let a = Url::parse("https://example.com/").unwrap();
        let b = Url::parse("https://www.example.com/").unwrap();
        assert!(!same_host(&a, &b));
    }
}
