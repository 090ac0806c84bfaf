use crate::UrlError;
use url::Url;

/// Schemes that never point at something the mirror can download
const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:", "about:", "blob:"];

/// Normalizes a user-supplied start URL
///
/// # Normalization Steps
///
/// 1. Trim surrounding whitespace; reject blank input
/// 2. Default the scheme to `https://` when none is given
/// 3. Parse; only `http` and `https` are accepted
/// 4. Require a host
///
/// # Arguments
///
/// * `raw` - The start URL as typed by the operator
///
/// # Returns
///
/// * `Ok(Url)` - The absolute start URL
/// * `Err(UrlError)` - The input cannot be used as a crawl root
///
/// # Examples
///
/// ```
/// use site_mirror::url::normalize_start_url;
///
/// let url = normalize_start_url("example.com/docs").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/docs");
/// ```
pub fn normalize_start_url(raw: &str) -> Result<Url, UrlError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Parse("start URL is blank".to_string()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&candidate).map_err(|e| UrlError::Parse(format!("{}: {}", trimmed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost(trimmed.to_string()));
    }

    Ok(url)
}

/// Resolves an attribute value against a base URL
///
/// Returns `None` for blank values, fragment-only references and schemes the
/// mirror never downloads (`javascript:`, `mailto:`, `tel:`, `data:`...).
pub fn resolve_link(base: &Url, raw: &str) -> Option<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let lower = trimmed.to_ascii_lowercase();
    if SKIPPED_SCHEMES.iter().any(|s| lower.starts_with(s)) {
        return None;
    }

    base.join(trimmed).ok()
}

/// Returns a copy of the URL without its fragment
pub fn strip_fragment(url: &Url) -> Url {
    let mut stripped = url.clone();
    stripped.set_fragment(None);
    stripped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_is_defaulted() {
        let url = normalize_start_url("example.com").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_explicit_http_is_kept() {
        let url = normalize_start_url("  http://example.com/a  ").unwrap();
        assert_eq!(url.as_str(), "http://example.com/a");
    }

    #[test]
    fn test_blank_is_rejected() {
        assert!(matches!(normalize_start_url("   "), Err(UrlError::Parse(_))));
    }

    #[test]
    fn test_ftp_is_rejected() {
        assert!(matches!(
            normalize_start_url("ftp://example.com/"),
            Err(UrlError::InvalidScheme(_))
        ));
    }

    #[test]
    fn test_resolve_relative_link() {
        let base = Url::parse("https://example.com/a/b.html").unwrap();
        let url = resolve_link(&base, "../c/d.png").unwrap();
        assert_eq!(url.as_str(), "https://example.com/c/d.png");
    }

    #[test]
    fn test_resolve_skips_non_http_schemes() {
        let base = Url::parse("https://example.com/").unwrap();
        assert!(resolve_link(&base, "javascript:void(0)").is_none());
        assert!(resolve_link(&base, "mailto:someone@example.com").is_none());
        assert!(resolve_link(&base, "data:image/png;base64,AAAA").is_none());
        assert!(resolve_link(&base, "#top").is_none());
        assert!(resolve_link(&base, "").is_none());
    }

    #[test]
    fn test_resolve_protocol_relative() {
        let base = Url::parse("https://example.com/").unwrap();
        let url = resolve_link(&base, "//cdn.example.org/lib.js").unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.org/lib.js");
    }

    #[test]
    fn test_strip_fragment() {
        let url = Url::parse("https://example.com/a.html#section").unwrap();
        assert_eq!(strip_fragment(&url).as_str(), "https://example.com/a.html");
    }
}
