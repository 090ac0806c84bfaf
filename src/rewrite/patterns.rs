//! Named text matchers for script and stylesheet scanning
//!
//! Every matcher is an independent regex with one URL-bearing capture group.
//! Quote-style alternatives use separate named groups (`dq`, `sq`) because the
//! `regex` crate has no backreferences, and a consuming boundary group stands in
//! for lookbehind on the loose token matcher. [`find_urls`] hides those details
//! and reports the span of whichever group took part in the match.
//!
//! Matchers always run over the original text; callers turn the reported spans
//! into [`Edit`](super::Edit)s and splice them in one pass.

use once_cell::sync::OnceCell;
use regex::Regex;
use std::ops::Range;

/// What a matched URL refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// A navigation target (attribute, `location.href`, `window.open`)
    Navigation,
    /// A same-host absolute URL written as a plain quoted literal
    AbsoluteLiteral,
    /// A rooted `.../index.html` reference to collapse
    IndexSuffix,
    /// A quoted path that may be a page worth crawling
    PendingPage,
    Image,
    Stylesheet,
    Script,
}

/// A named, lazily compiled pattern
pub struct Matcher {
    pub name: &'static str,
    pub kind: MatchKind,
    pattern: &'static str,
    regex: OnceCell<Regex>,
}

impl Matcher {
    pub const fn new(name: &'static str, kind: MatchKind, pattern: &'static str) -> Self {
        Self {
            name,
            kind,
            pattern,
            regex: OnceCell::new(),
        }
    }

    pub fn regex(&self) -> &Regex {
        self.regex.get_or_init(|| {
            Regex::new(self.pattern)
                .unwrap_or_else(|e| panic!("Invalid {} regex: {}", self.name, e))
        })
    }
}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// One URL found by a matcher
#[derive(Debug, Clone)]
pub struct UrlMatch<'t> {
    pub matcher: &'static Matcher,
    /// Byte range of the URL itself
    pub span: Range<usize>,
    /// Byte range of the whole match
    pub full: Range<usize>,
    pub raw: &'t str,
}

const URL_GROUPS: &[&str] = &["url", "dq", "sq", "bare"];

/// Runs a matcher over `text` and returns the URL of every match
pub fn find_urls<'t>(matcher: &'static Matcher, text: &'t str) -> Vec<UrlMatch<'t>> {
    matcher
        .regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let full = caps.get(0)?;
            let group = URL_GROUPS.iter().find_map(|name| caps.name(name))?;
            Some(UrlMatch {
                matcher,
                span: group.range(),
                full: full.range(),
                raw: group.as_str(),
            })
        })
        .collect()
}

/// Collects matches in priority order, dropping any whose URL span overlaps a
/// match accepted earlier
pub fn non_overlapping<'t>(matchers: &[&'static Matcher], text: &'t str) -> Vec<UrlMatch<'t>> {
    let mut accepted: Vec<UrlMatch<'t>> = Vec::new();
    for matcher in matchers {
        for found in find_urls(*matcher, text) {
            let overlaps = accepted
                .iter()
                .any(|a| found.span.start < a.span.end && a.span.start < found.span.end);
            if !overlaps {
                accepted.push(found);
            }
        }
    }
    accepted
}

// Navigation expressions

pub static ATTR_LITERAL: Matcher = Matcher::new(
    "attr_literal",
    MatchKind::Navigation,
    r#"(?i)\b(?:href|src|action)\s*=\s*(?:"(?P<dq>(?:https?://|/)[^'"\s<>\\]+)"|'(?P<sq>(?:https?://|/)[^'"\s<>\\]+)')"#,
);

pub static ATTR_ESCAPED: Matcher = Matcher::new(
    "attr_escaped",
    MatchKind::Navigation,
    r#"(?i)\b(?:href|src|action)\s*=\s*\\["'](?P<url>(?:https?://|/)[^'"\s<>\\]+)\\["']"#,
);

pub static LOCATION_HREF: Matcher = Matcher::new(
    "location_href",
    MatchKind::Navigation,
    r#"(?i)(?:window\.)?location\.href\s*=\s*(?:"(?P<dq>(?:https?://|/)[^'"\s<>\\]+)"|'(?P<sq>(?:https?://|/)[^'"\s<>\\]+)')"#,
);

pub static LOCATION_HREF_ESCAPED: Matcher = Matcher::new(
    "location_href_escaped",
    MatchKind::Navigation,
    r#"(?i)(?:window\.)?location\.href\s*=\s*\\["'](?P<url>(?:https?://|/)[^'"\s<>\\]+)\\["']"#,
);

pub static WINDOW_OPEN: Matcher = Matcher::new(
    "window_open",
    MatchKind::Navigation,
    r#"(?i)window\.open\(\s*(?:"(?P<dq>(?:https?://|/)[^'"\s<>\\]+)"|'(?P<sq>(?:https?://|/)[^'"\s<>\\]+)')"#,
);

pub static WINDOW_OPEN_ESCAPED: Matcher = Matcher::new(
    "window_open_escaped",
    MatchKind::Navigation,
    r#"(?i)window\.open\(\s*\\["'](?P<url>(?:https?://|/)[^'"\s<>\\]+)\\["']"#,
);

pub static ABSOLUTE_LITERAL: Matcher = Matcher::new(
    "absolute_literal",
    MatchKind::AbsoluteLiteral,
    r#"(?i)(?:"(?P<dq>https?://[^/'"\s<>\\]+/[^'"\s<>\\]*)"|'(?P<sq>https?://[^/'"\s<>\\]+/[^'"\s<>\\]*)'|\\["'](?P<url>https?://[^/'"\s<>\\]+/[^'"\s<>\\]*)\\["'])"#,
);

/// Navigation matchers in precedence order
pub static NAVIGATION: [&Matcher; 7] = [
    &LOCATION_HREF,
    &LOCATION_HREF_ESCAPED,
    &WINDOW_OPEN,
    &WINDOW_OPEN_ESCAPED,
    &ATTR_LITERAL,
    &ATTR_ESCAPED,
    &ABSOLUTE_LITERAL,
];

pub static INDEX_SUFFIX: Matcher = Matcher::new(
    "index_suffix",
    MatchKind::IndexSuffix,
    r#"(?i)\b(?:href|src)\s*=\s*\\?["'](?P<url>/(?:[^"'\\\s<>]*/)?index\.html)\\?["']"#,
);

// Page harvesting

pub static QUOTED_INDEX_PAGE: Matcher = Matcher::new(
    "quoted_index_page",
    MatchKind::PendingPage,
    r#"(?i)(?:"(?P<dq>/[^'"\\\s<>]+/index\.html)"|'(?P<sq>/[^'"\\\s<>]+/index\.html)')"#,
);

pub static QUOTED_DIRECTORY: Matcher = Matcher::new(
    "quoted_directory",
    MatchKind::PendingPage,
    r#"(?:"(?P<dq>/[^'"\\\s<>]+/)"|'(?P<sq>/[^'"\\\s<>]+/)')"#,
);

pub static QUOTED_DYNAMIC_PAGE: Matcher = Matcher::new(
    "quoted_dynamic_page",
    MatchKind::PendingPage,
    r#"(?i)(?:"(?P<dq>/[^'"\\\s<>?]+\.(?:do|jsp|html))(?:\?[^'"\s<>]*)?"|'(?P<sq>/[^'"\\\s<>?]+\.(?:do|jsp|html))(?:\?[^'"\s<>]*)?')"#,
);

pub static QUOTED_ROOTED_PATH: Matcher = Matcher::new(
    "quoted_rooted_path",
    MatchKind::PendingPage,
    r#"(?:"(?P<dq>/[^/'"\\\s<>][^'"\\\s<>]*)"|'(?P<sq>/[^/'"\\\s<>][^'"\\\s<>]*)')"#,
);

pub static PENDING_PAGES: [&Matcher; 4] = [
    &QUOTED_INDEX_PAGE,
    &QUOTED_DIRECTORY,
    &QUOTED_DYNAMIC_PAGE,
    &QUOTED_ROOTED_PATH,
];

// Embedded assets, loosest last

pub static CSS_URL: Matcher = Matcher::new(
    "css_url",
    MatchKind::Image,
    r#"(?i)url\(\s*(?:"(?P<dq>[^"')]+)"|'(?P<sq>[^"')]+)'|(?P<url>[^"')]+))\s*\)"#,
);

pub static QUOTED_IMAGE: Matcher = Matcher::new(
    "quoted_image",
    MatchKind::Image,
    r#"(?i)(?:"(?P<dq>(?:https?://|/|\\/|\./|\.\./|[a-z0-9_./-])[^'"\s<>]*\.(?:png|jpe?g|gif|webp|svg|ico))(?:\?[^'"\s<>]*)?"|'(?P<sq>(?:https?://|/|\\/|\./|\.\./|[a-z0-9_./-])[^'"\s<>]*\.(?:png|jpe?g|gif|webp|svg|ico))(?:\?[^'"\s<>]*)?')"#,
);

pub static BARE_IMAGE_TOKEN: Matcher = Matcher::new(
    "bare_image_token",
    MatchKind::Image,
    r#"(?i)(?:^|[^a-z0-9_./-])(?P<bare>(?:https?://|/|\\/|\./|\.\./)[^\s'"<>;,()=]+\.(?:png|jpe?g|gif|webp|svg|ico))(?:\?[^\s'"<>;,()]*)?"#,
);

pub static ESCAPED_DQ_IMAGE: Matcher = Matcher::new(
    "escaped_dq_image",
    MatchKind::Image,
    r#"(?i)\\"(?P<url>(?:https?://|/|\./|\.\./)[^\\"\s<>]+\.(?:png|jpe?g|gif|webp|svg|ico))(?:\?[^\\"\s<>]*)?\\""#,
);

pub static ESCAPED_SQ_IMAGE: Matcher = Matcher::new(
    "escaped_sq_image",
    MatchKind::Image,
    r#"(?i)\\'(?P<url>(?:https?://|/|\./|\.\./)[^\\'\s<>]+\.(?:png|jpe?g|gif|webp|svg|ico))(?:\?[^\\'\s<>]*)?\\'"#,
);

pub static SRC_ATTR_LITERAL: Matcher = Matcher::new(
    "src_attr_literal",
    MatchKind::Image,
    r#"(?i)\bsrc\s*=\s*(?:"(?P<dq>(?:https?://|/)[^'"\s<>\\]+)"|'(?P<sq>(?:https?://|/)[^'"\s<>\\]+)')"#,
);

pub static SRC_ATTR_ESCAPED: Matcher = Matcher::new(
    "src_attr_escaped",
    MatchKind::Image,
    r#"(?i)\bsrc\s*=\s*\\["'](?P<url>(?:https?://|/)[^'"\s<>\\]+)\\["']"#,
);

pub static IMG_TAG_LITERAL: Matcher = Matcher::new(
    "img_tag_literal",
    MatchKind::Image,
    r#"(?i)<img[^>]+src\s*=\s*(?:"(?P<dq>[^'"\s<>\\]+\.(?:png|jpe?g|gif|webp|svg|ico))(?:\?[^'"<>]*)?"|'(?P<sq>[^'"\s<>\\]+\.(?:png|jpe?g|gif|webp|svg|ico))(?:\?[^'"<>]*)?')"#,
);

pub static IMG_TAG_ESCAPED: Matcher = Matcher::new(
    "img_tag_escaped",
    MatchKind::Image,
    r#"(?i)<img[^>]+src\s*=\s*\\["'](?P<url>[^\\'"\s<>]+\.(?:png|jpe?g|gif|webp|svg|ico))(?:\?[^\\'"<>]*)?\\["']"#,
);

pub static LINK_TAG_CSS: Matcher = Matcher::new(
    "link_tag_css",
    MatchKind::Stylesheet,
    r#"(?i)<link[^>]+href\s*=\s*(?:"(?P<dq>[^'"\s<>\\]+\.css)(?:\?[^'"<>]*)?"|'(?P<sq>[^'"\s<>\\]+\.css)(?:\?[^'"<>]*)?')"#,
);

pub static LINK_TAG_CSS_ESCAPED: Matcher = Matcher::new(
    "link_tag_css_escaped",
    MatchKind::Stylesheet,
    r#"(?i)<link[^>]+href\s*=\s*\\["'](?P<url>[^\\'"\s<>]+\.css)(?:\?[^\\'"<>]*)?\\["']"#,
);

pub static SCRIPT_TAG_JS: Matcher = Matcher::new(
    "script_tag_js",
    MatchKind::Script,
    r#"(?i)<script[^>]+src\s*=\s*(?:"(?P<dq>[^'"\s<>\\]+\.js)(?:\?[^'"<>]*)?"|'(?P<sq>[^'"\s<>\\]+\.js)(?:\?[^'"<>]*)?')"#,
);

pub static SCRIPT_TAG_JS_ESCAPED: Matcher = Matcher::new(
    "script_tag_js_escaped",
    MatchKind::Script,
    r#"(?i)<script[^>]+src\s*=\s*\\["'](?P<url>[^\\'"\s<>]+\.js)(?:\?[^\\'"<>]*)?\\["']"#,
);

// `document.write('<link href="' + base + 'a.css' + ...)` style concatenation
pub static SPLIT_CSS_DQ: Matcher = Matcher::new(
    "split_css_dq",
    MatchKind::Stylesheet,
    r#"(?i)\bhref\s*=\s*"(?P<url>[^"]*\.css)\s*'\s*\+"#,
);

pub static SPLIT_CSS_SQ: Matcher = Matcher::new(
    "split_css_sq",
    MatchKind::Stylesheet,
    r#"(?i)\bhref\s*=\s*'(?P<url>[^']*\.css)\s*"\s*\+"#,
);

pub static SPLIT_JS_DQ: Matcher = Matcher::new(
    "split_js_dq",
    MatchKind::Script,
    r#"(?i)\bsrc\s*=\s*"(?P<url>[^"]*\.js)\s*'\s*\+"#,
);

pub static SPLIT_JS_SQ: Matcher = Matcher::new(
    "split_js_sq",
    MatchKind::Script,
    r#"(?i)\bsrc\s*=\s*'(?P<url>[^']*\.js)\s*"\s*\+"#,
);

/// Asset matchers in scan order
pub static EMBEDDED_ASSETS: [&Matcher; 17] = [
    &CSS_URL,
    &QUOTED_IMAGE,
    &BARE_IMAGE_TOKEN,
    &ESCAPED_DQ_IMAGE,
    &ESCAPED_SQ_IMAGE,
    &SRC_ATTR_LITERAL,
    &SRC_ATTR_ESCAPED,
    &IMG_TAG_LITERAL,
    &IMG_TAG_ESCAPED,
    &LINK_TAG_CSS,
    &LINK_TAG_CSS_ESCAPED,
    &SCRIPT_TAG_JS,
    &SCRIPT_TAG_JS_ESCAPED,
    &SPLIT_CSS_DQ,
    &SPLIT_CSS_SQ,
    &SPLIT_JS_DQ,
    &SPLIT_JS_SQ,
];
