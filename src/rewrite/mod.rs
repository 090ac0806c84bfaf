//! Link rewriting for mirrored pages, stylesheets and scripts
//!
//! # Components
//!
//! - [`html::LinkRewriter`]: rewrites one parsed page and saves its resources
//! - [`css`]: `url(...)` rewriting for stylesheets and inline styles
//! - [`script`]: navigation rewriting and asset harvesting inside script text
//! - [`patterns`]: the named text matchers used by the CSS and script passes
//! - [`augment`]: title, heading, meta filtering and site-asset injection
//! - [`download`]: dedup-gated asset, stylesheet and script downloads
//! - [`replace`]: literal replacement rules

pub mod augment;
pub mod css;
pub mod download;
pub mod html;
pub mod patterns;
pub mod replace;
pub mod script;

pub use download::{download_asset, mirror_script, mirror_stylesheet, AssetOutcome};
pub use html::LinkRewriter;
pub use replace::apply_replacements;
pub use script::{collect_pending_pages, extract_assets, rewrite_links, sanitize_js_url};

use std::ops::Range;

/// A replacement of one byte range of the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub range: Range<usize>,
    pub text: String,
}

impl Edit {
    pub fn new(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }
}

/// Applies non-overlapping edits to the original text in a single pass
///
/// Edits are ordered by start offset; an edit overlapping one already accepted
/// is dropped, so the first matcher to claim a span wins.
pub fn splice(source: &str, mut edits: Vec<Edit>) -> String {
    if edits.is_empty() {
        return source.to_string();
    }

    // stable sort keeps matcher priority for identical ranges
    edits.sort_by_key(|e| e.range.start);

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.range.start < cursor || edit.range.end > source.len() {
            continue;
        }
        out.push_str(&source[cursor..edit.range.start]);
        out.push_str(&edit.text);
        cursor = edit.range.end;
    }
    out.push_str(&source[cursor..]);
    out
}
