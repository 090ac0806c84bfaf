//! URL handling module for Site-Mirror
//!
//! This module provides start-URL normalization, link resolution, host comparison
//! and the page/asset classification used throughout the crawl.

mod classify;
mod domain;
mod normalize;

// Re-export main functions
pub use classify::{
    is_http_like, is_image_path, is_page_like, is_page_like_path, is_sitemap_xml,
    IMAGE_EXTENSIONS, NON_PAGE_EXTENSIONS,
};
pub use domain::{extract_host, same_host};
pub use normalize::{normalize_start_url, resolve_link, strip_fragment};
