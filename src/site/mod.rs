//! Local filesystem layout of a mirrored site
//!
//! [`path_mapper`] turns URLs into paths under a job's output directory and computes
//! the relative links written back into pages. [`assets`] owns the protected
//! site-level files (favicon, utility scripts, sitemap).

pub mod assets;
pub mod path_mapper;

pub use assets::{SiteAssets, UtilityScript, FAVICON_HREF, SITEMAP_FILE, TEMPLETS_DIR};
pub use path_mapper::{
    host_dir, map_to_local_path, normalize_index_link, relative_path, root_relative_path,
    sanitize_segment,
};
