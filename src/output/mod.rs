//! Output module for job artifacts and reports
//!
//! This module handles:
//! - Writing the sitemap of a mirrored site
//! - Formatting task reports and history listings for the terminal

mod report;
mod sitemap;

pub use report::{format_history, format_report, print_report, status_counts};
pub use sitemap::{build_sitemap, sitemap_base, write_sitemap};
