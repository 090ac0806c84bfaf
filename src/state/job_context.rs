use crate::state::dedup::DedupStore;
use crate::state::summary::JobSummary;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Mutable state owned by one running job
///
/// Holds the claim registry, the pages harvested from scripts while the current
/// page is processed, and the counters that end up in the [`JobSummary`].
#[derive(Debug, Default)]
pub struct JobContext {
    pub dedup: DedupStore,
    pending_pages: BTreeSet<Url>,
    saved_pages: BTreeSet<String>,
    errors: Vec<String>,
    pages_downloaded: u32,
    assets_downloaded: u32,
}

impl JobContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a per-page or per-resource failure as `"<url> -> <message>"`
    pub fn record_error(&mut self, url: &str, message: impl std::fmt::Display) {
        let entry = format!("{} -> {}", url, message);
        tracing::warn!("{}", entry);
        self.errors.push(entry);
    }

    /// Records a job-level failure that is not tied to one URL
    pub fn record_job_error(&mut self, message: impl Into<String>) {
        let entry = message.into();
        tracing::warn!("{}", entry);
        self.errors.push(entry);
    }

    /// Records a successfully saved page
    pub fn record_page(&mut self, url: &Url) {
        self.saved_pages.insert(url.to_string());
        self.pages_downloaded += 1;
    }

    pub fn record_asset(&mut self) {
        self.assets_downloaded += 1;
    }

    /// Adds a page URL discovered while rewriting a script
    pub fn add_pending_page(&mut self, url: Url) {
        self.pending_pages.insert(url);
    }

    /// Drains the pages harvested while processing the current page
    pub fn take_pending_pages(&mut self) -> Vec<Url> {
        std::mem::take(&mut self.pending_pages).into_iter().collect()
    }

    pub fn saved_pages(&self) -> &BTreeSet<String> {
        &self.saved_pages
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn pages_downloaded(&self) -> u32 {
        self.pages_downloaded
    }

    pub fn assets_downloaded(&self) -> u32 {
        self.assets_downloaded
    }

    /// Freezes the context into the report returned to callers
    pub fn into_summary(self, output_directory: PathBuf, elapsed: Duration) -> JobSummary {
        JobSummary {
            output_directory,
            pages_downloaded: self.pages_downloaded,
            assets_downloaded: self.assets_downloaded,
            elapsed_ms: elapsed.as_millis() as u64,
            errors: self.errors,
            saved_pages: self.saved_pages.into_iter().collect(),
        }
    }
}
