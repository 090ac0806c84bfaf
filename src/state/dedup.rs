use std::collections::HashSet;

/// Per-job claim registry
///
/// Resource handling inside a job is sequential, so plain sets are enough: a
/// claim is a check-and-set on `&mut self`.
#[derive(Debug, Default)]
pub struct DedupStore {
    assets: HashSet<String>,
    scripts: HashSet<String>,
    failed: HashSet<String>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims an asset URL for download
    ///
    /// Returns true only the first time a URL is seen within the job.
    pub fn try_claim_asset(&mut self, url: &str) -> bool {
        self.assets.insert(url.to_string())
    }

    /// Claims a script URL for embedded-asset scanning
    pub fn try_claim_script(&mut self, url: &str) -> bool {
        self.scripts.insert(url.to_string())
    }

    /// Remembers that a claimed asset could not be downloaded
    pub fn mark_failed(&mut self, url: &str) {
        self.failed.insert(url.to_string());
    }

    /// Returns true if an earlier download of this asset failed
    pub fn has_failed(&self, url: &str) -> bool {
        self.failed.contains(url)
    }
}
