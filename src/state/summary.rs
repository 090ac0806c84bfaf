use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Report of a finished job
///
/// A job may succeed with a non-empty error list: a partial mirror is a valid
/// outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub output_directory: PathBuf,
    pub pages_downloaded: u32,
    pub assets_downloaded: u32,
    pub elapsed_ms: u64,
    pub errors: Vec<String>,
    /// Saved page URLs, sorted
    pub saved_pages: Vec<String>,
}

impl JobSummary {
    /// Summary of a job that could not start
    pub fn setup_failure(output_directory: PathBuf, message: impl Into<String>) -> Self {
        Self {
            output_directory,
            pages_downloaded: 0,
            assets_downloaded: 0,
            elapsed_ms: 0,
            errors: vec![message.into()],
            saved_pages: Vec::new(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }
}

/// Formats a duration as `"{minutes}m {seconds}s"`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}m {}s", secs / 60, secs % 60)
}
