use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Browser-like user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Main configuration structure for Site-Mirror
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub defaults: DefaultsConfig,
    pub pool: PoolConfig,
    pub http: HttpConfig,
    #[serde(rename = "site-assets")]
    pub site_assets: SiteAssetsConfig,
    #[serde(rename = "job")]
    pub jobs: Vec<CrawlRequest>,
}

/// Where mirrored sites and task history are written
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base directory for every job's output tree
    #[serde(rename = "output-base-dir")]
    pub output_base_dir: String,

    /// Optional SQLite file recording task history
    #[serde(rename = "history-database")]
    pub history_database: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_base_dir: "output".to_string(),
            history_database: None,
        }
    }
}

impl StorageConfig {
    /// Returns the output root with whitespace and surrounding quotes removed
    ///
    /// Falls back to `output` when the configured value is blank.
    pub fn output_root(&self) -> PathBuf {
        let trimmed = self.output_base_dir.trim();
        let unquoted = trimmed
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .or_else(|| trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
            .unwrap_or(trimmed)
            .trim();

        if unquoted.is_empty() {
            PathBuf::from("output")
        } else {
            PathBuf::from(unquoted)
        }
    }
}

/// Crawl bounds applied when a job does not override them
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    #[serde(rename = "same-domain")]
    pub same_domain: bool,

    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    #[serde(rename = "max-pages")]
    pub max_pages: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            same_domain: true,
            max_depth: 5,
            max_pages: 500,
        }
    }
}

/// Worker pool sizing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of workers; 0 picks max(2, available parallelism / 2)
    pub workers: usize,

    /// Number of submitted jobs that may wait for a free worker
    #[serde(rename = "queue-capacity")]
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            queue_capacity: 100,
        }
    }
}

impl PoolConfig {
    /// Resolves the configured worker count against the host's parallelism
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);
        (cpus / 2).max(2)
    }
}

/// HTTP client behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    #[serde(rename = "page-timeout-secs")]
    pub page_timeout_secs: u64,

    #[serde(rename = "asset-timeout-secs")]
    pub asset_timeout_secs: u64,

    /// Total attempts for a binary download, first try included
    #[serde(rename = "asset-attempts")]
    pub asset_attempts: u32,

    /// Linear backoff unit between attempts
    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            page_timeout_secs: 20,
            asset_timeout_secs: 30,
            asset_attempts: 3,
            retry_backoff_ms: 500,
        }
    }
}

/// Site-level files written into every mirrored host directory
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteAssetsConfig {
    /// Path to an `.ico` file; the built-in icon is used when absent
    pub favicon: Option<PathBuf>,

    /// Utility scripts placed under `templets/`
    pub scripts: Vec<ScriptAssetEntry>,
}

impl Default for SiteAssetsConfig {
    fn default() -> Self {
        Self {
            favicon: None,
            scripts: vec![
                ScriptAssetEntry {
                    file: "common.js".to_string(),
                    source: None,
                    home_only: false,
                },
                ScriptAssetEntry {
                    file: "home.js".to_string(),
                    source: None,
                    home_only: true,
                },
            ],
        }
    }
}

/// A single injected utility script
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptAssetEntry {
    /// File name under `templets/`
    pub file: String,

    /// Path to the script body; a placeholder is written when absent
    pub source: Option<PathBuf>,

    /// Only reference the script from the home page
    #[serde(rename = "home-only", default)]
    pub home_only: bool,
}

/// Literal text substitution applied to every saved HTML, CSS and script file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplacementRule {
    pub find: String,
    #[serde(alias = "replace-with", default)]
    pub replace_with: String,
}

impl ReplacementRule {
    pub fn new(find: impl Into<String>, replace_with: impl Into<String>) -> Self {
        Self {
            find: find.into(),
            replace_with: replace_with.into(),
        }
    }
}

/// A job submission as it arrives from a config file or a JSON payload
///
/// Every field except the start URL is optional; missing values are filled
/// from [`DefaultsConfig`] by [`CrawlRequest::resolve`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlRequest {
    #[serde(alias = "start-url", default)]
    pub start_url: String,

    #[serde(alias = "same-domain", default)]
    pub same_domain: Option<bool>,

    #[serde(alias = "max-depth", default)]
    pub max_depth: Option<u32>,

    #[serde(alias = "max-pages", default)]
    pub max_pages: Option<u32>,

    #[serde(alias = "output-name", default)]
    pub output_name: Option<String>,

    #[serde(alias = "title-suffix", default)]
    pub title_suffix: Option<String>,

    #[serde(alias = "debug-only-home", default)]
    pub debug_only_home: Option<bool>,

    #[serde(alias = "sitemap-domain", default)]
    pub sitemap_domain: Option<String>,

    #[serde(alias = "replace", alias = "replace-rules", default)]
    pub replace_rules: Vec<ReplacementRule>,
}

impl CrawlRequest {
    /// Creates a request for a start URL with no overrides
    pub fn for_url(start_url: impl Into<String>) -> Self {
        Self {
            start_url: start_url.into(),
            ..Self::default()
        }
    }

    /// Fills unset fields from the configured defaults
    pub fn resolve(&self, defaults: &DefaultsConfig) -> CrawlConfig {
        CrawlConfig {
            start_url: self.start_url.trim().to_string(),
            same_domain: self.same_domain.unwrap_or(defaults.same_domain),
            max_depth: self.max_depth.unwrap_or(defaults.max_depth),
            max_pages: self.max_pages.unwrap_or(defaults.max_pages),
            output_name: non_blank(&self.output_name),
            title_suffix: non_blank(&self.title_suffix),
            debug_only_home: self.debug_only_home.unwrap_or(false),
            sitemap_domain: non_blank(&self.sitemap_domain),
            replace_rules: self.replace_rules.clone(),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Immutable configuration of one mirroring job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlConfig {
    pub start_url: String,
    pub same_domain: bool,
    pub max_depth: u32,
    pub max_pages: u32,
    pub output_name: Option<String>,
    pub title_suffix: Option<String>,
    pub debug_only_home: bool,
    pub sitemap_domain: Option<String>,
    pub replace_rules: Vec<ReplacementRule>,
}

impl CrawlConfig {
    /// Creates a job configuration with the built-in defaults
    pub fn new(start_url: impl Into<String>) -> Self {
        CrawlRequest::for_url(start_url).resolve(&DefaultsConfig::default())
    }
}
