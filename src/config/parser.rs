use crate::config::types::{AppConfig, CrawlRequest};
use crate::config::validation::{validate, validate_request};
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(AppConfig)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use site_mirror::config::load_config;
///
/// let config = load_config(Path::new("mirror.toml")).unwrap();
/// println!("Output root: {}", config.storage.output_root().display());
/// ```
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration text
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is logged at startup and stored with every task history row so
/// that runs can be tied back to the exact configuration that produced them.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(AppConfig, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Loads a JSON job payload (`startUrl`, `maxDepth`, `replaceRules`...)
pub fn load_job_file(path: &Path) -> Result<CrawlRequest, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let request: CrawlRequest = serde_json::from_str(&content)?;
    validate_request(&request)?;
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[storage]
output-base-dir = "mirrors"

[defaults]
max-depth = 3
max-pages = 50

[pool]
workers = 4
queue-capacity = 10

[[job]]
start-url = "https://example.com/"
output-name = "example"
title-suffix = "Archive"

[[job.replace]]
find = "Example Corp"
replace-with = "Example Archive"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.defaults.max_depth, 3);
        assert!(config.defaults.same_domain);
        assert_eq!(config.pool.workers, 4);
        assert_eq!(config.jobs.len(), 1);
        assert_eq!(config.jobs[0].output_name.as_deref(), Some("example"));
        assert_eq!(config.jobs[0].replace_rules[0].replace_with, "Example Archive");

        let job = config.jobs[0].resolve(&config.defaults);
        assert_eq!(job.max_depth, 3);
        assert_eq!(job.max_pages, 50);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let file = create_temp_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.storage.output_base_dir, "output");
        assert_eq!(config.pool.queue_capacity, 100);
        assert_eq!(config.http.page_timeout_secs, 20);
        assert_eq!(config.site_assets.scripts.len(), 2);
        assert!(config.jobs.is_empty());
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/mirror.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[pool]
queue-capacity = 0
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_blank_job_url_is_rejected() {
        let config_content = r#"
[[job]]
start-url = "   "
"#;
        let file = create_temp_config(config_content);
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_load_job_file() {
        let file = create_temp_config(
            r#"{"startUrl": "example.com", "sameDomain": false, "debugOnlyHome": true}"#,
        );
        let request = load_job_file(file.path()).unwrap();
        assert_eq!(request.same_domain, Some(false));
        assert_eq!(request.debug_only_home, Some(true));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
