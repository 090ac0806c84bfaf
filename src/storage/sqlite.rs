//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the [`TaskStore`] trait.

use crate::config::{CrawlConfig, ReplacementRule};
use crate::state::{JobSummary, TaskStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{StorageError, StorageResult, TaskStore};
use crate::tasks::TaskSnapshot;
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};

/// SQLite task history backend
pub struct SqliteTaskStore {
    conn: Mutex<Connection>,
}

impl SqliteTaskStore {
    /// Opens (or creates) the history database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteTaskStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl TaskStore for SqliteTaskStore {
    fn record(&self, task: &TaskSnapshot) -> StorageResult<()> {
        let config = &task.config;
        let replace_rules = serde_json::to_string(&config.replace_rules)?;
        let errors = match &task.summary {
            Some(summary) => serde_json::to_string(&summary.errors)?,
            None => "[]".to_string(),
        };
        let summary = task.summary.as_ref();

        self.conn.lock().execute(
            "INSERT OR REPLACE INTO crawl_task (
                id, status, start_url, same_domain, max_depth, max_pages, debug_only_home,
                output_name, output_dir, title_suffix, sitemap_domain, replace_rules,
                pages_downloaded, assets_downloaded, elapsed_ms, errors,
                submitted_at, started_at, finished_at, duration, worker, error_message, config_hash
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                      ?17, ?18, ?19, ?20, ?21, ?22, ?23)",
            params![
                task.id,
                task.status.to_db_string(),
                config.start_url,
                config.same_domain,
                config.max_depth,
                config.max_pages,
                config.debug_only_home,
                config.output_name,
                summary.map(|s| s.output_directory.to_string_lossy().into_owned()),
                config.title_suffix,
                config.sitemap_domain,
                replace_rules,
                summary.map(|s| s.pages_downloaded),
                summary.map(|s| s.assets_downloaded),
                summary.map(|s| s.elapsed_ms as i64),
                errors,
                task.submitted_at,
                task.started_at,
                task.finished_at,
                task.duration,
                task.worker,
                task.error,
                task.config_hash,
            ],
        )?;
        Ok(())
    }

    fn recent(&self, limit: usize) -> StorageResult<Vec<TaskSnapshot>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, status, start_url, same_domain, max_depth, max_pages, debug_only_home,
                    output_name, output_dir, title_suffix, sitemap_domain, replace_rules,
                    pages_downloaded, assets_downloaded, elapsed_ms, errors,
                    submitted_at, started_at, finished_at, duration, worker, error_message, config_hash
             FROM crawl_task
             ORDER BY submitted_at DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], RawTaskRow::from_row)?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?.into_snapshot()?);
        }
        Ok(tasks)
    }
}

/// Column values of one `crawl_task` row before JSON decoding
struct RawTaskRow {
    id: String,
    status: String,
    start_url: String,
    same_domain: bool,
    max_depth: u32,
    max_pages: u32,
    debug_only_home: bool,
    output_name: Option<String>,
    output_dir: Option<String>,
    title_suffix: Option<String>,
    sitemap_domain: Option<String>,
    replace_rules: String,
    pages_downloaded: Option<u32>,
    assets_downloaded: Option<u32>,
    elapsed_ms: Option<i64>,
    errors: String,
    submitted_at: String,
    started_at: Option<String>,
    finished_at: Option<String>,
    duration: String,
    worker: Option<String>,
    error_message: Option<String>,
    config_hash: Option<String>,
}

impl RawTaskRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            status: row.get(1)?,
            start_url: row.get(2)?,
            same_domain: row.get(3)?,
            max_depth: row.get(4)?,
            max_pages: row.get(5)?,
            debug_only_home: row.get(6)?,
            output_name: row.get(7)?,
            output_dir: row.get(8)?,
            title_suffix: row.get(9)?,
            sitemap_domain: row.get(10)?,
            replace_rules: row.get(11)?,
            pages_downloaded: row.get(12)?,
            assets_downloaded: row.get(13)?,
            elapsed_ms: row.get(14)?,
            errors: row.get(15)?,
            submitted_at: row.get(16)?,
            started_at: row.get(17)?,
            finished_at: row.get(18)?,
            duration: row.get(19)?,
            worker: row.get(20)?,
            error_message: row.get(21)?,
            config_hash: row.get(22)?,
        })
    }

    fn into_snapshot(self) -> StorageResult<TaskSnapshot> {
        let status = TaskStatus::from_db_string(&self.status)
            .ok_or_else(|| StorageError::Database(format!("unknown task status '{}'", self.status)))?;
        let replace_rules: Vec<ReplacementRule> = serde_json::from_str(&self.replace_rules)?;
        let errors: Vec<String> = serde_json::from_str(&self.errors)?;

        let summary = match (self.pages_downloaded, self.assets_downloaded) {
            (Some(pages_downloaded), Some(assets_downloaded)) => Some(JobSummary {
                output_directory: PathBuf::from(self.output_dir.unwrap_or_default()),
                pages_downloaded,
                assets_downloaded,
                elapsed_ms: self.elapsed_ms.unwrap_or(0).max(0) as u64,
                errors,
                saved_pages: Vec::new(),
            }),
            _ => None,
        };

        Ok(TaskSnapshot {
            id: self.id,
            status,
            config: CrawlConfig {
                start_url: self.start_url,
                same_domain: self.same_domain,
                max_depth: self.max_depth,
                max_pages: self.max_pages,
                output_name: self.output_name,
                title_suffix: self.title_suffix,
                debug_only_home: self.debug_only_home,
                sitemap_domain: self.sitemap_domain,
                replace_rules,
            },
            summary,
            submitted_at: self.submitted_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            worker: self.worker,
            error: self.error_message,
            duration: self.duration,
            config_hash: self.config_hash,
        })
    }
}
