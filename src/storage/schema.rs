//! Database schema definitions
//!
//! This module contains the SQL schema of the task history database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per submitted task, rewritten on every lifecycle transition
CREATE TABLE IF NOT EXISTS crawl_task (
    id TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    start_url TEXT NOT NULL,
    same_domain INTEGER NOT NULL,
    max_depth INTEGER NOT NULL,
    max_pages INTEGER NOT NULL,
    debug_only_home INTEGER NOT NULL DEFAULT 0,
    output_name TEXT,
    output_dir TEXT,
    title_suffix TEXT,
    sitemap_domain TEXT,
    replace_rules TEXT NOT NULL DEFAULT '[]',
    pages_downloaded INTEGER,
    assets_downloaded INTEGER,
    elapsed_ms INTEGER,
    errors TEXT NOT NULL DEFAULT '[]',
    submitted_at TEXT NOT NULL,
    started_at TEXT,
    finished_at TEXT,
    duration TEXT NOT NULL,
    worker TEXT,
    error_message TEXT,
    config_hash TEXT
);

CREATE INDEX IF NOT EXISTS idx_crawl_task_submitted ON crawl_task(submitted_at);
CREATE INDEX IF NOT EXISTS idx_crawl_task_status ON crawl_task(status);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        assert!(initialize_schema(&conn).is_ok());
    }

    #[test]
    fn test_table_exists_after_init() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='crawl_task'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}
