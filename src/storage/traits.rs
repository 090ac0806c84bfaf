//! Storage traits and error types
//!
//! This module defines the trait interface for task history backends and
//! associated error types.

use crate::tasks::TaskSnapshot;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Receiver of task lifecycle transitions
///
/// The task manager calls [`TaskStore::record`] on every transition and logs
/// failures without acting on them; a store never gates task execution.
pub trait TaskStore: Send + Sync {
    /// Inserts or replaces the row for this task
    fn record(&self, task: &TaskSnapshot) -> StorageResult<()>;

    /// Returns up to `limit` tasks, most recently submitted first
    fn recent(&self, limit: usize) -> StorageResult<Vec<TaskSnapshot>>;
}

/// Store used when no history database is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTaskStore;

impl TaskStore for NullTaskStore {
    fn record(&self, _task: &TaskSnapshot) -> StorageResult<()> {
        Ok(())
    }

    fn recent(&self, _limit: usize) -> StorageResult<Vec<TaskSnapshot>> {
        Ok(Vec::new())
    }
}
