//! Storage module for task history
//!
//! Task history is an optional collaborator of the task manager: every
//! lifecycle transition is offered to a [`TaskStore`], which may persist it.
//! - [`SqliteTaskStore`] keeps one `crawl_task` row per task
//! - [`NullTaskStore`] discards everything

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteTaskStore;
pub use traits::{NullTaskStore, StorageError, StorageResult, TaskStore};

use std::path::Path;
use std::sync::Arc;

/// Opens the configured history store, or a no-op store when none is configured
///
/// # Arguments
///
/// * `path` - Optional path to the SQLite database file
///
/// # Returns
///
/// * `Ok(Arc<dyn TaskStore>)` - The store to hand to the task manager
/// * `Err(StorageError)` - The database could not be opened
pub fn open_task_store(path: Option<&Path>) -> StorageResult<Arc<dyn TaskStore>> {
    match path {
        Some(path) => Ok(Arc::new(SqliteTaskStore::new(path)?)),
        None => Ok(Arc::new(NullTaskStore)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_store_when_unconfigured() {
        let store = open_task_store(None).unwrap();
        assert!(store.recent(10).unwrap().is_empty());
    }
}
