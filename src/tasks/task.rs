//! Task records and their serializable snapshots

use crate::config::CrawlConfig;
use crate::state::{format_duration, JobSummary, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// A submitted job as tracked by the [`TaskManager`](super::TaskManager)
#[derive(Debug)]
pub struct Task {
    pub id: String,
    pub status: TaskStatus,
    pub config: CrawlConfig,
    pub summary: Option<JobSummary>,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub worker: Option<String>,
    pub error: Option<String>,
    pub config_hash: Option<String>,
    cancel: Arc<AtomicBool>,
}

impl Task {
    /// Creates a QUEUED task with a fresh UUID v4 id
    pub fn new(config: CrawlConfig, config_hash: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            status: TaskStatus::Queued,
            config,
            summary: None,
            submitted_at: Utc::now(),
            started_at: None,
            finished_at: None,
            worker: None,
            error: None,
            config_hash,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag the engine polls between pages
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// QUEUED → RUNNING; returns false if the task is no longer queued
    pub fn start(&mut self, worker: &str) -> bool {
        if self.status != TaskStatus::Queued {
            return false;
        }
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
        self.worker = Some(worker.to_string());
        true
    }

    /// Moves the task into a terminal state
    ///
    /// Terminal tasks are never changed again; returns false in that case.
    pub fn finish(&mut self, status: TaskStatus, summary: Option<JobSummary>, error: Option<String>) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.summary = summary;
        self.error = error;
        self.finished_at = Some(Utc::now());
        true
    }

    /// Requests cancellation and marks the task CANCELLED
    pub fn cancel(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.cancel.store(true, Ordering::SeqCst);
        self.finish(TaskStatus::Cancelled, None, None)
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        let duration = match self.started_at {
            Some(started) => {
                let end = self.finished_at.unwrap_or_else(Utc::now);
                (end - started).to_std().unwrap_or_default()
            }
            None => std::time::Duration::ZERO,
        };

        TaskSnapshot {
            id: self.id.clone(),
            status: self.status,
            config: self.config.clone(),
            summary: self.summary.clone(),
            submitted_at: self.submitted_at.to_rfc3339(),
            started_at: self.started_at.map(|t| t.to_rfc3339()),
            finished_at: self.finished_at.map(|t| t.to_rfc3339()),
            worker: self.worker.clone(),
            error: self.error.clone(),
            duration: format_duration(duration),
            config_hash: self.config_hash.clone(),
        }
    }
}

/// Read-only view of a task, as exposed to callers and the history store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub id: String,
    pub status: TaskStatus,
    pub config: CrawlConfig,
    pub summary: Option<JobSummary>,
    pub submitted_at: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub worker: Option<String>,
    pub error: Option<String>,
    /// `"{m}m {s}s"`; running tasks measure against now
    pub duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> Task {
        Task::new(CrawlConfig::new("https://example.com/"), None)
    }

    #[test]
    fn test_ids_are_uuids() {
        let a = task();
        let b = task();
        assert_ne!(a.id, b.id);
        assert!(Uuid::parse_str(&a.id).is_ok());
    }

    #[test]
    fn test_lifecycle() {
        let mut t = task();
        assert_eq!(t.snapshot().duration, "0m 0s");
        assert!(t.start("site-mirror-worker-1"));
        assert!(!t.start("site-mirror-worker-2"));
        assert!(t.finish(TaskStatus::Succeeded, None, None));

        let snap = t.snapshot();
        assert_eq!(snap.status, TaskStatus::Succeeded);
        assert_eq!(snap.worker.as_deref(), Some("site-mirror-worker-1"));
        assert!(snap.finished_at.is_some());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut t = task();
        assert!(t.cancel());
        assert!(t.cancel_flag().load(Ordering::SeqCst));
        assert!(!t.finish(TaskStatus::Succeeded, None, None));
        assert!(!t.cancel());
        assert!(!t.start("w"));
        assert_eq!(t.status, TaskStatus::Cancelled);
    }

    #[test]
    fn test_finish_requires_terminal_status() {
        let mut t = task();
        assert!(!t.finish(TaskStatus::Running, None, None));
        assert_eq!(t.status, TaskStatus::Queued);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let json = serde_json::to_string(&task().snapshot()).unwrap();
        assert!(json.contains("\"status\":\"QUEUED\""));
        assert!(json.contains("\"startUrl\":\"https://example.com/\""));
        assert!(!json.contains("configHash"));
    }
}
