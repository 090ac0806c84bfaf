//! Task management for mirroring jobs
//!
//! Submitted jobs become [`Task`]s that move QUEUED → RUNNING → one of
//! SUCCEEDED, FAILED or CANCELLED. The [`TaskManager`] runs them on a bounded
//! worker pool and rejects submissions once its queue is full.

mod manager;
mod task;

pub use manager::{SubmitError, TaskManager};
pub use task::{Task, TaskSnapshot};
