//! State module for tracking mirroring progress
//!
//! # Components
//!
//! - `DedupStore`: per-job claim registry for assets and scanned scripts
//! - `JobContext`: mutable scratch state threaded through one job's pipeline
//! - `JobSummary`: immutable report handed back to callers when a job ends
//! - `TaskStatus`: lifecycle of a submitted job

mod dedup;
mod job_context;
mod summary;
mod task_status;

// Re-export main types
pub use dedup::DedupStore;
pub use job_context::JobContext;
pub use summary::{format_duration, JobSummary};
pub use task_status::TaskStatus;
