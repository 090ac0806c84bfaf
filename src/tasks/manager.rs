//! Bounded worker pool running mirroring jobs
//!
//! Jobs are handed to a fixed set of OS threads through a bounded channel. Each
//! worker owns a current-thread Tokio runtime and drives one [`CrawlEngine`] at
//! a time; a full channel rejects the submission instead of queuing more work.

use crate::config::{validate_crawl_config, CrawlConfig, HttpConfig, PoolConfig};
use crate::crawler::{CrawlEngine, Fetcher};
use crate::site::SiteAssets;
use crate::state::{JobSummary, TaskStatus};
use crate::storage::TaskStore;
use crate::tasks::task::{Task, TaskSnapshot};
use crate::{ConfigError, MirrorError};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;
use tracing::Instrument;

/// Why a submission was rejected
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Invalid job: {0}")]
    Invalid(#[from] ConfigError),

    #[error("Task queue is full, try again later")]
    Overloaded,

    #[error("Task manager is shut down")]
    ShutDown,
}

struct QueuedJob {
    id: String,
    config: CrawlConfig,
    cancel: Arc<AtomicBool>,
}

/// State shared between the manager handle and its workers
struct Shared {
    tasks: RwLock<HashMap<String, Task>>,
    store: Arc<dyn TaskStore>,
    output_base: PathBuf,
    http: HttpConfig,
    site_assets: SiteAssets,
    config_hash: Option<String>,
}

impl Shared {
    /// Applies `change` to a task and offers the result to the history store
    ///
    /// Recording happens under the registry lock so the store sees
    /// transitions in the order they were applied.
    fn update(&self, id: &str, change: impl FnOnce(&mut Task) -> bool) -> bool {
        let mut tasks = self.tasks.write();
        match tasks.get_mut(id) {
            Some(task) => {
                if !change(task) {
                    return false;
                }
                self.record(&task.snapshot());
                true
            }
            None => false,
        }
    }

    fn record(&self, snapshot: &TaskSnapshot) {
        if let Err(e) = self.store.record(snapshot) {
            tracing::warn!(task_id = %snapshot.id, "failed to record task history: {}", e);
        }
    }

    fn run_job(&self, runtime: &tokio::runtime::Runtime, worker: &str, job: QueuedJob) {
        if !self.update(&job.id, |task| task.start(worker)) {
            tracing::debug!(task_id = %job.id, "task no longer queued, skipping");
            return;
        }

        let span = tracing::info_span!("job", task_id = %job.id, worker = %worker);
        let engine = match Fetcher::new(&self.http) {
            Ok(fetcher) => CrawlEngine::new(job.config, &self.output_base, fetcher, self.site_assets.clone())
                .with_cancel_flag(job.cancel),
            Err(e) => {
                self.finish(&job.id, Err(e));
                return;
            }
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| runtime.block_on(engine.run().instrument(span))));
        match outcome {
            Ok(result) => self.finish(&job.id, result),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(task_id = %job.id, "job panicked: {}", message);
                self.update(&job.id, |task| {
                    task.finish(TaskStatus::Failed, None, Some(message))
                });
            }
        }
    }

    fn finish(&self, id: &str, result: Result<JobSummary, MirrorError>) {
        let (status, summary, error) = match result {
            Ok(summary) => (TaskStatus::Succeeded, Some(summary), None),
            Err(MirrorError::Cancelled) => (TaskStatus::Cancelled, None, None),
            Err(e) => {
                let message = e.to_string();
                tracing::error!(task_id = %id, "job failed: {}", message);
                let summary = JobSummary::setup_failure(self.output_base.clone(), message.clone());
                (TaskStatus::Failed, Some(summary), Some(message))
            }
        };

        if !self.update(id, |task| task.finish(status, summary, error)) {
            tracing::debug!(task_id = %id, "task already terminal, result dropped");
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "job panicked".to_string()
    }
}

/// Runs submitted jobs on a bounded pool of worker threads
///
/// Tasks live in memory for the lifetime of the manager; the optional
/// [`TaskStore`] only observes their transitions.
pub struct TaskManager {
    shared: Arc<Shared>,
    sender: Mutex<Option<Sender<QueuedJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskManager {
    /// Starts the worker threads
    ///
    /// # Arguments
    ///
    /// * `pool` - Worker count and submission queue capacity
    /// * `output_base` - Base directory for every job's output tree
    /// * `http` - HTTP settings used to build each job's fetcher
    /// * `site_assets` - Protected files written into every host directory
    /// * `store` - History store receiving task transitions
    pub fn start(
        pool: &PoolConfig,
        output_base: impl Into<PathBuf>,
        http: HttpConfig,
        site_assets: SiteAssets,
        store: Arc<dyn TaskStore>,
    ) -> Result<Self, MirrorError> {
        Self::start_with_hash(pool, output_base, http, site_assets, store, None)
    }

    /// Like [`TaskManager::start`], tagging every task with the config file hash
    pub fn start_with_hash(
        pool: &PoolConfig,
        output_base: impl Into<PathBuf>,
        http: HttpConfig,
        site_assets: SiteAssets,
        store: Arc<dyn TaskStore>,
        config_hash: Option<String>,
    ) -> Result<Self, MirrorError> {
        let shared = Arc::new(Shared {
            tasks: RwLock::new(HashMap::new()),
            store,
            output_base: output_base.into(),
            http,
            site_assets,
            config_hash,
        });

        let (sender, receiver) = crossbeam_channel::bounded(pool.queue_capacity.max(1));
        let worker_count = pool.effective_workers();
        let mut workers = Vec::with_capacity(worker_count);

        for n in 1..=worker_count {
            let name = format!("site-mirror-worker-{}", n);
            let receiver = receiver.clone();
            let shared = Arc::clone(&shared);
            let handle = std::thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_loop(name, receiver, shared))?;
            workers.push(handle);
        }

        tracing::info!(
            workers = worker_count,
            queue_capacity = pool.queue_capacity,
            "task manager started"
        );

        Ok(Self {
            shared,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        })
    }

    /// Validates and queues a job, returning its task id
    pub fn submit(&self, config: CrawlConfig) -> Result<String, SubmitError> {
        validate_crawl_config(&config)?;

        let guard = self.sender.lock();
        let sender = guard.as_ref().ok_or(SubmitError::ShutDown)?;

        let task = Task::new(config.clone(), self.shared.config_hash.clone());
        let id = task.id.clone();
        let job = QueuedJob {
            id: id.clone(),
            config,
            cancel: task.cancel_flag(),
        };

        // workers look the task up under this lock, so it is registered and
        // recorded as QUEUED before any transition can be observed
        let mut tasks = self.shared.tasks.write();
        match sender.try_send(job) {
            Ok(()) => {
                let snapshot = task.snapshot();
                tasks.insert(id.clone(), task);
                self.shared.record(&snapshot);
                tracing::info!(task_id = %id, url = %snapshot.config.start_url, "task queued");
                Ok(id)
            }
            Err(TrySendError::Full(job)) => {
                tracing::warn!(url = %job.config.start_url, "task queue full, rejecting job");
                Err(SubmitError::Overloaded)
            }
            Err(TrySendError::Disconnected(_)) => Err(SubmitError::ShutDown),
        }
    }

    /// Requests cancellation of a queued or running task
    ///
    /// The task is marked CANCELLED at once; a running job stops at its next
    /// page boundary. Returns false for unknown or already finished tasks.
    pub fn cancel(&self, id: &str) -> bool {
        let cancelled = self.shared.update(id, Task::cancel);
        if cancelled {
            tracing::info!(task_id = %id, "task cancelled");
        }
        cancelled
    }

    /// Cancels every task that has not finished yet
    pub fn cancel_all(&self) -> usize {
        let ids: Vec<String> = self.shared.tasks.read().keys().cloned().collect();
        ids.iter().filter(|id| self.cancel(id)).count()
    }

    pub fn get(&self, id: &str) -> Option<TaskSnapshot> {
        self.shared.tasks.read().get(id).map(Task::snapshot)
    }

    /// All tasks, oldest submission first
    pub fn list(&self) -> Vec<TaskSnapshot> {
        let mut snapshots: Vec<TaskSnapshot> = self.shared.tasks.read().values().map(Task::snapshot).collect();
        snapshots.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then_with(|| a.id.cmp(&b.id)));
        snapshots
    }

    /// Stops accepting jobs, lets queued jobs drain and joins the workers
    pub fn shutdown(&self) {
        self.sender.lock().take();
        let workers: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        for handle in workers {
            if handle.join().is_err() {
                tracing::error!("worker thread panicked");
            }
        }
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(name: String, receiver: Receiver<QueuedJob>, shared: Arc<Shared>) {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(worker = %name, "cannot start runtime: {}", e);
            for job in receiver.iter() {
                let message = format!("worker runtime unavailable: {}", e);
                shared.update(&job.id, |task| task.finish(TaskStatus::Failed, None, Some(message)));
            }
            return;
        }
    };

    tracing::debug!(worker = %name, "worker started");
    for job in receiver.iter() {
        shared.run_job(&runtime, &name, job);
    }
    tracing::debug!(worker = %name, "worker stopped");
}
