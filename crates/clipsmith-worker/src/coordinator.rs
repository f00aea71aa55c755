//! The job coordinator.
//!
//! Single process-wide component owning the job table and the admission
//! queue, both behind one mutex. Worker tasks each drive one job at a time
//! through the processor, with a cooldown between jobs. The status-query
//! path copies a snapshot under the per-job lock and never blocks on a
//! worker.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use clipsmith_media::ArtifactStore;
use clipsmith_models::{ConfigSnapshot, JobId, JobSnapshot, JobStatus, ProcessOptions, SourceVideo};

use crate::error::WorkerResult;
use crate::job::JobEntry;

/// Coordinator admission and lifecycle errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("coordinator busy: queue is full")]
    Busy,

    #[error("job not found")]
    NotFound,

    #[error("job is {0}; operation conflicts with its state")]
    Conflict(&'static str),
}

/// What a processor hands back on success.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub clips: Vec<clipsmith_models::Clip>,
    /// Set when the job completed below the floor or dropped clips
    pub warning: Option<String>,
}

/// The pipeline seam. The production implementation lives in
/// [`crate::pipeline::Pipeline`]; tests drive the coordinator with stubs.
#[async_trait]
pub trait JobProcessor: Send + Sync {
    async fn process(&self, job: Arc<JobEntry>, store: ArtifactStore) -> WorkerResult<ProcessOutcome>;
}

/// Coordinator configuration.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Process-wide worker count; also the queue capacity
    pub concurrency: usize,
    /// Pause between jobs taken by the same worker
    pub cooldown: Duration,
}

impl CoordinatorConfig {
    pub fn from_env(default_concurrency: usize) -> Self {
        Self {
            concurrency: std::env::var("PROCESSING_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default_concurrency)
                .max(1),
            cooldown: Duration::from_secs_f64(
                std::env::var("PROCESSING_COOLDOWN")
                    .ok()
                    .and_then(|s| s.trim_end_matches('s').parse().ok())
                    .unwrap_or(1.0),
            ),
        }
    }
}

struct JobTable {
    jobs: HashMap<JobId, Arc<JobEntry>>,
    queue: VecDeque<JobId>,
    running: usize,
}

struct Inner {
    table: Mutex<JobTable>,
    wakeup: Notify,
    config: CoordinatorConfig,
    store: ArtifactStore,
    processor: Arc<dyn JobProcessor>,
}

/// Handle to the process-wide coordinator. Cheap to clone.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl Coordinator {
    pub fn new(
        config: CoordinatorConfig,
        store: ArtifactStore,
        processor: Arc<dyn JobProcessor>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                table: Mutex::new(JobTable {
                    jobs: HashMap::new(),
                    queue: VecDeque::new(),
                    running: 0,
                }),
                wakeup: Notify::new(),
                config,
                store,
                processor,
            }),
        }
    }

    /// Spawn the worker tasks. Call once after construction.
    pub fn start(&self) {
        for worker in 0..self.inner.config.concurrency {
            let inner = self.inner.clone();
            tokio::spawn(async move {
                worker_loop(inner, worker).await;
            });
        }
        info!(
            workers = self.inner.config.concurrency,
            "Coordinator started"
        );
    }

    /// Admit a job. Rejects with `Busy` when every worker is occupied and
    /// the queue (capacity = concurrency) is full.
    pub fn enqueue(
        &self,
        source: SourceVideo,
        options: ProcessOptions,
    ) -> Result<JobId, CoordinatorError> {
        let config = ConfigSnapshot::from_env(options, clipsmith_engine::hardware::profile().clone());

        let mut table = self.inner.table.lock().unwrap();
        if table.running >= self.inner.config.concurrency
            && table.queue.len() >= self.inner.config.concurrency
        {
            warn!("Admission rejected: workers and queue are full");
            return Err(CoordinatorError::Busy);
        }

        let job_id = JobId::new();
        let entry = Arc::new(JobEntry::new(job_id.clone(), source, config));
        table.jobs.insert(job_id.clone(), entry);
        table.queue.push_back(job_id.clone());
        drop(table);

        self.inner.wakeup.notify_one();
        info!(job_id = %job_id, "Job enqueued");
        Ok(job_id)
    }

    /// Deep-copied snapshot of a job's public fields.
    pub fn status(&self, job_id: &JobId) -> Result<JobSnapshot, CoordinatorError> {
        let entry = self.entry(job_id)?;
        Ok(entry.snapshot())
    }

    /// Cooperative cancel: a queued job fails immediately, a running job
    /// has its flag set and observes it at the next stage boundary.
    pub fn cancel(&self, job_id: &JobId) -> Result<(), CoordinatorError> {
        let entry = {
            let mut table = self.inner.table.lock().unwrap();
            let entry = table
                .jobs
                .get(job_id)
                .cloned()
                .ok_or(CoordinatorError::NotFound)?;
            // A queued job leaves the queue under the table lock so no
            // worker can pick it up concurrently
            if entry.status() == JobStatus::Queued {
                table.queue.retain(|id| id != job_id);
            }
            entry
        };

        match entry.status() {
            JobStatus::Queued => {
                entry.mark_error(clipsmith_models::ErrorKind::Cancelled, "cancelled while queued");
                Ok(())
            }
            JobStatus::Running => {
                entry.request_cancel();
                Ok(())
            }
            JobStatus::Completed | JobStatus::Error => Err(CoordinatorError::Conflict("finished")),
        }
    }

    /// Remove artifacts and the job record. Rejects while running.
    pub async fn cleanup(&self, job_id: &JobId) -> Result<(), CoordinatorError> {
        {
            let mut table = self.inner.table.lock().unwrap();
            let entry = table
                .jobs
                .get(job_id)
                .cloned()
                .ok_or(CoordinatorError::NotFound)?;
            if entry.status() == JobStatus::Running {
                return Err(CoordinatorError::Conflict("running"));
            }
            table.queue.retain(|id| id != job_id);
            table.jobs.remove(job_id);
        }

        // Artifact removal is idempotent; a missing directory is fine
        self.inner.store.cleanup_job(job_id).await.ok();
        info!(job_id = %job_id, "Job cleaned up");
        Ok(())
    }

    /// Whether a job exists (in any state).
    pub fn exists(&self, job_id: &JobId) -> bool {
        self.inner.table.lock().unwrap().jobs.contains_key(job_id)
    }

    fn entry(&self, job_id: &JobId) -> Result<Arc<JobEntry>, CoordinatorError> {
        self.inner
            .table
            .lock()
            .unwrap()
            .jobs
            .get(job_id)
            .cloned()
            .ok_or(CoordinatorError::NotFound)
    }
}

async fn worker_loop(inner: Arc<Inner>, worker: usize) {
    loop {
        let entry = {
            let mut table = inner.table.lock().unwrap();
            // Skip ids whose record was cleaned up while queued
            loop {
                match table.queue.pop_front() {
                    Some(job_id) => {
                        if let Some(entry) = table.jobs.get(&job_id).cloned() {
                            table.running += 1;
                            break Some(entry);
                        }
                    }
                    None => break None,
                }
            }
        };

        let Some(entry) = entry else {
            inner.wakeup.notified().await;
            continue;
        };

        // Cancelled while queued but not yet removed
        if entry.status().is_terminal() {
            let mut table = inner.table.lock().unwrap();
            table.running -= 1;
            continue;
        }

        entry.mark_running();
        info!(job_id = %entry.id, worker, "Job started");

        let result = inner
            .processor
            .process(entry.clone(), inner.store.clone())
            .await;

        match result {
            Ok(outcome) => {
                info!(
                    job_id = %entry.id,
                    clips = outcome.clips.len(),
                    "Job completed"
                );
                entry.mark_completed(outcome.clips, outcome.warning);
            }
            Err(err) => {
                let kind = err.kind();
                error!(job_id = %entry.id, kind = %kind, error = %err, "Job failed");
                entry.mark_error(kind, err.to_string());
            }
        }

        {
            let mut table = inner.table.lock().unwrap();
            table.running -= 1;
        }

        tokio::time::sleep(inner.config.cooldown).await;
    }
}
