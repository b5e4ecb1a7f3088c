//! Job and lock bookkeeping.
//!
//! [`JobService`] is the narrow contract the orchestrator needs: named locks
//! that fail fast when held, and job records moving through their statuses.
//! [`InMemoryJobService`] implements it for a single process and for tests;
//! deployments with several instances back it with a shared store.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use sift_core::{Error, Result};
use tokio::sync::Mutex;

use crate::job::{IndexJob, JobId, JobKind, JobStatus};

/// Locks and job records.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Take the named lock; fails with [`Error::Conflict`] if it is held.
    async fn acquire_lock(&self, resource: &str) -> Result<()>;

    /// Release the named lock.
    async fn release_lock(&self, resource: &str) -> Result<()>;

    /// Record a new job in `Created` status.
    async fn create_job(&self, kind: JobKind, resource: &str) -> Result<IndexJob>;

    /// Move a job to `Running`.
    async fn set_running(&self, id: JobId) -> Result<()>;

    /// Move a job to `Done`.
    async fn set_done(&self, id: JobId) -> Result<()>;

    /// Move a job to `Error` with a message.
    async fn set_error(&self, id: JobId, message: &str) -> Result<()>;

    /// Look up a job.
    async fn get_job(&self, id: JobId) -> Result<IndexJob>;
}

#[derive(Debug, Default)]
struct JobState {
    locks: BTreeSet<String>,
    releases: HashMap<String, usize>,
    jobs: HashMap<JobId, IndexJob>,
}

impl JobState {
    fn transition(&mut self, id: JobId, next: JobStatus, error: Option<&str>) -> Result<()> {
        let job = self
            .jobs
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("job {id}")))?;
        if !job.status.can_transition_to(next) {
            return Err(Error::invalid_argument(format!(
                "job {id} cannot move from {} to {next}",
                job.status
            )));
        }
        job.status = next;
        if let Some(message) = error {
            job.error = Some(message.to_string());
        }
        if next.is_terminal() {
            job.finished_at = Some(Utc::now());
        }
        tracing::info!(job_id = %id, kind = %job.kind, status = %next, "job status changed");
        Ok(())
    }
}

/// Process-local job service.
#[derive(Debug, Default)]
pub struct InMemoryJobService {
    state: Mutex<JobState>,
}

impl InMemoryJobService {
    /// Create an empty service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the named lock is held.
    pub async fn is_locked(&self, resource: &str) -> bool {
        self.state.lock().await.locks.contains(resource)
    }

    /// How many times the named lock was released.
    pub async fn release_count(&self, resource: &str) -> usize {
        self.state
            .lock()
            .await
            .releases
            .get(resource)
            .copied()
            .unwrap_or(0)
    }

    /// All recorded jobs, oldest first.
    pub async fn jobs(&self) -> Vec<IndexJob> {
        let mut jobs: Vec<_> = self.state.lock().await.jobs.values().cloned().collect();
        jobs.sort_by_key(|j| j.created_at);
        jobs
    }
}

#[async_trait]
impl JobService for InMemoryJobService {
    async fn acquire_lock(&self, resource: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.locks.insert(resource.to_string()) {
            tracing::info!(resource, "lock is held by another job");
            return Err(Error::conflict(resource));
        }
        tracing::debug!(resource, "lock acquired");
        Ok(())
    }

    async fn release_lock(&self, resource: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.locks.remove(resource) {
            return Err(Error::invalid_argument(format!(
                "lock '{resource}' is not held"
            )));
        }
        *state.releases.entry(resource.to_string()).or_default() += 1;
        tracing::debug!(resource, "lock released");
        Ok(())
    }

    async fn create_job(&self, kind: JobKind, resource: &str) -> Result<IndexJob> {
        let job = IndexJob::new(kind, resource);
        tracing::info!(job_id = %job.id, %kind, "job created");
        self.state.lock().await.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn set_running(&self, id: JobId) -> Result<()> {
        self.state
            .lock()
            .await
            .transition(id, JobStatus::Running, None)
    }

    async fn set_done(&self, id: JobId) -> Result<()> {
        self.state.lock().await.transition(id, JobStatus::Done, None)
    }

    async fn set_error(&self, id: JobId, message: &str) -> Result<()> {
        self.state
            .lock()
            .await
            .transition(id, JobStatus::Error, Some(message))
    }

    async fn get_job(&self, id: JobId) -> Result<IndexJob> {
        self.state
            .lock()
            .await
            .jobs
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("job {id}")))
    }
}

// ============================================================================
// Tests
// ============================================================================
