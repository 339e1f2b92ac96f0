//! In-memory job store.
//!
//! The store is the single source of truth for job state. Every read and
//! write goes through one mapping-wide lock, so a status transition committed
//! by a runner is visible to the next reader and never observed half-applied.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use vgif_models::{JobId, JobRecord};

use crate::error::{StoreError, StoreResult};

/// Concurrency-safe mapping from job id to job record.
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: Mutex<HashMap<JobId, JobRecord>>,
}

impl JobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new record keyed by its id.
    pub async fn put(&self, record: JobRecord) -> StoreResult<()> {
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(&record.id) {
            return Err(StoreError::DuplicateId(record.id));
        }
        debug!(job_id = %record.id, status = %record.status, "Job inserted");
        jobs.insert(record.id.clone(), record);
        Ok(())
    }

    /// Snapshot of a record, if present.
    pub async fn get(&self, id: &JobId) -> Option<JobRecord> {
        self.jobs.lock().await.get(id).cloned()
    }

    /// Atomic read-modify-write of one record.
    ///
    /// The mutator sees the current record and returns the next one. The
    /// result is rejected, leaving the stored record untouched, if it changes
    /// the id or is not a legal status transition.
    pub async fn update<F>(&self, id: &JobId, mutator: F) -> StoreResult<JobRecord>
    where
        F: FnOnce(&JobRecord) -> JobRecord,
    {
        let mut jobs = self.jobs.lock().await;
        let current = jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let next = mutator(current);

        if next.id != current.id {
            return Err(StoreError::IdMismatch(id.clone()));
        }
        if !current.status.can_transition_to(next.status) {
            return Err(StoreError::InvalidTransition {
                id: id.clone(),
                from: current.status,
                to: next.status,
            });
        }

        debug!(job_id = %id, from = %current.status, to = %next.status, "Job updated");
        *current = next.clone();
        Ok(next)
    }

    /// Number of tracked jobs.
    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    /// Whether no jobs are tracked.
    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }

    /// Remove and return terminal jobs last updated before `cutoff`.
    pub async fn evict_terminal(&self, cutoff: DateTime<Utc>) -> Vec<JobRecord> {
        let mut jobs = self.jobs.lock().await;
        let expired: Vec<JobId> = jobs
            .values()
            .filter(|job| job.is_terminal() && job.updated_at < cutoff)
            .map(|job| job.id.clone())
            .collect();

        expired
            .iter()
            .filter_map(|id| jobs.remove(id))
            .collect()
    }
}
