//! Job lifecycle error types.

use thiserror::Error;

use vgif_models::{InvalidFps, JobId, JobStatus};

pub type StoreResult<T> = Result<T, StoreError>;

pub type JobResult<T> = Result<T, JobError>;

/// Errors raised by the job store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Job {0} already exists")]
    DuplicateId(JobId),

    #[error("Job {0} not found")]
    NotFound(JobId),

    #[error("Job {id}: illegal transition {from} -> {to}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Job {0}: update attempted to change the job id")]
    IdMismatch(JobId),
}

/// Errors surfaced by the dispatcher, status reporter and result fetcher.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    InvalidFps(#[from] InvalidFps),

    #[error("Job not found")]
    NotFound(JobId),

    #[error("Job not finished")]
    NotFinished { id: JobId, status: JobStatus },

    #[error("Job artifact missing")]
    ArtifactMissing(JobId),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for JobError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => JobError::NotFound(id),
            other => JobError::Store(other),
        }
    }
}

impl JobError {
    pub fn not_found(id: &JobId) -> Self {
        Self::NotFound(id.clone())
    }
}
