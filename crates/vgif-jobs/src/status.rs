//! Client-facing job status projection.

use std::sync::Arc;

use serde::Serialize;

use vgif_models::{JobId, JobRecord, JobStatus};

use crate::error::{JobError, JobResult};
use crate::store::JobStore;

/// Projection of a job record for status polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatusView {
    pub job_id: String,
    pub status: JobStatus,
    /// Failure detail, only when failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Path of the download endpoint, only when finished
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_path: Option<String>,
}

impl From<&JobRecord> for JobStatusView {
    fn from(record: &JobRecord) -> Self {
        Self {
            job_id: record.id.to_string(),
            status: record.status,
            error: match record.status {
                JobStatus::Failed => record.error.clone(),
                _ => None,
            },
            download_path: match record.status {
                JobStatus::Finished => Some(download_path(&record.id)),
                _ => None,
            },
        }
    }
}

/// Path of the GIF download endpoint for a job.
pub fn download_path(id: &JobId) -> String {
    format!("/jobs/{}/gif", id)
}

/// Reads job state for status polling.
#[derive(Clone)]
pub struct StatusReporter {
    store: Arc<JobStore>,
}

impl StatusReporter {
    pub fn new(store: Arc<JobStore>) -> Self {
        Self { store }
    }

    /// Current status of a job, read straight from the store.
    pub async fn report(&self, id: &JobId) -> JobResult<JobStatusView> {
        self.store
            .get(id)
            .await
            .map(|record| JobStatusView::from(&record))
            .ok_or_else(|| JobError::not_found(id))
    }
}
