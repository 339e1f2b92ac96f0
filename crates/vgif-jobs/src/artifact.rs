//! Result fetcher: resolves the produced GIF for a finished job.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs;
use tracing::warn;

use vgif_models::{JobId, JobStatus};

use crate::error::{JobError, JobResult};
use crate::store::JobStore;

/// Checks job state before the GIF is streamed to a client.
#[derive(Clone)]
pub struct ResultFetcher {
    store: Arc<JobStore>,
}

impl ResultFetcher {
    pub fn new(store: Arc<JobStore>) -> Self {
        Self { store }
    }

    /// Output path of a finished job whose file is present.
    ///
    /// A finished job whose file disappeared out of band is reported as
    /// [`JobError::ArtifactMissing`] rather than a raw IO error.
    pub async fn artifact(&self, id: &JobId) -> JobResult<PathBuf> {
        let record = self
            .store
            .get(id)
            .await
            .ok_or_else(|| JobError::not_found(id))?;

        if record.status != JobStatus::Finished {
            return Err(JobError::NotFinished {
                id: id.clone(),
                status: record.status,
            });
        }

        match fs::metadata(&record.output_path).await {
            Ok(meta) if meta.is_file() => Ok(record.output_path),
            _ => {
                warn!(
                    job_id = %id,
                    output = %record.output_path.display(),
                    "Finished job has no output file"
                );
                Err(JobError::ArtifactMissing(id.clone()))
            }
        }
    }
}
