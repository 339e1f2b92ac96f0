//! Lifecycle events for conversion jobs.
//!
//! Each event names its job by a `job_id` field, and the paths, frame rate
//! and timings it concerns as further fields, so log pipelines can filter on
//! them without parsing the message.

use std::path::Path;
use std::time::Duration;

use tracing::{error, info, info_span, warn, Span};
use vgif_models::{Fps, JobId, JobRecord};

/// Operation name recorded on job spans.
pub const OPERATION: &str = "gif_conversion";

/// Emits the lifecycle events of one conversion job.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: JobId,
}

impl JobLogger {
    pub fn new(job_id: &JobId) -> Self {
        Self {
            job_id: job_id.clone(),
        }
    }

    /// Span the job's background task runs in.
    pub fn span(&self, fps: Fps) -> Span {
        info_span!(
            "job",
            job_id = %self.job_id,
            operation = OPERATION,
            fps = %fps
        )
    }

    /// The record has moved to `processing`.
    pub fn started(&self, record: &JobRecord) {
        info!(
            job_id = %self.job_id,
            input = %record.input_path.display(),
            output = %record.output_path.display(),
            fps = %record.fps,
            "Conversion started"
        );
    }

    /// The upload outlived its job.
    pub fn input_retained(&self, input: &Path, reason: &str) {
        warn!(
            job_id = %self.job_id,
            input = %input.display(),
            reason = %reason,
            "Could not delete job input"
        );
    }

    pub fn finished(&self, record: &JobRecord, elapsed: Duration) {
        info!(
            job_id = %self.job_id,
            output = %record.output_path.display(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Conversion finished"
        );
    }

    pub fn failed(&self, detail: &str, elapsed: Duration) {
        error!(
            job_id = %self.job_id,
            error = %detail,
            elapsed_ms = elapsed.as_millis() as u64,
            "Conversion failed"
        );
    }
}
