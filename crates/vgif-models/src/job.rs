//! Job identifiers, status and the job record.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Fps;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Conversion job status.
///
/// ```text
/// queued -> processing -> finished
///                     \-> failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is accepted and waiting for its runner
    #[default]
    Queued,
    /// Transcoding is in progress
    Processing,
    /// GIF is available for download
    Finished,
    /// Transcoding failed
    Failed,
}

impl JobStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Finished => "finished",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Failed)
    }

    /// Whether moving from `self` to `next` is a legal step.
    ///
    /// Staying in the same status is allowed so that mutators which only
    /// touch timestamps are accepted.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Queued, Queued)
                | (Queued, Processing)
                | (Processing, Processing)
                | (Processing, Finished)
                | (Processing, Failed)
                | (Finished, Finished)
                | (Failed, Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single conversion job as held by the job store.
///
/// Transitions return a new record instead of mutating in place so that the
/// store can compare the previous and next state before committing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique job identifier
    pub id: JobId,
    /// Current status
    pub status: JobStatus,
    /// Uploaded source video, removed once the runner terminates
    pub input_path: PathBuf,
    /// Produced GIF, present on disk only when finished
    pub output_path: PathBuf,
    /// Failure detail, set only when failed
    pub error: Option<String>,
    /// Requested sampling rate
    pub fps: Fps,
    /// When the job was accepted
    pub created_at: DateTime<Utc>,
    /// When the status last changed
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Create a new queued job record.
    pub fn new(
        id: JobId,
        input_path: impl AsRef<Path>,
        output_path: impl AsRef<Path>,
        fps: Fps,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Queued,
            input_path: input_path.as_ref().to_path_buf(),
            output_path: output_path.as_ref().to_path_buf(),
            error: None,
            fps,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Next record with status `processing`.
    pub fn start_processing(&self) -> Self {
        self.with_status(JobStatus::Processing, None)
    }

    /// Next record with status `finished`.
    pub fn finish(&self) -> Self {
        self.with_status(JobStatus::Finished, None)
    }

    /// Next record with status `failed` and the given detail.
    pub fn fail(&self, error: impl Into<String>) -> Self {
        self.with_status(JobStatus::Failed, Some(error.into()))
    }

    fn with_status(&self, status: JobStatus, error: Option<String>) -> Self {
        Self {
            status,
            error,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }
}
