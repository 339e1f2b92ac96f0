//! Filesystem helpers for transient artifacts.

use std::fmt;
use std::io::ErrorKind;
use std::path::Path;

use tokio::fs;

/// What happened when removing a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalOutcome {
    /// The file existed and was deleted
    Removed,
    /// Nothing was there to delete
    AlreadyAbsent,
    /// Deletion failed with the given reason
    Failed(String),
}

impl RemovalOutcome {
    /// Whether the file is gone after the attempt.
    pub fn is_gone(&self) -> bool {
        !matches!(self, RemovalOutcome::Failed(_))
    }
}

impl fmt::Display for RemovalOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalOutcome::Removed => write!(f, "removed"),
            RemovalOutcome::AlreadyAbsent => write!(f, "already absent"),
            RemovalOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Remove a file, never failing.
///
/// A missing file counts as success. Any other error is logged at `warn` and
/// reported in the returned outcome instead of being propagated.
pub async fn remove_file_best_effort(path: impl AsRef<Path>) -> RemovalOutcome {
    let path = path.as_ref();

    match fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!("Removed {}", path.display());
            RemovalOutcome::Removed
        }
        Err(e) if e.kind() == ErrorKind::NotFound => RemovalOutcome::AlreadyAbsent,
        Err(e) => {
            tracing::warn!("Failed to remove {}: {}", path.display(), e);
            RemovalOutcome::Failed(e.to_string())
        }
    }
}
