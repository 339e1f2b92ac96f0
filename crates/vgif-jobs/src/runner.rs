//! Job runner: drives one job from `queued` to a terminal state.

use std::sync::Arc;
use std::time::Instant;

use vgif_media::{remove_file_best_effort, RemovalOutcome, Transcoder};
use vgif_models::{Fps, JobId, JobRecord, JobStatus};

use crate::error::StoreResult;
use crate::logging::JobLogger;
use crate::metrics;
use crate::store::JobStore;

/// Result of one runner invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub job_id: JobId,
    /// Terminal status committed to the store
    pub status: JobStatus,
    /// What happened to the uploaded input
    pub cleanup: RemovalOutcome,
}

/// Executes conversion jobs against the store.
///
/// A runner holds no per-job state; the dispatcher invokes `run` exactly once
/// per job id.
#[derive(Clone)]
pub struct JobRunner {
    store: Arc<JobStore>,
    transcoder: Arc<dyn Transcoder>,
}

impl JobRunner {
    pub fn new(store: Arc<JobStore>, transcoder: Arc<dyn Transcoder>) -> Self {
        Self { store, transcoder }
    }

    /// Run one job to completion.
    ///
    /// Transcoding errors end the job as `failed`; they are not returned.
    /// An error is returned only when the store refuses a transition.
    pub async fn run(&self, id: &JobId, fps: Fps) -> StoreResult<RunReport> {
        let logger = JobLogger::new(id);

        let record = self.store.update(id, JobRecord::start_processing).await?;
        logger.started(&record);

        metrics::job_in_flight(1.0);
        let start = Instant::now();
        let result = self
            .transcoder
            .convert(&record.input_path, &record.output_path, fps)
            .await;
        metrics::job_in_flight(-1.0);
        metrics::record_transcode(result.is_ok(), start.elapsed().as_secs_f64());

        // Drop the upload before committing a terminal status so no reader
        // ever sees a terminal job whose input still exists.
        let cleanup = remove_file_best_effort(&record.input_path).await;
        if let RemovalOutcome::Failed(reason) = &cleanup {
            metrics::record_cleanup_failure();
            logger.input_retained(&record.input_path, reason);
        }

        let finalized = match result {
            Ok(()) => {
                let finalized = self.store.update(id, JobRecord::finish).await?;
                logger.finished(&finalized, start.elapsed());
                finalized
            }
            Err(err) => {
                let detail = err.detail();
                logger.failed(&detail, start.elapsed());
                self.store.update(id, move |job| job.fail(detail)).await?
            }
        };

        Ok(RunReport {
            job_id: finalized.id,
            status: finalized.status,
            cleanup,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tempfile::TempDir;
    use vgif_media::{MediaError, MediaResult};

    use super::*;
    use crate::error::StoreError;

    /// Writes a fixed payload to the output.
    struct WritingTranscoder;

    #[async_trait]
    impl Transcoder for WritingTranscoder {
        async fn convert(&self, _input: &Path, output: &Path, _fps: Fps) -> MediaResult<()> {
            tokio::fs::write(output, b"GIF89a").await?;
            Ok(())
        }
    }

    /// Always fails like a non-zero FFmpeg exit.
    struct FailingTranscoder;

    #[async_trait]
    impl Transcoder for FailingTranscoder {
        async fn convert(&self, _input: &Path, _output: &Path, _fps: Fps) -> MediaResult<()> {
            Err(MediaError::ffmpeg_failed(
                "palette generation: FFmpeg exited with exit status: 1",
                Some("moov atom not found".to_string()),
                Some(1),
            ))
        }
    }

    /// Records the status observed while converting and the fps it was given.
    struct ObservingTranscoder {
        store: Arc<JobStore>,
        id: JobId,
        calls: AtomicUsize,
        seen: std::sync::Mutex<Option<(JobStatus, u32)>>,
    }

    #[async_trait]
    impl Transcoder for ObservingTranscoder {
        async fn convert(&self, _input: &Path, output: &Path, fps: Fps) -> MediaResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let status = self.store.get(&self.id).await.map(|r| r.status);
            *self.seen.lock().unwrap() = status.map(|s| (s, fps.get()));
            tokio::fs::write(output, b"GIF89a").await?;
            Ok(())
        }
    }

    async fn queued_job(dir: &TempDir, store: &JobStore) -> JobRecord {
        let id = JobId::new();
        let input = dir.path().join(format!("{}.mp4", id));
        let output = dir.path().join(format!("{}.gif", id));
        tokio::fs::write(&input, b"video").await.unwrap();

        let record = JobRecord::new(id, input, output, Fps::try_from(16).unwrap());
        store.put(record.clone()).await.unwrap();
        record
    }

    #[tokio::test]
    async fn test_success_finishes_and_removes_input() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JobStore::new());
        let job = queued_job(&dir, &store).await;

        let runner = JobRunner::new(Arc::clone(&store), Arc::new(WritingTranscoder));
        let report = runner.run(&job.id, job.fps).await.unwrap();

        assert_eq!(report.status, JobStatus::Finished);
        assert_eq!(report.cleanup, RemovalOutcome::Removed);
        assert!(!job.input_path.exists());
        assert!(job.output_path.exists());

        let stored = store.get(&job.id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Finished);
        assert!(stored.error.is_none());
    }

    #[tokio::test]
    async fn test_failure_records_error_and_removes_input() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JobStore::new());
        let job = queued_job(&dir, &store).await;

        let runner = JobRunner::new(Arc::clone(&store), Arc::new(FailingTranscoder));
        let report = runner.run(&job.id, job.fps).await.unwrap();

        assert_eq!(report.status, JobStatus::Failed);
        assert!(!job.input_path.exists());
        assert!(!job.output_path.exists());

        let stored = store.get(&job.id).await.unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        let error = stored.error.unwrap();
        assert!(error.contains("palette generation"));
        assert!(error.contains("moov atom not found"));
    }

    #[tokio::test]
    async fn test_missing_input_is_not_a_cleanup_failure() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JobStore::new());
        let job = queued_job(&dir, &store).await;
        tokio::fs::remove_file(&job.input_path).await.unwrap();

        let runner = JobRunner::new(Arc::clone(&store), Arc::new(WritingTranscoder));
        let report = runner.run(&job.id, job.fps).await.unwrap();

        assert_eq!(report.status, JobStatus::Finished);
        assert_eq!(report.cleanup, RemovalOutcome::AlreadyAbsent);
    }

    #[tokio::test]
    async fn test_cleanup_failure_is_reported_not_propagated() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JobStore::new());

        // A directory at the input path cannot be removed with remove_file
        let id = JobId::new();
        let input = dir.path().join("input-dir");
        tokio::fs::create_dir(&input).await.unwrap();
        let record = JobRecord::new(id.clone(), &input, dir.path().join("out.gif"), Fps::default());
        store.put(record).await.unwrap();

        let runner = JobRunner::new(Arc::clone(&store), Arc::new(WritingTranscoder));
        let report = runner.run(&id, Fps::default()).await.unwrap();

        assert_eq!(report.status, JobStatus::Finished);
        assert!(matches!(report.cleanup, RemovalOutcome::Failed(_)));
        assert_eq!(store.get(&id).await.unwrap().status, JobStatus::Finished);
    }

    #[tokio::test]
    async fn test_transcoder_sees_processing_and_fps() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JobStore::new());
        let job = queued_job(&dir, &store).await;

        let transcoder = Arc::new(ObservingTranscoder {
            store: Arc::clone(&store),
            id: job.id.clone(),
            calls: AtomicUsize::new(0),
            seen: std::sync::Mutex::new(None),
        });
        let runner = JobRunner::new(Arc::clone(&store), transcoder.clone());
        runner.run(&job.id, job.fps).await.unwrap();

        assert_eq!(transcoder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            *transcoder.seen.lock().unwrap(),
            Some((JobStatus::Processing, 16))
        );
    }

    #[tokio::test]
    async fn test_terminal_job_is_not_rerun() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JobStore::new());
        let job = queued_job(&dir, &store).await;

        let runner = JobRunner::new(Arc::clone(&store), Arc::new(WritingTranscoder));
        runner.run(&job.id, job.fps).await.unwrap();

        let err = runner.run(&job.id, job.fps).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
        assert_eq!(store.get(&job.id).await.unwrap().status, JobStatus::Finished);
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let store = Arc::new(JobStore::new());
        let runner = JobRunner::new(Arc::clone(&store), Arc::new(WritingTranscoder));
        let id = JobId::new();

        let err = runner.run(&id, Fps::default()).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound(id));
    }
}
