//! Dispatcher: registers jobs and launches their runners.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, Instrument};

use vgif_media::{remove_file_best_effort, RemovalOutcome};
use vgif_models::{Fps, JobId, JobRecord};

use crate::error::{JobError, JobResult};
use crate::layout::StorageLayout;
use crate::logging::JobLogger;
use crate::metrics;
use crate::runner::{JobRunner, RunReport};
use crate::store::JobStore;

/// An upload destination reserved for a job that is not registered yet.
#[derive(Debug)]
pub struct PendingUpload {
    id: JobId,
    input_path: PathBuf,
    output_path: PathBuf,
}

impl PendingUpload {
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// Where the HTTP layer must write the uploaded bytes.
    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Abandon the upload, deleting anything written so far.
    pub async fn discard(self) -> RemovalOutcome {
        remove_file_best_effort(&self.input_path).await
    }
}

/// Creates job records and hands each one to its own background task.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<JobStore>,
    runner: JobRunner,
    layout: StorageLayout,
}

impl Dispatcher {
    pub fn new(store: Arc<JobStore>, runner: JobRunner, layout: StorageLayout) -> Self {
        Self {
            store,
            runner,
            layout,
        }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Validate a client-supplied frame rate.
    pub fn validate_fps(fps: i64) -> JobResult<Fps> {
        Ok(Fps::try_from(fps)?)
    }

    /// Reserve a fresh job id and its file locations.
    pub fn prepare(&self, original_filename: Option<&str>) -> PendingUpload {
        let id = JobId::new();
        PendingUpload {
            input_path: self.layout.input_path(&id, original_filename),
            output_path: self.layout.output_path(&id),
            id,
        }
    }

    /// Register a persisted upload as a `queued` job and start its runner.
    ///
    /// Returns as soon as the runner is spawned. An invalid fps rejects the
    /// submission before anything touches the store and removes the upload.
    pub async fn dispatch(&self, pending: PendingUpload, fps: i64) -> JobResult<JobId> {
        self.dispatch_with_handle(pending, fps)
            .await
            .map(|(id, _handle)| id)
    }

    /// Like [`Dispatcher::dispatch`], also returning the runner's task handle.
    pub async fn dispatch_with_handle(
        &self,
        pending: PendingUpload,
        fps: i64,
    ) -> JobResult<(JobId, JoinHandle<Option<RunReport>>)> {
        let fps = match Self::validate_fps(fps) {
            Ok(fps) => fps,
            Err(e) => {
                pending.discard().await;
                return Err(e);
            }
        };

        let PendingUpload {
            id,
            input_path,
            output_path,
        } = pending;

        let record = JobRecord::new(id.clone(), &input_path, &output_path, fps);
        if let Err(e) = self.store.put(record).await {
            remove_file_best_effort(&input_path).await;
            return Err(JobError::from(e));
        }
        metrics::record_job_submitted();
        info!(job_id = %id, fps = %fps, input = %input_path.display(), "Job queued");

        let runner = self.runner.clone();
        let job_id = id.clone();
        let span = JobLogger::new(&id).span(fps);
        let handle = tokio::spawn(
            async move {
                match runner.run(&job_id, fps).await {
                    Ok(report) => Some(report),
                    Err(e) => {
                        error!(job_id = %job_id, "Job runner aborted: {}", e);
                        None
                    }
                }
            }
            .instrument(span),
        );

        Ok((id, handle))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::path::Path;
    use std::time::Duration;

    use async_trait::async_trait;
    use tempfile::TempDir;
    use tokio::sync::Notify;
    use vgif_media::{MediaError, MediaResult, Transcoder};
    use vgif_models::JobStatus;

    use super::*;

    /// Blocks until released, then writes the output.
    struct GatedTranscoder {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl Transcoder for GatedTranscoder {
        async fn convert(&self, _input: &Path, output: &Path, _fps: Fps) -> MediaResult<()> {
            self.gate.notified().await;
            tokio::fs::write(output, b"GIF89a").await?;
            Ok(())
        }
    }

    /// Fails for inputs whose name contains "bad".
    struct SelectiveTranscoder;

    #[async_trait]
    impl Transcoder for SelectiveTranscoder {
        async fn convert(&self, input: &Path, output: &Path, _fps: Fps) -> MediaResult<()> {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if input.to_string_lossy().contains("bad") {
                return Err(MediaError::ffmpeg_failed("exited with 1", None, Some(1)));
            }
            tokio::fs::write(output, b"GIF89a").await?;
            Ok(())
        }
    }

    fn dispatcher(dir: &TempDir, transcoder: Arc<dyn Transcoder>) -> (Arc<JobStore>, Dispatcher) {
        let store = Arc::new(JobStore::new());
        let layout = StorageLayout::new(dir.path().join("videos"), dir.path().join("gifs"));
        let runner = JobRunner::new(Arc::clone(&store), transcoder);
        (Arc::clone(&store), Dispatcher::new(store, runner, layout))
    }

    async fn upload(dispatcher: &Dispatcher, name: &str) -> PendingUpload {
        dispatcher.layout().ensure_dirs().await.unwrap();
        let pending = dispatcher.prepare(Some(name));
        tokio::fs::write(pending.input_path(), b"video").await.unwrap();
        pending
    }

    #[tokio::test]
    async fn test_invalid_fps_never_touches_store() {
        let dir = TempDir::new().unwrap();
        let (store, dispatcher) = dispatcher(&dir, Arc::new(SelectiveTranscoder));

        for fps in [0, -1] {
            let pending = upload(&dispatcher, "clip.mp4").await;
            let input = pending.input_path().to_path_buf();

            let err = dispatcher.dispatch(pending, fps).await.unwrap_err();
            assert!(matches!(err, JobError::InvalidFps(_)));
            assert!(!input.exists());
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_dispatch_returns_before_runner_completes() {
        let dir = TempDir::new().unwrap();
        let gate = Arc::new(Notify::new());
        let (store, dispatcher) = dispatcher(
            &dir,
            Arc::new(GatedTranscoder {
                gate: Arc::clone(&gate),
            }),
        );

        let pending = upload(&dispatcher, "clip.mov").await;
        let (id, handle) = dispatcher.dispatch_with_handle(pending, 16).await.unwrap();

        let status = store.get(&id).await.unwrap().status;
        assert!(matches!(status, JobStatus::Queued | JobStatus::Processing));

        gate.notify_one();
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.status, JobStatus::Finished);

        let record = store.get(&id).await.unwrap();
        assert_eq!(record.fps.get(), 16);
        assert!(record.input_path.to_string_lossy().ends_with(".mov"));
        assert!(!record.input_path.exists());
        assert!(record.output_path.exists());
    }

    #[tokio::test]
    async fn test_concurrent_submissions_are_independent() {
        let dir = TempDir::new().unwrap();
        let (store, dispatcher) = dispatcher(&dir, Arc::new(SelectiveTranscoder));
        dispatcher.layout().ensure_dirs().await.unwrap();

        let mut submissions = Vec::new();
        for i in 0..20 {
            let dispatcher = dispatcher.clone();
            submissions.push(tokio::spawn(async move {
                let name = if i % 4 == 0 { "bad.mp4" } else { "good.mp4" };
                let pending = dispatcher.prepare(Some(name));
                let marked = pending
                    .input_path()
                    .with_file_name(format!("{}-{}", name, pending.id()));
                // Encode the outcome in the stored path so the stub can see it
                let pending = PendingUpload {
                    id: pending.id().clone(),
                    input_path: marked,
                    output_path: pending.output_path().to_path_buf(),
                };
                tokio::fs::write(pending.input_path(), b"video").await.unwrap();
                dispatcher.dispatch_with_handle(pending, 10).await.unwrap()
            }));
        }

        let mut ids = HashSet::new();
        let mut failed = 0;
        for submission in submissions {
            let (id, handle) = submission.await.unwrap();
            let report = handle.await.unwrap().unwrap();
            assert!(report.status.is_terminal());
            if report.status == JobStatus::Failed {
                failed += 1;
            }
            let record = store.get(&id).await.unwrap();
            assert!(!record.input_path.exists());
            ids.insert(id);
        }

        assert_eq!(ids.len(), 20);
        assert_eq!(failed, 5);
        assert_eq!(store.len().await, 20);
    }
}
