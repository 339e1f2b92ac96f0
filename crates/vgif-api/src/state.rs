//! Application state.

use std::sync::Arc;

use vgif_jobs::{Dispatcher, JobRunner, JobStore, ResultFetcher, StatusReporter, StorageLayout};
use vgif_media::{FfmpegRunner, PaletteGifTranscoder, Transcoder};

use crate::auth::ApiKeyVerifier;
use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<JobStore>,
    pub dispatcher: Dispatcher,
    pub reporter: StatusReporter,
    pub fetcher: ResultFetcher,
    pub api_key: ApiKeyVerifier,
}

impl AppState {
    /// Create application state backed by the FFmpeg transcoder.
    pub fn new(config: ApiConfig) -> Self {
        let mut runner = FfmpegRunner::new().with_program(config.jobs.ffmpeg_bin.clone());
        if let Some(timeout) = config.jobs.transcode_timeout {
            runner = runner.with_timeout(timeout.as_secs());
        }
        Self::with_transcoder(config, Arc::new(PaletteGifTranscoder::new(runner)))
    }

    /// Create application state with a custom transcoder.
    pub fn with_transcoder(config: ApiConfig, transcoder: Arc<dyn Transcoder>) -> Self {
        let store = Arc::new(JobStore::new());
        let layout = StorageLayout::new(&config.jobs.videos_dir, &config.jobs.gifs_dir);
        let runner = JobRunner::new(Arc::clone(&store), transcoder);

        Self {
            dispatcher: Dispatcher::new(Arc::clone(&store), runner, layout),
            reporter: StatusReporter::new(Arc::clone(&store)),
            fetcher: ResultFetcher::new(Arc::clone(&store)),
            api_key: ApiKeyVerifier::new(&config.api_key),
            store,
            config,
        }
    }
}
