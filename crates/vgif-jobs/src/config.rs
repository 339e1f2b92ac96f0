//! Job pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Job pipeline configuration.
#[derive(Debug, Clone)]
pub struct JobsConfig {
    /// Directory holding transient uploads
    pub videos_dir: PathBuf,
    /// Directory holding produced GIFs
    pub gifs_dir: PathBuf,
    /// FFmpeg program name or path
    pub ffmpeg_bin: String,
    /// Optional deadline per FFmpeg pass
    pub transcode_timeout: Option<Duration>,
    /// Evict terminal jobs older than this (disabled when unset)
    pub retention: Option<Duration>,
    /// How often the retention sweeper runs
    pub retention_sweep_interval: Duration,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            videos_dir: PathBuf::from("videos"),
            gifs_dir: PathBuf::from("gifs"),
            ffmpeg_bin: "ffmpeg".to_string(),
            transcode_timeout: None,
            retention: None,
            retention_sweep_interval: Duration::from_secs(60),
        }
    }
}

impl JobsConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            videos_dir: lookup("VIDEOS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.videos_dir),
            gifs_dir: lookup("GIFS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.gifs_dir),
            ffmpeg_bin: lookup("FFMPEG_BIN").unwrap_or(defaults.ffmpeg_bin),
            transcode_timeout: secs(lookup("TRANSCODE_TIMEOUT_SECS")),
            retention: secs(lookup("JOB_RETENTION_SECS")),
            retention_sweep_interval: secs(lookup("JOB_RETENTION_SWEEP_SECS"))
                .unwrap_or(defaults.retention_sweep_interval),
        }
    }
}

/// Positive number of seconds; anything else is treated as unset.
fn secs(value: Option<String>) -> Option<Duration> {
    value
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}
