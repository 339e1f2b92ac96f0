//! On-disk layout for uploads and produced GIFs.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;

use vgif_models::JobId;

/// Extension used when an upload has no usable one.
pub const DEFAULT_VIDEO_EXTENSION: &str = ".mp4";

/// Longest extension (without the dot) kept from an uploaded filename.
const MAX_EXTENSION_LEN: usize = 8;

/// Directories for transient uploads and produced GIFs.
///
/// Paths are keyed by job id, so no two jobs ever share a file.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    videos_dir: PathBuf,
    gifs_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(videos_dir: impl Into<PathBuf>, gifs_dir: impl Into<PathBuf>) -> Self {
        Self {
            videos_dir: videos_dir.into(),
            gifs_dir: gifs_dir.into(),
        }
    }

    /// Create both directories if absent.
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.videos_dir).await?;
        fs::create_dir_all(&self.gifs_dir).await?;
        info!(
            videos_dir = %self.videos_dir.display(),
            gifs_dir = %self.gifs_dir.display(),
            "Storage directories ready"
        );
        Ok(())
    }

    pub fn videos_dir(&self) -> &Path {
        &self.videos_dir
    }

    pub fn gifs_dir(&self) -> &Path {
        &self.gifs_dir
    }

    /// Upload location: `<videos_dir>/<id><ext>`.
    pub fn input_path(&self, id: &JobId, original_filename: Option<&str>) -> PathBuf {
        let ext = upload_extension(original_filename);
        self.videos_dir.join(format!("{}{}", id, ext))
    }

    /// Output location: `<gifs_dir>/<id>.gif`.
    pub fn output_path(&self, id: &JobId) -> PathBuf {
        self.gifs_dir.join(format!("{}.gif", id))
    }
}

/// Extension (with leading dot) to keep from an uploaded filename.
///
/// Only short alphanumeric extensions are kept, anything else falls back to
/// `.mp4` so client-supplied names can never influence the directory.
pub fn upload_extension(original_filename: Option<&str>) -> String {
    original_filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_else(|| DEFAULT_VIDEO_EXTENSION.to_string())
}
