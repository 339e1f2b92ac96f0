//! Two-pass palette-based GIF conversion.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info};

use vgif_models::Fps;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::{palettegen_filter, paletteuse_filter};
use crate::fs_utils::remove_file_best_effort;

/// Converts a source video into an animated GIF.
///
/// Implementations either fully produce `output` and return `Ok`, or return
/// an error and leave no file at `output`.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn convert(&self, input: &Path, output: &Path, fps: Fps) -> MediaResult<()>;
}

/// Palette file written next to the output during the first pass.
pub fn palette_path_for(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".palette.png");
    PathBuf::from(name)
}

/// FFmpeg implementation: `palettegen` then `paletteuse` with bayer dithering.
#[derive(Debug, Clone, Default)]
pub struct PaletteGifTranscoder {
    runner: FfmpegRunner,
}

impl PaletteGifTranscoder {
    /// Create a transcoder driving the given runner.
    pub fn new(runner: FfmpegRunner) -> Self {
        Self { runner }
    }

    /// Build the palette generation command.
    pub fn palette_command(input: &Path, palette: &Path, fps: Fps) -> FfmpegCommand {
        FfmpegCommand::new(input, palette).video_filter(palettegen_filter(fps))
    }

    /// Build the palette application command.
    pub fn encode_command(input: &Path, palette: &Path, output: &Path, fps: Fps) -> FfmpegCommand {
        FfmpegCommand::new(input, output)
            .extra_input(palette)
            .lavfi(paletteuse_filter(fps))
    }

    async fn run_passes(&self, input: &Path, palette: &Path, output: &Path, fps: Fps) -> MediaResult<()> {
        self.runner
            .run(&Self::palette_command(input, palette, fps))
            .await
            .map_err(|e| pass_error("palette generation", e))?;
        debug!("Palette written to {}", palette.display());

        self.runner
            .run(&Self::encode_command(input, palette, output, fps))
            .await
            .map_err(|e| pass_error("palette encode", e))?;

        if !output.exists() {
            return Err(MediaError::ffmpeg_failed(
                "palette encode produced no output",
                None,
                None,
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Transcoder for PaletteGifTranscoder {
    async fn convert(&self, input: &Path, output: &Path, fps: Fps) -> MediaResult<()> {
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.to_path_buf()));
        }

        let palette = palette_path_for(output);
        let start = Instant::now();

        let result = self.run_passes(input, &palette, output, fps).await;

        remove_file_best_effort(&palette).await;
        if result.is_err() {
            // Never leave a partial GIF behind
            remove_file_best_effort(output).await;
        } else {
            info!(
                input = %input.display(),
                output = %output.display(),
                fps = %fps,
                duration_ms = start.elapsed().as_millis() as u64,
                "GIF conversion complete"
            );
        }

        result
    }
}

/// Tag a failed pass with its name so job errors say which stage broke.
fn pass_error(stage: &str, err: MediaError) -> MediaError {
    match err {
        MediaError::FfmpegFailed {
            message,
            stderr,
            exit_code,
        } => MediaError::ffmpeg_failed(format!("{}: {}", stage, message), stderr, exit_code),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_palette_path() {
        let palette = palette_path_for(Path::new("gifs/abc.gif"));
        assert_eq!(palette, PathBuf::from("gifs/abc.gif.palette.png"));
    }

    #[test]
    fn test_passes_use_same_fps() {
        let fps = Fps::try_from(16).unwrap();
        let input = Path::new("videos/abc.mp4");
        let palette = Path::new("gifs/abc.gif.palette.png");
        let output = Path::new("gifs/abc.gif");

        let first = PaletteGifTranscoder::palette_command(input, palette, fps).build_args();
        let second = PaletteGifTranscoder::encode_command(input, palette, output, fps).build_args();

        assert!(first.iter().any(|a| a.starts_with("fps=16,scale=iw:-1:flags=spline")));
        assert!(second.iter().any(|a| a.starts_with("fps=16,scale=iw:-1:flags=spline")));
        assert!(second.iter().any(|a| a.contains("paletteuse=dither=bayer")));
        assert_eq!(first.last().map(String::as_str), Some("gifs/abc.gif.palette.png"));
        assert_eq!(second.last().map(String::as_str), Some("gifs/abc.gif"));
    }

    #[tokio::test]
    async fn test_missing_input() {
        let dir = TempDir::new().unwrap();
        let transcoder = PaletteGifTranscoder::default();

        let err = transcoder
            .convert(
                &dir.path().join("missing.mp4"),
                &dir.path().join("out.gif"),
                Fps::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }

    /// Writes a fake ffmpeg that copies its first input to its last argument.
    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, fail_on: Option<&str>) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let guard = match fail_on {
            Some(needle) => format!(
                "case \"$*\" in *{}*) echo 'simulated failure' >&2; exit 1;; esac\n",
                needle
            ),
            None => String::new(),
        };
        let script = format!(
            "#!/bin/sh\n{guard}in=''\nfor a in \"$@\"; do\n  if [ \"$prev\" = '-i' ] && [ -z \"$in\" ]; then in=\"$a\"; fi\n  prev=\"$a\"\n  out=\"$a\"\ndone\ncp \"$in\" \"$out\"\n"
        );
        let path = dir.join("ffmpeg");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_convert_with_fake_ffmpeg() {
        let dir = TempDir::new().unwrap();
        let ffmpeg = fake_ffmpeg(dir.path(), None);
        let input = dir.path().join("in.mp4");
        let output = dir.path().join("out.gif");
        std::fs::write(&input, b"GIF89a-ish").unwrap();

        let transcoder =
            PaletteGifTranscoder::new(FfmpegRunner::new().with_program(ffmpeg.to_string_lossy()));
        transcoder.convert(&input, &output, Fps::default()).await.unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"GIF89a-ish");
        assert!(!palette_path_for(&output).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_second_pass_failure_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let ffmpeg = fake_ffmpeg(dir.path(), Some("paletteuse"));
        let input = dir.path().join("in.mp4");
        let output = dir.path().join("out.gif");
        std::fs::write(&input, b"video").unwrap();

        let transcoder =
            PaletteGifTranscoder::new(FfmpegRunner::new().with_program(ffmpeg.to_string_lossy()));
        let err = transcoder
            .convert(&input, &output, Fps::default())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("palette encode"));
        assert!(err.detail().contains("simulated failure"));
        assert!(!output.exists());
        assert!(!palette_path_for(&output).exists());
    }
}
