#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for GIF conversion.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - A process runner with stderr capture and an optional deadline
//! - The two-pass palette filters
//! - The `Transcoder` seam and its FFmpeg implementation
//! - Best-effort file removal

pub mod command;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod gif;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{remove_file_best_effort, RemovalOutcome};
pub use gif::{palette_path_for, PaletteGifTranscoder, Transcoder};
