//! Shared data models for the vgif conversion service.
//!
//! This crate provides Serde-serializable types for:
//! - Job identifiers and the job status state machine
//! - The job record held by the job store
//! - Validated frame sampling rates

pub mod fps;
pub mod job;

// Re-export common types
pub use fps::{Fps, InvalidFps, DEFAULT_FPS};
pub use job::{JobId, JobRecord, JobStatus};
