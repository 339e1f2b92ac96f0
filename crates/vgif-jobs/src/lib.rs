//! Asynchronous GIF conversion job lifecycle.
//!
//! This crate provides:
//! - The in-memory job store and its status state machine enforcement
//! - The dispatcher that registers uploads and spawns one runner per job
//! - The runner that drives a job through the transcoder
//! - Status and result lookups for the HTTP layer
//! - Optional retention of terminal jobs

pub mod artifact;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod layout;
pub mod logging;
pub mod metrics;
pub mod retention;
pub mod runner;
pub mod status;
pub mod store;

pub use artifact::ResultFetcher;
pub use config::JobsConfig;
pub use dispatcher::{Dispatcher, PendingUpload};
pub use error::{JobError, JobResult, StoreError, StoreResult};
pub use layout::StorageLayout;
pub use logging::JobLogger;
pub use retention::RetentionSweeper;
pub use runner::{JobRunner, RunReport};
pub use status::{download_path, JobStatusView, StatusReporter};
pub use store::JobStore;
