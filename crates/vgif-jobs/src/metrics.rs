//! Job lifecycle metrics.
//!
//! Recorded through the `metrics` facade; the API binary installs the
//! Prometheus recorder. Without a recorder these calls are no-ops.

use metrics::{counter, gauge, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_SUBMITTED_TOTAL: &str = "vgif_jobs_submitted_total";
    pub const JOBS_FINISHED_TOTAL: &str = "vgif_jobs_finished_total";
    pub const JOBS_FAILED_TOTAL: &str = "vgif_jobs_failed_total";
    pub const JOBS_IN_FLIGHT: &str = "vgif_jobs_in_flight";
    pub const JOBS_EVICTED_TOTAL: &str = "vgif_jobs_evicted_total";
    pub const TRANSCODE_DURATION_SECONDS: &str = "vgif_transcode_duration_seconds";
    pub const CLEANUP_FAILURES_TOTAL: &str = "vgif_cleanup_failures_total";
}

pub fn record_job_submitted() {
    counter!(names::JOBS_SUBMITTED_TOTAL).increment(1);
}

/// Track a runner entering or leaving the transcoding stage.
pub fn job_in_flight(delta: f64) {
    gauge!(names::JOBS_IN_FLIGHT).increment(delta);
}

pub fn record_transcode(success: bool, duration_secs: f64) {
    let outcome = if success { "success" } else { "failure" };
    histogram!(names::TRANSCODE_DURATION_SECONDS, "outcome" => outcome).record(duration_secs);

    if success {
        counter!(names::JOBS_FINISHED_TOTAL).increment(1);
    } else {
        counter!(names::JOBS_FAILED_TOTAL).increment(1);
    }
}

pub fn record_cleanup_failure() {
    counter!(names::CLEANUP_FAILURES_TOTAL).increment(1);
}

pub fn record_evicted(count: usize) {
    counter!(names::JOBS_EVICTED_TOTAL).increment(count as u64);
}
