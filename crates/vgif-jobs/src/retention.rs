//! Background eviction of old terminal jobs.
//!
//! Periodically removes finished and failed jobs whose last update is older
//! than the retention window, along with their GIF outputs. Queued and
//! processing jobs are never touched.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use vgif_media::{remove_file_best_effort, RemovalOutcome};

use crate::metrics;
use crate::store::JobStore;

/// Retention sweeper service.
pub struct RetentionSweeper {
    store: Arc<JobStore>,
    retention: Duration,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(store: Arc<JobStore>, retention: Duration, interval: Duration) -> Self {
        Self {
            store,
            retention,
            interval,
        }
    }

    /// Start the sweep loop.
    ///
    /// Runs indefinitely and should be spawned as a background task.
    pub async fn run(&self) {
        info!(
            "Starting retention sweeper (retention: {:?}, interval: {:?})",
            self.retention, self.interval
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.sweep_once().await;
        }
    }

    /// Run a single sweep. Returns the number of evicted jobs.
    pub async fn sweep_once(&self) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(self.retention)
            .ok()
            .and_then(|window| Utc::now().checked_sub_signed(window))
        else {
            warn!("Retention window {:?} out of range, skipping sweep", self.retention);
            return 0;
        };
        self.evict_before(cutoff).await
    }

    async fn evict_before(&self, cutoff: DateTime<Utc>) -> usize {
        let evicted = self.store.evict_terminal(cutoff).await;
        if evicted.is_empty() {
            debug!("Retention sweep found nothing to evict");
            return 0;
        }

        for job in &evicted {
            if let RemovalOutcome::Failed(reason) = remove_file_best_effort(&job.output_path).await
            {
                metrics::record_cleanup_failure();
                warn!(
                    job_id = %job.id,
                    output = %job.output_path.display(),
                    "Failed to remove evicted output: {}", reason
                );
            }
        }

        metrics::record_evicted(evicted.len());
        info!(count = evicted.len(), "Evicted expired jobs");
        evicted.len()
    }
}
