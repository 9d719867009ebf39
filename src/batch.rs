//! Batch runner: isolated items over a bounded rayon pool.

use indicatif::ProgressBar;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{error, info};

use crate::models::{BatchEntry, BatchReport, ItemOutcome, ItemStatus};
use crate::pipeline::TrackPipeline;
use crate::progress::{create_progress_bar, format_duration, log_progress, ProgressMode};

pub const MAX_WORKERS: usize = 16;

/// Log-only progress line interval, in items.
const LOG_INTERVAL: u64 = 10;

pub struct BatchRunner {
    pipeline: TrackPipeline,
    pool: ThreadPool,
    progress: ProgressMode,
}

impl BatchRunner {
    /// `workers` is clamped to `1..=MAX_WORKERS`. Each worker holds at most
    /// one network call at a time, so this also bounds concurrent requests.
    pub fn new(
        pipeline: TrackPipeline,
        workers: usize,
        progress: ProgressMode,
    ) -> Result<Self, ThreadPoolBuildError> {
        let workers = workers.clamp(1, MAX_WORKERS);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("ytm-worker-{}", index))
            .build()?;
        Ok(Self {
            pipeline,
            pool,
            progress,
        })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run every entry. Ordinals are 1-based input positions and the
    /// outcomes come back in input order whatever the completion order.
    pub fn run_all(&self, entries: Vec<BatchEntry>) -> BatchReport {
        let start = Instant::now();
        let total = entries.len() as u64;
        let pb = create_progress_bar(total, "Tracks", self.progress);
        let completed = AtomicU64::new(0);

        let outcomes: Vec<ItemOutcome> = self.pool.install(|| {
            entries
                .par_iter()
                .enumerate()
                .map(|(index, entry)| {
                    let outcome = self.run_one(entry, index as u32 + 1, &pb);
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    log_progress(self.progress, "Tracks", done, total, LOG_INTERVAL);
                    outcome
                })
                .collect()
        });

        let mut report = BatchReport::from_outcomes(outcomes);
        info!(
            "Batch finished: {} attempted, {} succeeded, {} failed",
            report.attempted, report.succeeded, report.failed
        );
        report.elapsed_seconds = start.elapsed().as_secs_f64();
        pb.finish_with_message(format!(
            "Tracks: {}/{} succeeded in {}",
            report.succeeded,
            report.attempted,
            format_duration(start.elapsed())
        ));
        report
    }

    fn run_one(&self, entry: &BatchEntry, ordinal: u32, pb: &ProgressBar) -> ItemOutcome {
        let status = match self.pipeline.process(entry, ordinal) {
            Ok(success) => ItemStatus::Succeeded(success),
            Err(err) => {
                let stage = err.stage();
                error!("Skipping item {} ({}) at {}: {}", ordinal, entry.label(), stage, err);
                ItemStatus::Failed {
                    stage: stage.to_string(),
                    reason: err.to_string(),
                }
            }
        };
        pb.inc(1);
        ItemOutcome {
            ordinal,
            label: entry.label().to_string(),
            status,
        }
    }
}
