//! Matching many trajectories in parallel against one shared road network.
//!
//! Each trajectory is decoded on a single thread; parallelism comes only
//! from matching different trajectories at once. The matcher is shared by
//! reference, so the road network and its index are never copied.

pub mod outcome;

#[cfg(test)]
mod test;

pub use outcome::*;

use crate::transition::MatchError;
use crate::{ConfigError, MapMatchingAlgorithm, Trajectory, resolve_workers};

use log::{debug, info};
use measure_time::info_time;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "tracing")]
use tracing::Level;

/// Queued trajectories per worker when streaming.
pub const QUEUE_FACTOR: usize = 2;

/// A shared flag that stops a scheduler from starting new trajectories.
///
/// Trajectories already being decoded run to completion.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Runs a [`MapMatchingAlgorithm`] over many trajectories on a fixed number
/// of worker threads.
pub struct ParallelMatchScheduler<'m, M> {
    matcher: &'m M,
    workers: usize,
    pool: ThreadPool,
    cancellation: Cancellation,
}

impl<'m, M> ParallelMatchScheduler<'m, M>
where
    M: MapMatchingAlgorithm + Sync,
{
    /// A scheduler with `workers` threads, `-1` meaning every available core.
    pub fn new(matcher: &'m M, workers: isize) -> Result<Self, ConfigError> {
        let workers = resolve_workers(workers)?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("trajmatch-{index}"))
            .build()
            .map_err(|error| ConfigError::ThreadPool {
                workers,
                reason: error.to_string(),
            })?;

        Ok(ParallelMatchScheduler {
            matcher,
            workers,
            pool,
            cancellation: Cancellation::new(),
        })
    }

    /// Shares `cancellation` with the caller, who may trigger it from any
    /// thread.
    pub fn with_cancellation(self, cancellation: Cancellation) -> Self {
        ParallelMatchScheduler {
            cancellation,
            ..self
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    /// Matches every trajectory, keeping results in submission order.
    ///
    /// Trajectories not yet started when the run is cancelled fail with
    /// [`MatchError::Cancelled`].
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::INFO, skip_all, fields(trajectories = trajectories.len())))]
    pub fn batch(&self, trajectories: &[Trajectory]) -> BatchOutcome {
        info_time!(
            "batch of {} trajectories on {} workers",
            trajectories.len(),
            self.workers
        );

        let outcomes = self.pool.install(|| {
            trajectories
                .par_iter()
                .map(|trajectory| self.run(trajectory))
                .collect::<Vec<_>>()
        });

        let outcome = outcomes.into_iter().collect::<BatchOutcome>();
        info!(
            "Matched {} trajectories, {} failed",
            outcome.results.len(),
            outcome.failures.len()
        );

        outcome
    }

    /// Matches trajectories as `trajectories` yields them, handing each
    /// outcome to `sink` on the calling thread as soon as it is ready.
    ///
    /// At most [`QUEUE_FACTOR`] trajectories per worker are buffered ahead of
    /// the workers, so unbounded sources are consumed lazily. Outcomes arrive
    /// in completion order; each carries its trajectory id.
    ///
    /// Once cancelled, no further trajectories are pulled, and queued ones
    /// are counted as skipped without reaching `sink`.
    pub fn stream<I, F>(&self, trajectories: I, mut sink: F) -> StreamSummary
    where
        I: IntoIterator<Item = Trajectory>,
        I::IntoIter: Send,
        F: FnMut(MatchOutcome),
    {
        info_time!("stream on {} workers", self.workers);

        let capacity = QUEUE_FACTOR * self.workers;
        let mut summary = StreamSummary::default();

        std::thread::scope(|scope| {
            let (queue, jobs) = crossbeam_channel::bounded::<Trajectory>(capacity);
            let (reports, inbox) = crossbeam_channel::bounded::<Report>(capacity);

            let mut trajectories = trajectories.into_iter();
            let cancellation = &self.cancellation;
            scope.spawn(move || {
                while !cancellation.is_cancelled() {
                    let Some(trajectory) = trajectories.next() else {
                        return;
                    };

                    if queue.send(trajectory).is_err() {
                        return;
                    }
                }

                debug!("Stream cancelled, no longer reading trajectories");
            });

            for _ in 0..self.workers {
                let (jobs, reports) = (jobs.clone(), reports.clone());

                scope.spawn(move || {
                    for trajectory in jobs {
                        let report = if self.cancellation.is_cancelled() {
                            Report::Skipped
                        } else {
                            Report::Done(self.run(&trajectory))
                        };

                        if reports.send(report).is_err() {
                            break;
                        }
                    }
                });
            }

            drop((jobs, reports));

            for report in inbox {
                summary.submitted += 1;

                match report {
                    Report::Skipped => summary.skipped += 1,
                    Report::Done(outcome) => {
                        match outcome {
                            Ok(_) => summary.matched += 1,
                            Err(_) => summary.failed += 1,
                        }

                        sink(outcome);
                    }
                }
            }
        });

        info!(
            "Streamed {} trajectories: {} matched, {} failed, {} skipped",
            summary.submitted, summary.matched, summary.failed, summary.skipped
        );

        summary
    }

    fn run(&self, trajectory: &Trajectory) -> MatchOutcome {
        if self.cancellation.is_cancelled() {
            return Err(MatchFailure {
                trajectory: trajectory.id,
                error: MatchError::Cancelled(trajectory.id),
            });
        }

        self.matcher
            .offline_match(trajectory)
            .map_err(|error| MatchFailure {
                trajectory: trajectory.id,
                error,
            })
    }
}

enum Report {
    Done(MatchOutcome),
    Skipped,
}
