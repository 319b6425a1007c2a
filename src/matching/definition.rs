use crate::transition::MatchError;
use crate::{BatchOutcome, ConfigError, MatchResult, ParallelMatchScheduler, Trajectory};

pub trait MapMatchingAlgorithm {
    /// Matches a whole [`Trajectory`] at once.
    ///
    /// Every sample is known up front, so alternatives can be ranked and
    /// the decoder never commits early.
    fn offline_match(&self, trajectory: &Trajectory) -> Result<MatchResult, MatchError>;

    /// Matches a [`Trajectory`] by feeding its samples one at a time to an
    /// incremental decoder, as a live feed would.
    ///
    /// Only the best sequence is kept, so the result carries a single rank.
    fn online_match(&self, trajectory: &Trajectory) -> Result<MatchResult, MatchError>;

    /// Matches many trajectories on `workers` threads (`-1` for every core).
    ///
    /// A failing trajectory never aborts the others. Results keep the order
    /// of `trajectories`.
    fn batch_match(
        &self,
        trajectories: &[Trajectory],
        workers: isize,
    ) -> Result<BatchOutcome, ConfigError>
    where
        Self: Sync + Sized,
    {
        Ok(ParallelMatchScheduler::new(self, workers)?.batch(trajectories))
    }
}
