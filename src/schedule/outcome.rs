use crate::transition::MatchError;
use crate::{MatchResult, TrajectoryId};

use log::warn;
use thiserror::Error;

/// A trajectory that could not be matched.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("trajectory {trajectory}: {error}")]
pub struct MatchFailure {
    pub trajectory: TrajectoryId,
    #[source]
    pub error: MatchError,
}

pub type MatchOutcome = Result<MatchResult, MatchFailure>;

/// Everything a batch produced, each list in submission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub results: Vec<MatchResult>,
    pub failures: Vec<MatchFailure>,
}

impl FromIterator<MatchOutcome> for BatchOutcome {
    fn from_iter<T: IntoIterator<Item = MatchOutcome>>(iter: T) -> Self {
        iter.into_iter()
            .fold(BatchOutcome::default(), |mut outcome, next| {
                match next {
                    Ok(result) => outcome.results.push(result),
                    Err(failure) => {
                        warn!("Could not match {failure}");
                        outcome.failures.push(failure);
                    }
                }

                outcome
            })
    }
}

/// Counts of a streamed run. `submitted` is the sum of the other three.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub submitted: usize,
    pub matched: usize,
    pub failed: usize,
    pub skipped: usize,
}
