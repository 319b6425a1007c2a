use crate::TrajectoryId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("trajectory {0} has no samples")]
    EmptyInput(TrajectoryId),

    #[error("sample {index} of trajectory {trajectory} is not strictly after its predecessor")]
    UnorderedSamples {
        trajectory: TrajectoryId,
        index: usize,
    },

    #[error("sample {index} has no road within {radius}m")]
    UnmatchableSample { index: usize, radius: f64 },

    #[error("no transition reaches sample {index}")]
    DecodeBroken { index: usize },

    #[error("the first time step has no candidates")]
    EmptyInitialStep,

    #[error("matching of trajectory {0} was cancelled before it started")]
    Cancelled(TrajectoryId),
}
