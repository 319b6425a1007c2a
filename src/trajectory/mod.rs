//! Timestamped GPS observations.

use crate::transition::MatchError;
use geo::Point;


pub type TrajectoryId = u64;

/// A single GPS observation, positioned in the road network's coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub position: Point,
    /// Seconds, on any monotonic clock shared by the trajectory.
    pub time: f64,
}

impl Sample {
    pub fn new(x: f64, y: f64, time: f64) -> Self {
        Sample {
            position: Point::new(x, y),
            time,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub id: TrajectoryId,
    pub samples: Vec<Sample>,
}

impl Trajectory {
    pub fn new(id: TrajectoryId, samples: Vec<Sample>) -> Self {
        Trajectory { id, samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Checks the trajectory has samples and that their timestamps are
    /// finite and strictly increasing.
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.samples.is_empty() {
            return Err(MatchError::EmptyInput(self.id));
        }

        if let Some(index) = self.samples.iter().position(|s| !s.time.is_finite()) {
            return Err(MatchError::UnorderedSamples {
                trajectory: self.id,
                index,
            });
        }

        match self
            .samples
            .windows(2)
            .position(|pair| pair[1].time <= pair[0].time)
        {
            Some(index) => Err(MatchError::UnorderedSamples {
                trajectory: self.id,
                index: index + 1,
            }),
            None => Ok(()),
        }
    }

    /// Mean time between consecutive samples, if the trajectory spans any time.
    pub fn mean_interval(&self) -> Option<f64> {
        mean_interval(&self.samples)
    }
}

pub(crate) fn mean_interval(samples: &[Sample]) -> Option<f64> {
    let (first, last) = (samples.first()?, samples.last()?);
    let interval = (last.time - first.time) / (samples.len() - 1) as f64;

    (interval.is_finite() && interval > 0.0).then_some(interval)
}
