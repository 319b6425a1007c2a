use crate::Sample;
use crate::transition::{Candidate, Strategy};

use std::f64::consts::PI;

pub trait EmissionStrategy: for<'a> Strategy<EmissionContext<'a>> {}
impl<T> EmissionStrategy for T where T: for<'a> Strategy<EmissionContext<'a>> {}

#[derive(Clone, Copy, Debug)]
pub struct EmissionContext<'a> {
    /// The proposed road position.
    pub candidate: &'a Candidate,

    /// The observation being matched.
    pub sample: &'a Sample,
}

impl<'a> EmissionContext<'a> {
    pub fn new(candidate: &'a Candidate, sample: &'a Sample) -> Self {
        EmissionContext { candidate, sample }
    }
}

/// GPS noise as a zero-mean gaussian with standard deviation `σ` metres:
///
/// ```math
/// ln P(d) = -ln(√(2π)·σ) - d² / (2σ²)
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GaussianEmission {
    sigma: f64,
    normaliser: f64,
}

impl GaussianEmission {
    pub fn new(sigma: f64) -> Self {
        GaussianEmission {
            sigma,
            normaliser: -((2.0 * PI).sqrt() * sigma).ln(),
        }
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Log-probability of observing a sample `distance` metres off the road.
    #[inline]
    pub fn at_distance(&self, distance: f64) -> f64 {
        self.normaliser - (distance * distance) / (2.0 * self.sigma * self.sigma)
    }
}

impl<'a> Strategy<EmissionContext<'a>> for GaussianEmission {
    #[inline]
    fn log_probability(&self, context: EmissionContext<'a>) -> f64 {
        self.at_distance(context.candidate.distance)
    }
}
