use crate::transition::{Candidate, RoadPath, Strategy};
use crate::{BetaPolicy, Sample, trajectory::mean_interval};

use log::debug;

pub trait TransitionStrategy: for<'a> Strategy<TransitionContext<'a>> {}
impl<T> TransitionStrategy for T where T: for<'a> Strategy<TransitionContext<'a>> {}

#[derive(Clone, Copy, Debug)]
pub struct TransitionContext<'a> {
    pub source: &'a Candidate,
    pub target: &'a Candidate,

    /// The shortest route between the candidates, if one was found
    /// within budget.
    pub route: Option<&'a RoadPath>,

    /// Metres, in a straight line, between the two samples.
    pub great_circle: f64,

    /// Seconds between the two samples.
    pub elapsed: f64,
}

/// Penalises routes by how much longer they are than the straight line
/// between their samples:
///
/// ```math
/// ln P = -max(0, route - great) / β
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExponentialTransition {
    beta: f64,
}

impl ExponentialTransition {
    pub fn new(beta: f64) -> Self {
        ExponentialTransition { beta }
    }

    /// Resolves `policy` against the samples it will score.
    pub fn for_samples(policy: BetaPolicy, samples: &[Sample]) -> Self {
        ExponentialTransition::new(estimate_beta(policy, samples))
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    #[inline]
    pub fn deviation(route: f64, great: f64) -> f64 {
        (route - great).max(0.0)
    }

    /// The best score a transition of `great` metres could be given when no
    /// route is known, assuming the detour uses the full `budget`.
    ///
    /// Scores the join between matched segments and across dropped samples.
    pub fn bridge_log_probability(&self, great: f64, budget: f64) -> f64 {
        -Self::deviation(budget, great) / self.beta
    }
}

impl<'a> Strategy<TransitionContext<'a>> for ExponentialTransition {
    #[inline]
    fn log_probability(&self, context: TransitionContext<'a>) -> f64 {
        match context.route {
            Some(route) => -Self::deviation(route.length, context.great_circle) / self.beta,
            None => f64::NEG_INFINITY,
        }
    }
}

/// β for a trajectory.
///
/// [`BetaPolicy::PerSecond`] scales by the mean sampling interval, falling
/// back to the per-second value itself when the samples span no time.
pub fn estimate_beta(policy: BetaPolicy, samples: &[Sample]) -> f64 {
    beta_at_interval(policy, mean_interval(samples))
}

/// β for a known mean sampling interval, `None` when there is none yet.
pub fn beta_at_interval(policy: BetaPolicy, interval: Option<f64>) -> f64 {
    match policy {
        BetaPolicy::Fixed(beta) => beta,
        BetaPolicy::PerSecond(per_second) => match interval {
            Some(interval) => per_second * interval,
            None => {
                debug!("No sampling interval to scale β by, using {per_second}");
                per_second
            }
        },
    }
}
