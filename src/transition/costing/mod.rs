//! Log-domain probabilities of the hidden Markov model.
//!
//! Emission and transition models are pluggable strategies over a context
//! describing what is being scored, bundled together as
//! [`CostingStrategies`].

pub mod emission;
pub mod transition;


pub use emission::*;
pub use transition::*;

pub trait Strategy<Ctx> {
    /// Natural log of the probability of the context, `-∞` when impossible.
    fn log_probability(&self, context: Ctx) -> f64;
}

/// The emission and transition models used for one decode.
#[derive(Debug, Clone, Copy)]
pub struct CostingStrategies<Emission, Transition>
where
    Emission: EmissionStrategy,
    Transition: TransitionStrategy,
{
    pub emission: Emission,
    pub transition: Transition,
}

impl<Emission, Transition> CostingStrategies<Emission, Transition>
where
    Emission: EmissionStrategy,
    Transition: TransitionStrategy,
{
    pub fn new(emission: Emission, transition: Transition) -> Self {
        CostingStrategies {
            emission,
            transition,
        }
    }

    #[inline(always)]
    pub fn emission(&self, context: EmissionContext) -> f64 {
        self.emission.log_probability(context)
    }

    #[inline(always)]
    pub fn transition(&self, context: TransitionContext) -> f64 {
        self.transition.log_probability(context)
    }
}

/// The models of Newson & Krumm: gaussian GPS noise and exponentially
/// distributed route detours.
pub type DefaultCosting = CostingStrategies<GaussianEmission, ExponentialTransition>;
