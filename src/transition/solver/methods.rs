use crate::WayId;
use crate::transition::{Candidate, Lattice, MatchError, RoadPath};

use itertools::Itertools;

/// Why a matched segment ended early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreakReason {
    /// No candidate of the step was reachable from the step before it.
    Unreachable,
    /// A split gap of unmatched samples preceded the step.
    Gap,
}

/// A point where decoding restarted. `sample` is the first sample of the new
/// segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Break {
    pub sample: usize,
    pub reason: BreakReason,
}

/// The candidate chosen for one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedState {
    pub sample: usize,
    pub candidate: Candidate,
    /// The route from the previous state's candidate, absent at the start
    /// of a segment.
    pub path: Option<RoadPath>,
}

/// The ways driven through a sequence of states, without consecutive repeats.
pub fn route_ways(states: &[MatchedState]) -> Vec<WayId> {
    states
        .iter()
        .flat_map(|state| {
            state
                .path
                .iter()
                .flat_map(|path| path.ways.iter().copied())
                .chain(std::iter::once(state.candidate.way))
        })
        .dedup()
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedSequence {
    pub states: Vec<MatchedState>,
    pub log_probability: f64,
}

impl RankedSequence {
    pub fn ways(&self) -> Vec<WayId> {
        route_ways(&self.states)
    }
}

/// One unbroken run of the lattice, with its ranked state sequences, best first.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSegment {
    pub ranked: Vec<RankedSequence>,
}

impl DecodedSegment {
    pub fn best(&self) -> Option<&RankedSequence> {
        self.ranked.first()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decoded {
    pub segments: Vec<DecodedSegment>,
    pub breaks: Vec<Break>,
}

/// Recovers the most likely state sequences of a [`Lattice`].
pub trait Solver {
    fn solve(&self, lattice: &Lattice) -> Result<Decoded, MatchError>;
}
