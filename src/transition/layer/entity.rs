use crate::Sample;
use crate::transition::{Candidate, RoadPath};
use rustc_hash::FxHashMap;

/// Transition scores into a time step from the step before it.
#[derive(Debug, Clone, PartialEq)]
pub struct Transitions {
    /// `log_probabilities[p][s]` scores moving from candidate `p` of the
    /// previous step to candidate `s` of this one.
    pub log_probabilities: Vec<Vec<f64>>,

    /// The route behind every finite transition, keyed by `(p, s)`.
    pub paths: FxHashMap<(usize, usize), RoadPath>,
}

impl Transitions {
    #[inline]
    pub fn log_probability(&self, from: usize, to: usize) -> f64 {
        self.log_probabilities
            .get(from)
            .and_then(|row| row.get(to))
            .copied()
            .unwrap_or(f64::NEG_INFINITY)
    }

    #[inline]
    pub fn path(&self, from: usize, to: usize) -> Option<&RoadPath> {
        self.paths.get(&(from, to))
    }
}

/// One retained sample and everything the decoder needs to score it.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeStep {
    /// Index of the sample within its trajectory.
    pub index: usize,
    pub sample: Sample,
    pub candidates: Vec<Candidate>,
    /// Emission log-probability of each candidate.
    pub emissions: Vec<f64>,
    /// Scores from the previous step. Absent at the start of a segment.
    pub transitions: Option<Transitions>,
    /// Set on the first step of the trajectory and after split gaps.
    pub starts_segment: bool,
}

impl TimeStep {
    pub fn new(index: usize, sample: Sample, candidates: Vec<Candidate>) -> Self {
        TimeStep {
            index,
            sample,
            candidates,
            emissions: vec![],
            transitions: None,
            starts_segment: false,
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// The time steps of one decode. Acyclic by construction: transitions only
/// ever point at the step immediately before.
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    pub steps: Vec<TimeStep>,
    /// Samples dropped for lack of candidates.
    pub unmatched: Vec<usize>,
}
