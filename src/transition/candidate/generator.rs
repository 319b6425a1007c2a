use crate::transition::{Candidate, MatchError, TimeStep};
use crate::{GapPolicy, RoadNetworkGraph, RoadWay, Sample, SpatialIndex, Trajectory};

use geo::Point;
use log::debug;
use measure_time::debug_time;
use trajmatch_geo::DistanceFunction;

#[cfg(feature = "tracing")]
use tracing::Level;

/// Proposes road positions for samples.
pub struct CandidateGenerator<'a> {
    graph: &'a RoadNetworkGraph,
    index: &'a dyn SpatialIndex,
    search_radius: f64,
    max_candidates: usize,
}

/// The time steps of one trajectory, and the samples that were dropped for
/// lack of candidates.
#[derive(Debug)]
pub struct GeneratedSteps {
    pub steps: Vec<TimeStep>,
    pub unmatched: Vec<usize>,
}

impl<'a> CandidateGenerator<'a> {
    pub fn new(graph: &'a RoadNetworkGraph, index: &'a dyn SpatialIndex, search_radius: f64) -> Self {
        CandidateGenerator {
            graph,
            index,
            search_radius,
            max_candidates: usize::MAX,
        }
    }

    /// Keeps only the `limit` closest candidates of each sample.
    pub fn with_limit(self, limit: usize) -> Self {
        CandidateGenerator {
            max_candidates: limit,
            ..self
        }
    }

    pub fn search_radius(&self) -> f64 {
        self.search_radius
    }

    /// Candidates for a single sample, ordered by distance then way id.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::TRACE, skip(self)))]
    pub fn candidates(&self, sample: &Sample) -> Vec<Candidate> {
        let mut candidates = self
            .index
            .range_query(sample.position, self.search_radius)
            .into_iter()
            .filter_map(|way| self.graph.way(way))
            .filter_map(|way| self.project(way, sample.position))
            .filter(|candidate| candidate.distance <= self.search_radius)
            .collect::<Vec<_>>();

        candidates.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.way.cmp(&b.way)));
        candidates.truncate(self.max_candidates);
        candidates
    }

    /// The closest position of `way` to `point`. Equally close segments
    /// resolve to the lowest segment index.
    pub fn project(&self, way: &RoadWay, point: Point) -> Option<Candidate> {
        let distance = self.graph.distance_fn();

        way.segments()
            .map(|(segment, source, target)| (segment, distance.project(point, source, target)))
            .reduce(|best, next| if next.1.distance < best.1.distance { next } else { best })
            .map(|(segment, projection)| Candidate {
                way: way.id,
                segment,
                position: projection.point,
                offset: way.offset_at(segment, projection.fraction),
                distance: projection.distance,
            })
    }

    pub fn tracker(&self, policy: GapPolicy, max_gap_extension: f64) -> GapTracker {
        GapTracker {
            distance: self.graph.distance_fn(),
            policy,
            max_gap_extension,
            search_radius: self.search_radius,
            previous: None,
            gap_start: None,
            unmatched: vec![],
        }
    }

    /// One time step per sample with candidates, with gaps handled by `policy`.
    pub fn generate(
        &self,
        trajectory: &Trajectory,
        policy: GapPolicy,
        max_gap_extension: f64,
    ) -> Result<GeneratedSteps, MatchError> {
        debug_time!("generate candidates for {} samples", trajectory.len());

        let mut tracker = self.tracker(policy, max_gap_extension);
        let mut steps = Vec::with_capacity(trajectory.len());

        for (index, sample) in trajectory.samples.iter().enumerate() {
            if let Some(step) = tracker.observe(index, *sample, self.candidates(sample))? {
                steps.push(step);
            }
        }

        if steps.is_empty() {
            return Err(MatchError::UnmatchableSample {
                index: 0,
                radius: self.search_radius,
            });
        }

        Ok(GeneratedSteps {
            steps,
            unmatched: tracker.into_unmatched(),
        })
    }
}

/// Applies a [`GapPolicy`] to samples as they arrive.
///
/// Samples without candidates are recorded as unmatched and produce no time
/// step. The first retained sample after a gap wider than the maximum gap
/// extension either bridges it, starts a new segment, or fails the match.
#[derive(Debug, Clone)]
pub struct GapTracker {
    distance: DistanceFunction,
    policy: GapPolicy,
    max_gap_extension: f64,
    search_radius: f64,
    previous: Option<Sample>,
    gap_start: Option<usize>,
    unmatched: Vec<usize>,
}

impl GapTracker {
    pub fn observe(
        &mut self,
        index: usize,
        sample: Sample,
        candidates: Vec<Candidate>,
    ) -> Result<Option<TimeStep>, MatchError> {
        if candidates.is_empty() {
            self.unmatched.push(index);
            if self.previous.is_some() && self.gap_start.is_none() {
                self.gap_start = Some(index);
            }

            return Ok(None);
        }

        let mut step = TimeStep::new(index, sample, candidates);

        match (self.previous, self.gap_start.take()) {
            (None, _) => step.starts_segment = true,
            (Some(previous), Some(gap)) => {
                let span = self.distance.distance(previous.position, sample.position);

                if span > self.max_gap_extension {
                    match self.policy {
                        GapPolicy::Bridge => {}
                        GapPolicy::Split => {
                            debug!("Gap of {span:.1}m before sample {index}, starting a new segment");
                            step.starts_segment = true;
                        }
                        GapPolicy::Terminate => {
                            return Err(MatchError::UnmatchableSample {
                                index: gap,
                                radius: self.search_radius,
                            });
                        }
                    }
                }
            }
            (Some(_), None) => {}
        }

        self.previous = Some(sample);
        Ok(Some(step))
    }

    /// Whether any sample has produced a time step yet.
    pub fn has_retained(&self) -> bool {
        self.previous.is_some()
    }

    pub fn unmatched(&self) -> &[usize] {
        &self.unmatched
    }

    pub fn into_unmatched(self) -> Vec<usize> {
        self.unmatched
    }
}
