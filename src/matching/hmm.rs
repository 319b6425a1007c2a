use crate::transition::{
    Break, CostingStrategies, Decoded, DefaultCosting, ExponentialTransition, GapTracker,
    GaussianEmission, Lattice, LatticeBuilder, MatchError, MatchedState, OnlineViterbi,
    RouteBudget, Solver, TimeStep, ViterbiSolver, beta_at_interval, estimate_beta, route_ways,
};
use crate::trajectory::mean_interval;
use crate::{
    ConfigError, MapMatchingAlgorithm, MatchConfig, MatchResult, RoadNetworkGraph,
    RoadNetworkIndex, Sample, Trajectory, TrajectoryId, WayId,
};

use log::{debug, info};
use measure_time::debug_time;

#[cfg(feature = "tracing")]
use tracing::Level;

/// Matches trajectories with a hidden Markov model over candidate road
/// positions, decoded by Viterbi.
///
/// Holds only shared references to the road network and its index, so a
/// single matcher serves any number of threads.
#[derive(Debug, Clone)]
pub struct HmmMatcher<'a> {
    graph: &'a RoadNetworkGraph,
    index: &'a RoadNetworkIndex,
    config: MatchConfig,
}

impl<'a> HmmMatcher<'a> {
    /// Creates a matcher, rejecting invalid configurations up front.
    pub fn new(
        graph: &'a RoadNetworkGraph,
        index: &'a RoadNetworkIndex,
        config: MatchConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(HmmMatcher {
            graph,
            index,
            config,
        })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn graph(&self) -> &'a RoadNetworkGraph {
        self.graph
    }

    /// The scored lattice of a trajectory, before decoding.
    pub fn lattice(&self, trajectory: &Trajectory) -> Result<Lattice, MatchError> {
        trajectory.validate()?;

        let costing = self.costing(estimate_beta(self.config.beta, &trajectory.samples));
        self.builder().build(trajectory, &costing)
    }

    /// Starts matching a trajectory whose samples will arrive one by one.
    pub fn online_session(&self, trajectory: TrajectoryId) -> OnlineSession<'_> {
        let builder = self.builder();
        let tracker = builder
            .generator()
            .tracker(self.config.gap_policy, self.config.max_gap_extension);

        OnlineSession {
            matcher: self,
            trajectory,
            builder,
            tracker,
            decoder: OnlineViterbi::new(self.config.online_window, self.config.break_policy),
            samples: vec![],
            nearest: vec![],
            previous: None,
        }
    }

    fn builder(&self) -> LatticeBuilder<'_> {
        LatticeBuilder::new(self.graph, self.index, &self.config)
    }

    fn costing(&self, beta: f64) -> DefaultCosting {
        CostingStrategies::new(
            GaussianEmission::new(self.config.sigma),
            ExponentialTransition::new(beta),
        )
    }

    /// Log-probability of what decoding could not score.
    ///
    /// A join between segments is priced as a transition spending its whole
    /// route budget, and a dropped sample as a candidate at the edge of the
    /// search radius.
    fn penalty(
        &self,
        samples: &[Sample],
        decoded: &Decoded,
        unmatched: usize,
        costing: &DefaultCosting,
    ) -> f64 {
        let distance = self.graph.distance_fn();

        let joins = decoded
            .segments
            .windows(2)
            .filter_map(|pair| {
                let end = pair[0].best()?.states.last()?.sample;
                let start = pair[1].best()?.states.first()?.sample;
                let (from, to) = (samples.get(end)?, samples.get(start)?);

                let great = distance.distance(from.position, to.position);
                let budget = RouteBudget::between(&self.config, great, to.time - from.time);

                Some(
                    costing
                        .transition
                        .bridge_log_probability(great, budget.max_distance),
                )
            })
            .sum::<f64>();

        joins + unmatched as f64 * costing.emission.at_distance(self.config.search_radius)
    }
}

/// Distance from every sample to its closest candidate, infinite for samples
/// without one.
fn nearest_distances(lattice: &Lattice, samples: usize) -> Vec<f64> {
    let mut nearest = vec![f64::INFINITY; samples];
    for step in &lattice.steps {
        if let (Some(slot), Some(candidate)) = (nearest.get_mut(step.index), step.candidates.first()) {
            *slot = candidate.distance;
        }
    }

    nearest
}

impl MapMatchingAlgorithm for HmmMatcher<'_> {
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::INFO, skip_all, fields(trajectory = trajectory.id)))]
    fn offline_match(&self, trajectory: &Trajectory) -> Result<MatchResult, MatchError> {
        info!(
            "Matching trajectory {} with {} samples",
            trajectory.id,
            trajectory.len()
        );
        debug_time!("offline match of trajectory {}", trajectory.id);

        trajectory.validate()?;

        let costing = self.costing(estimate_beta(self.config.beta, &trajectory.samples));
        let lattice = self.builder().build(trajectory, &costing)?;

        let decoded = ViterbiSolver::new(self.config.rank_length, self.config.break_policy)
            .solve(&lattice)?;

        let penalty = self.penalty(
            &trajectory.samples,
            &decoded,
            lattice.unmatched.len(),
            &costing,
        );

        debug!(
            "Trajectory {} matched in {} segment(s), {} unmatched",
            trajectory.id,
            decoded.segments.len(),
            lattice.unmatched.len()
        );

        let nearest = nearest_distances(&lattice, trajectory.len());

        Ok(MatchResult::new(
            trajectory.id,
            decoded,
            lattice.unmatched,
            penalty,
            self.config.rank_length,
        )
        .with_unmatched_trajectories(&nearest, self.config.max_gap_extension))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::INFO, skip_all, fields(trajectory = trajectory.id)))]
    fn online_match(&self, trajectory: &Trajectory) -> Result<MatchResult, MatchError> {
        info!(
            "Matching trajectory {} online with {} samples",
            trajectory.id,
            trajectory.len()
        );

        trajectory.validate()?;

        let mut session = self.online_session(trajectory.id);
        for sample in &trajectory.samples {
            session.push(*sample)?;
        }

        session.finish()
    }
}

/// Incremental matching of one trajectory.
///
/// Each pushed sample is scored against the one before it and handed to an
/// [`OnlineViterbi`] decoder, so the best match so far is available after
/// every sample. Under [`BetaPolicy::PerSecond`](crate::BetaPolicy::PerSecond)
/// β follows the mean sampling interval seen so far.
pub struct OnlineSession<'m> {
    matcher: &'m HmmMatcher<'m>,
    trajectory: TrajectoryId,
    builder: LatticeBuilder<'m>,
    tracker: GapTracker,
    decoder: OnlineViterbi,
    samples: Vec<Sample>,
    /// Distance from each sample to its closest candidate.
    nearest: Vec<f64>,
    /// The last retained step, without its incoming transitions.
    previous: Option<TimeStep>,
}

impl OnlineSession<'_> {
    pub fn trajectory(&self) -> TrajectoryId {
        self.trajectory
    }

    /// Adds the next sample, which must be strictly later than the last.
    pub fn push(&mut self, sample: Sample) -> Result<(), MatchError> {
        let index = self.samples.len();

        let ordered = sample.time.is_finite()
            && self.samples.last().is_none_or(|last| sample.time > last.time);
        if !ordered {
            return Err(MatchError::UnorderedSamples {
                trajectory: self.trajectory,
                index,
            });
        }
        self.samples.push(sample);

        let candidates = self.builder.generator().candidates(&sample);
        self.nearest.push(
            candidates
                .first()
                .map_or(f64::INFINITY, |candidate| candidate.distance),
        );
        let Some(mut step) = self.tracker.observe(index, sample, candidates)? else {
            return Ok(());
        };

        let costing = self.costing();
        self.builder.score(&mut step, &costing);

        if !step.starts_segment {
            if let Some(previous) = &self.previous {
                self.builder.connect(previous, &mut step, &costing);
            }
        }

        self.previous = Some(TimeStep::new(
            step.index,
            step.sample,
            step.candidates.clone(),
        ));

        self.decoder.push(step)
    }

    /// The best states of the current segment so far.
    pub fn best_path(&self) -> Vec<MatchedState> {
        self.decoder.best_path()
    }

    /// Ways driven along [`best_path`](Self::best_path).
    pub fn best_ways(&self) -> Vec<WayId> {
        route_ways(&self.best_path())
    }

    /// States of the current segment that later samples can no longer change.
    pub fn committed(&self) -> &[MatchedState] {
        self.decoder.committed()
    }

    pub fn breaks(&self) -> &[Break] {
        self.decoder.breaks()
    }

    pub fn unmatched(&self) -> &[usize] {
        self.tracker.unmatched()
    }

    /// Samples pushed so far.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Commits everything still pending and returns the final match.
    pub fn finish(self) -> Result<MatchResult, MatchError> {
        if self.samples.is_empty() {
            return Err(MatchError::EmptyInput(self.trajectory));
        }

        if !self.tracker.has_retained() {
            return Err(MatchError::UnmatchableSample {
                index: 0,
                radius: self.matcher.config.search_radius,
            });
        }

        let costing = self.costing();
        let unmatched = self.tracker.into_unmatched();
        let decoded = self.decoder.finish();
        let penalty = self
            .matcher
            .penalty(&self.samples, &decoded, unmatched.len(), &costing);

        let config = &self.matcher.config;
        Ok(
            MatchResult::new(self.trajectory, decoded, unmatched, penalty, config.rank_length)
                .with_unmatched_trajectories(&self.nearest, config.max_gap_extension),
        )
    }

    fn costing(&self) -> DefaultCosting {
        let interval = mean_interval(&self.samples);
        self.matcher
            .costing(beta_at_interval(self.matcher.config.beta, interval))
    }
}
