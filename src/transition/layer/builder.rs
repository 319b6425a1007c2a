use crate::transition::{
    CandidateGenerator, CostingStrategies, EmissionContext, EmissionStrategy, GeneratedSteps,
    Lattice, MatchError, RouteBudget, RouteSearch, TimeStep, TransitionContext,
    TransitionStrategy, Transitions,
};
use crate::{MatchConfig, RoadNetworkGraph, SpatialIndex, Trajectory};

use log::debug;
use measure_time::debug_time;
use rustc_hash::FxHashMap;

#[cfg(feature = "tracing")]
use tracing::Level;

/// Builds the [`Lattice`] of a trajectory: candidates per sample, their
/// emission scores, and the transition scores between consecutive steps.
pub struct LatticeBuilder<'a> {
    graph: &'a RoadNetworkGraph,
    generator: CandidateGenerator<'a>,
    search: RouteSearch<'a>,
    config: &'a MatchConfig,
}

impl<'a> LatticeBuilder<'a> {
    pub fn new(
        graph: &'a RoadNetworkGraph,
        index: &'a dyn SpatialIndex,
        config: &'a MatchConfig,
    ) -> Self {
        LatticeBuilder {
            graph,
            generator: CandidateGenerator::new(graph, index, config.search_radius)
                .with_limit(config.max_candidates),
            search: RouteSearch::new(graph, config.u_turn_penalty),
            config,
        }
    }

    pub fn generator(&self) -> &CandidateGenerator<'a> {
        &self.generator
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::DEBUG, skip_all, fields(trajectory = trajectory.id)))]
    pub fn build<E, T>(
        &self,
        trajectory: &Trajectory,
        costing: &CostingStrategies<E, T>,
    ) -> Result<Lattice, MatchError>
    where
        E: EmissionStrategy,
        T: TransitionStrategy,
    {
        debug_time!("build lattice for trajectory {}", trajectory.id);

        let GeneratedSteps {
            mut steps,
            unmatched,
        } = self.generator.generate(
            trajectory,
            self.config.gap_policy,
            self.config.max_gap_extension,
        )?;

        for index in 0..steps.len() {
            let (before, after) = steps.split_at_mut(index);
            let step = &mut after[0];

            self.score(step, costing);
            if let Some(previous) = before.last() {
                if !step.starts_segment {
                    self.connect(previous, step, costing);
                }
            }
        }

        debug!(
            "Lattice for trajectory {}: {} steps, {} candidates, {} unmatched",
            trajectory.id,
            steps.len(),
            steps.iter().map(TimeStep::len).sum::<usize>(),
            unmatched.len()
        );

        Ok(Lattice { steps, unmatched })
    }

    /// Fills the emission scores of `step`.
    pub fn score<E, T>(&self, step: &mut TimeStep, costing: &CostingStrategies<E, T>)
    where
        E: EmissionStrategy,
        T: TransitionStrategy,
    {
        step.emissions = step
            .candidates
            .iter()
            .map(|candidate| costing.emission(EmissionContext::new(candidate, &step.sample)))
            .collect();
    }

    /// Fills the transition scores from `previous` into `next`.
    pub fn connect<E, T>(
        &self,
        previous: &TimeStep,
        next: &mut TimeStep,
        costing: &CostingStrategies<E, T>,
    ) where
        E: EmissionStrategy,
        T: TransitionStrategy,
    {
        let great_circle = self
            .graph
            .distance_fn()
            .distance(previous.sample.position, next.sample.position);
        let elapsed = next.sample.time - previous.sample.time;
        let budget = RouteBudget::between(self.config, great_circle, elapsed);

        let mut paths = FxHashMap::default();
        let log_probabilities = previous
            .candidates
            .iter()
            .enumerate()
            .map(|(from, source)| {
                let routes = self.search.routes(source, &next.candidates, &budget);

                next.candidates
                    .iter()
                    .zip(routes)
                    .enumerate()
                    .map(|(to, (target, route))| {
                        let log_probability = costing.transition(TransitionContext {
                            source,
                            target,
                            route: route.as_ref(),
                            great_circle,
                            elapsed,
                        });

                        if let Some(route) = route.filter(|_| log_probability.is_finite()) {
                            paths.insert((from, to), route);
                        }

                        log_probability
                    })
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        next.transitions = Some(Transitions {
            log_probabilities,
            paths,
        });
    }
}
