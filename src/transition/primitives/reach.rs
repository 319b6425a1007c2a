use crate::transition::{Candidate, Dijkstra};
use crate::{DirectedWay, Direction, MatchConfig, NodeId, RoadNetworkGraph, RoadWay, WayId};

use rustc_hash::FxHashMap;
use smallvec::{SmallVec, smallvec};

#[cfg(feature = "tracing")]
use tracing::Level;

/// Route costs are searched in whole centimetres.
pub const METER_TO_CM: f64 = 100.0;

type Centimetres = u64;

#[inline]
fn centimetres(metres: f64) -> Centimetres {
    (metres.max(0.0) * METER_TO_CM).round() as Centimetres
}

/// How far a route search between two consecutive samples may go.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteBudget {
    /// Metres of road, beyond which targets are unreachable.
    pub max_distance: f64,
    /// Way traversals settled before the search gives up.
    pub max_expansions: usize,
}

impl RouteBudget {
    /// `min(max_speed × elapsed, route_factor × great)`, but never below
    /// twice the search radius.
    pub fn between(config: &MatchConfig, great: f64, elapsed: f64) -> Self {
        let by_speed = config.max_speed * elapsed.max(0.0);
        let by_detour = config.route_factor * great;

        RouteBudget {
            max_distance: by_speed
                .min(by_detour)
                .max(2.0 * config.search_radius),
            max_expansions: config.max_expansions,
        }
    }
}

/// A route between two candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadPath {
    /// Every way touched, from the source candidate's way to the target
    /// candidate's way, without consecutive repeats.
    pub ways: Vec<WayId>,
    /// Metres driven, including any u-turn penalty.
    pub length: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Hop {
    /// The source candidate, partway along its way.
    Origin,
    /// Arrived at the far end of a traversal.
    Way(DirectedWay),
}

/// Bounded shortest-route search between candidates.
///
/// The search runs over way traversals rather than nodes: settling
/// `Hop::Way(t)` means the vehicle has reached the end of traversal `t`.
/// Partial traversals at either end are priced by offset.
pub struct RouteSearch<'a> {
    graph: &'a RoadNetworkGraph,
    u_turn_penalty: f64,
}

impl<'a> RouteSearch<'a> {
    pub fn new(graph: &'a RoadNetworkGraph, u_turn_penalty: f64) -> Self {
        RouteSearch {
            graph,
            u_turn_penalty,
        }
    }

    /// The shortest route from `source` to `target`, if one fits the budget.
    pub fn route(
        &self,
        source: &Candidate,
        target: &Candidate,
        budget: &RouteBudget,
    ) -> Option<RoadPath> {
        self.routes(source, std::slice::from_ref(target), budget)
            .pop()
            .flatten()
    }

    /// The shortest route from `source` to each of `targets`, searched once.
    /// Targets outside the budget are `None`.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::TRACE, skip_all))]
    pub fn routes(
        &self,
        source: &Candidate,
        targets: &[Candidate],
        budget: &RouteBudget,
    ) -> Vec<Option<RoadPath>> {
        let Some(origin) = self.graph.way(source.way) else {
            return vec![None; targets.len()];
        };

        let limit = centimetres(budget.max_distance);
        let penalty = centimetres(self.u_turn_penalty);

        // Cheapest arrival per target, and the hop it was entered from.
        // `None` as the hop means a move along the source way itself.
        let mut best: Vec<Option<(Centimetres, Option<Hop>)>> = targets
            .iter()
            .map(|target| {
                Self::along(origin, source, target)
                    .map(centimetres)
                    .filter(|cost| *cost <= limit)
                    .map(|cost| (cost, None))
            })
            .collect();

        let successors = |hop: &Hop| -> SmallVec<[(Hop, Centimetres); 4]> {
            match hop {
                Hop::Origin => {
                    let mut next: SmallVec<[(Hop, Centimetres); 4]> = smallvec![(
                        Hop::Way(DirectedWay::forward(source.way)),
                        centimetres(origin.length() - source.offset)
                    )];

                    if !origin.one_way {
                        next.push((
                            Hop::Way(DirectedWay::backward(source.way)),
                            centimetres(source.offset),
                        ));
                    }

                    next
                }
                Hop::Way(current) => self
                    .graph
                    .successors(*current)
                    .filter_map(|next| {
                        let way = self.graph.way(next.way)?;
                        let turn = if next == current.reversed() { penalty } else { 0 };
                        Some((Hop::Way(next), centimetres(way.length()) + turn))
                    })
                    .collect(),
            }
        };

        let mut parents: FxHashMap<Hop, Hop> = FxHashMap::default();
        let mut expansions = 0;

        for item in Dijkstra.reach(&Hop::Origin, successors) {
            if item.total_cost > limit {
                break;
            }

            // Every arrival from here on costs at least `total_cost`.
            if best
                .iter()
                .all(|entry| entry.is_some_and(|(cost, _)| cost <= item.total_cost))
            {
                break;
            }

            if let Some(parent) = item.parent {
                parents.insert(item.node, parent);
            }

            let Hop::Way(arrived) = item.node else {
                continue;
            };

            expansions += 1;
            if expansions > budget.max_expansions {
                break;
            }

            let Some(end) = self.graph.end_node(arrived) else {
                continue;
            };

            for (target, entry) in targets.iter().zip(best.iter_mut()) {
                let Some(way) = self.graph.way(target.way) else {
                    continue;
                };

                for (direction, into) in Self::entries(way, end, target.offset) {
                    let entering = DirectedWay {
                        way: target.way,
                        direction,
                    };

                    let turn = if entering == arrived.reversed() { penalty } else { 0 };
                    let cost = item.total_cost + centimetres(into) + turn;

                    if cost <= limit && entry.is_none_or(|(current, _)| cost < current) {
                        *entry = Some((cost, Some(item.node)));
                    }
                }
            }
        }

        targets
            .iter()
            .zip(best)
            .map(|(target, entry)| {
                let (cost, mut hop) = entry?;

                let mut ways = vec![target.way];
                while let Some(Hop::Way(traversal)) = hop {
                    ways.push(traversal.way);
                    hop = parents.get(&Hop::Way(traversal)).copied();
                }
                ways.push(source.way);

                ways.reverse();
                ways.dedup();

                Some(RoadPath {
                    ways,
                    length: cost as f64 / METER_TO_CM,
                })
            })
            .collect()
    }

    /// Metres between two candidates on the same way, without leaving it.
    fn along(way: &RoadWay, source: &Candidate, target: &Candidate) -> Option<f64> {
        if target.way != source.way {
            return None;
        }

        if target.offset >= source.offset {
            Some(target.offset - source.offset)
        } else if way.traversable(Direction::Backward) {
            Some(source.offset - target.offset)
        } else {
            None
        }
    }

    /// The directions `way` can be entered in from node `end`, with the
    /// metres driven to reach `offset`.
    fn entries(way: &RoadWay, end: NodeId, offset: f64) -> SmallVec<[(Direction, f64); 2]> {
        let mut entries = SmallVec::new();

        if way.source() == end {
            entries.push((Direction::Forward, offset));
        }

        if way.traversable(Direction::Backward) && way.target() == end {
            entries.push((Direction::Backward, way.length() - offset));
        }

        entries
    }
}
