use crate::graph::{
    DirectedWay, GraphError, NodeId, RoadNetworkGraph, RoadNode, RoadWay, WayId,
    network::GraphStructure,
};

use geo::{Point, Rect, coord};
use log::info;
use measure_time::debug_time;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use trajmatch_geo::DistanceFunction;

struct PendingWay {
    id: WayId,
    nodes: Vec<NodeId>,
    one_way: bool,
}

/// Collects nodes and ways, then validates and freezes them into a
/// [`RoadNetworkGraph`].
pub struct GraphBuilder {
    distance: DistanceFunction,
    nodes: Vec<RoadNode>,
    ways: Vec<PendingWay>,
}

impl GraphBuilder {
    pub fn new(distance: DistanceFunction) -> Self {
        GraphBuilder {
            distance,
            nodes: vec![],
            ways: vec![],
        }
    }

    pub fn node(mut self, id: impl Into<NodeId>, x: f64, y: f64) -> Self {
        self.nodes.push(RoadNode {
            id: id.into(),
            position: Point::new(x, y),
        });
        self
    }

    pub fn way<N: Into<NodeId>>(
        mut self,
        id: impl Into<WayId>,
        nodes: impl IntoIterator<Item = N>,
        one_way: bool,
    ) -> Self {
        self.ways.push(PendingWay {
            id: id.into(),
            nodes: nodes.into_iter().map(Into::into).collect(),
            one_way,
        });
        self
    }

    pub fn build(self) -> Result<RoadNetworkGraph, GraphError> {
        debug_time!("build road network");

        if self.ways.is_empty() {
            return Err(GraphError::Empty);
        }

        let mut nodes = FxHashMap::default();
        for node in self.nodes {
            if !node.position.x().is_finite() || !node.position.y().is_finite() {
                return Err(GraphError::InvalidPosition(node.id));
            }

            if nodes.insert(node.id, node).is_some() {
                return Err(GraphError::DuplicateNode(node.id));
            }
        }

        let mut ways = Vec::with_capacity(self.ways.len());
        for pending in self.ways {
            if pending.nodes.len() < 2 {
                return Err(GraphError::DegenerateWay(pending.id));
            }

            let geometry = pending
                .nodes
                .iter()
                .map(|id| {
                    nodes
                        .get(id)
                        .map(|node: &RoadNode| node.position)
                        .ok_or(GraphError::UnknownNode {
                            way: pending.id,
                            node: *id,
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let offsets = std::iter::once(0.0)
                .chain(geometry.windows(2).scan(0.0, |total, pair| {
                    *total += self.distance.distance(pair[0], pair[1]);
                    Some(*total)
                }))
                .collect::<Vec<_>>();

            ways.push(RoadWay {
                id: pending.id,
                nodes: pending.nodes,
                one_way: pending.one_way,
                geometry,
                offsets,
            });
        }

        ways.sort_by_key(|way| way.id);
        if let Some(pair) = ways.windows(2).find(|pair| pair[0].id == pair[1].id) {
            return Err(GraphError::DuplicateWay(pair[0].id));
        }

        let lookup = ways
            .iter()
            .enumerate()
            .map(|(index, way)| (way.id, index))
            .collect::<FxHashMap<_, _>>();

        let graph = Self::adjacency(&ways);
        let bounds = Self::bounds(&nodes);

        info!(
            "Built road network with {} nodes, {} ways and {} traversals",
            nodes.len(),
            ways.len(),
            graph.node_count()
        );

        Ok(RoadNetworkGraph {
            distance: self.distance,
            nodes,
            ways,
            lookup,
            graph,
            bounds,
        })
    }

    /// Links every traversal to each traversal departing from the node it
    /// arrives at.
    fn adjacency(ways: &[RoadWay]) -> GraphStructure {
        let mut graph = GraphStructure::new();
        let mut traversals = Vec::with_capacity(ways.len() * 2);
        let mut departures: FxHashMap<NodeId, SmallVec<[DirectedWay; 4]>> = FxHashMap::default();

        for way in ways {
            let forward = DirectedWay::forward(way.id);
            traversals.push((forward, way.target()));
            departures.entry(way.source()).or_default().push(forward);

            if !way.one_way {
                let backward = DirectedWay::backward(way.id);
                traversals.push((backward, way.source()));
                departures.entry(way.target()).or_default().push(backward);
            }
        }

        for (traversal, _) in &traversals {
            graph.add_node(*traversal);
        }

        for (traversal, end) in traversals {
            for next in departures.get(&end).into_iter().flatten() {
                graph.add_edge(traversal, *next, ());
            }
        }

        graph
    }

    fn bounds(nodes: &FxHashMap<NodeId, RoadNode>) -> Rect {
        let (min_x, min_y, max_x, max_y) = nodes.values().fold(
            (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
            |(min_x, min_y, max_x, max_y), node| {
                let (x, y) = node.position.x_y();
                (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
            },
        );

        Rect::new(coord! { x: min_x, y: min_y }, coord! { x: max_x, y: max_y })
    }
}
