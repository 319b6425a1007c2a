use crate::graph::{DirectedWay, Direction, GraphBuilder, NodeId, RoadNode, RoadWay, WayId};

use geo::Rect;
use petgraph::prelude::DiGraphMap;
use rustc_hash::{FxHashMap, FxHasher};
use std::fmt::{Debug, Formatter};
use std::hash::BuildHasherDefault;
use trajmatch_geo::DistanceFunction;

pub type GraphStructure = DiGraphMap<DirectedWay, (), BuildHasherDefault<FxHasher>>;

/// The road network.
///
/// Holds every [`RoadNode`] and [`RoadWay`], and the directed adjacency
/// between way traversals. Once built the network is immutable, so a
/// single instance can be shared by reference between matching threads.
///
/// ```rust
/// use trajmatch::{DistanceFunction, RoadNetworkGraph, WayId, DirectedWay};
///
/// let graph = RoadNetworkGraph::builder(DistanceFunction::Euclidean)
///     .node(1, 0.0, 0.0)
///     .node(2, 100.0, 0.0)
///     .node(3, 100.0, 100.0)
///     .way(1, [1, 2], false)
///     .way(2, [2, 3], true)
///     .build()
///     .expect("valid network");
///
/// let next = graph
///     .successors(DirectedWay::forward(WayId(1)))
///     .collect::<Vec<_>>();
///
/// assert!(next.contains(&DirectedWay::forward(WayId(2))));
/// ```
pub struct RoadNetworkGraph {
    pub(crate) distance: DistanceFunction,
    pub(crate) nodes: FxHashMap<NodeId, RoadNode>,
    pub(crate) ways: Vec<RoadWay>,
    pub(crate) lookup: FxHashMap<WayId, usize>,
    pub(crate) graph: GraphStructure,
    pub(crate) bounds: Rect,
}

impl Debug for RoadNetworkGraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RoadNetworkGraph with Nodes: {}, Ways: {}",
            self.nodes.len(),
            self.ways.len()
        )
    }
}

impl RoadNetworkGraph {
    pub fn builder(distance: DistanceFunction) -> GraphBuilder {
        GraphBuilder::new(distance)
    }

    #[inline]
    pub fn distance_fn(&self) -> DistanceFunction {
        self.distance
    }

    /// Bounding rectangle of every node, in coordinate units.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&RoadNode> {
        self.nodes.get(&id)
    }

    #[inline]
    pub fn way(&self, id: WayId) -> Option<&RoadWay> {
        self.lookup.get(&id).map(|index| &self.ways[*index])
    }

    /// Every way, ordered by id.
    pub fn ways(&self) -> impl Iterator<Item = &RoadWay> {
        self.ways.iter()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &RoadNode> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn way_count(&self) -> usize {
        self.ways.len()
    }

    pub fn segment_count(&self) -> usize {
        self.ways.iter().map(RoadWay::segment_count).sum()
    }

    /// The node a traversal departs from.
    pub fn start_node(&self, traversal: DirectedWay) -> Option<NodeId> {
        self.way(traversal.way).map(|way| match traversal.direction {
            Direction::Forward => way.source(),
            Direction::Backward => way.target(),
        })
    }

    /// The node a traversal arrives at.
    pub fn end_node(&self, traversal: DirectedWay) -> Option<NodeId> {
        self.start_node(traversal.reversed())
    }

    /// Whether the traversal is allowed at all, given one-way restrictions.
    pub fn is_traversable(&self, traversal: DirectedWay) -> bool {
        self.graph.contains_node(traversal)
    }

    /// Every traversal that may follow `traversal`, including turning back
    /// onto the same way when it is two-way.
    pub fn successors(&self, traversal: DirectedWay) -> impl Iterator<Item = DirectedWay> + '_ {
        self.graph
            .contains_node(traversal)
            .then(|| self.graph.neighbors(traversal))
            .into_iter()
            .flatten()
    }
}
