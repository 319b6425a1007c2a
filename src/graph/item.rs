use geo::Point;
use std::fmt::{Display, Formatter};

/// Identifier of a [`RoadNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub i64);

/// Identifier of a [`RoadWay`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WayId(pub i64);

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for WayId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoadNode {
    pub id: NodeId,
    pub position: Point,
}

/// A polyline of nodes that vehicles drive along.
///
/// Offsets along a way are measured in metres from its first node. A way is
/// always traversable in node order, and in reverse unless it is one-way.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadWay {
    pub id: WayId,
    pub nodes: Vec<NodeId>,
    pub one_way: bool,

    pub(crate) geometry: Vec<Point>,
    pub(crate) offsets: Vec<f64>,
}

impl RoadWay {
    #[inline]
    pub fn source(&self) -> NodeId {
        self.nodes[0]
    }

    #[inline]
    pub fn target(&self) -> NodeId {
        self.nodes[self.nodes.len() - 1]
    }

    /// Length of the way, in metres.
    #[inline]
    pub fn length(&self) -> f64 {
        self.offsets[self.offsets.len() - 1]
    }

    pub fn geometry(&self) -> &[Point] {
        &self.geometry
    }

    /// Cumulative offset, in metres, of every vertex of the way.
    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    /// The `(index, source, target)` of every segment of the way.
    pub fn segments(&self) -> impl Iterator<Item = (usize, Point, Point)> + '_ {
        self.geometry
            .windows(2)
            .enumerate()
            .map(|(index, pair)| (index, pair[0], pair[1]))
    }

    pub fn segment_count(&self) -> usize {
        self.geometry.len() - 1
    }

    /// Offset, in metres, of the point at `fraction` along segment `segment`.
    pub fn offset_at(&self, segment: usize, fraction: f64) -> f64 {
        let start = self.offsets[segment];
        let end = self.offsets[segment + 1];
        start + (end - start) * fraction
    }

    pub fn traversable(&self, direction: Direction) -> bool {
        direction == Direction::Forward || !self.one_way
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    /// In node order.
    Forward,
    /// Against node order.
    Backward,
}

impl Direction {
    pub fn reverse(&self) -> Direction {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// One direction of travel along a [`RoadWay`].
///
/// The road network's adjacency is expressed between traversals: a
/// traversal leads into every traversal departing from the node it ends at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DirectedWay {
    pub way: WayId,
    pub direction: Direction,
}

impl DirectedWay {
    pub const fn forward(way: WayId) -> Self {
        DirectedWay {
            way,
            direction: Direction::Forward,
        }
    }

    pub const fn backward(way: WayId) -> Self {
        DirectedWay {
            way,
            direction: Direction::Backward,
        }
    }

    #[inline]
    pub fn reversed(&self) -> Self {
        DirectedWay {
            way: self.way,
            direction: self.direction.reverse(),
        }
    }
}

impl From<i64> for NodeId {
    fn from(value: i64) -> Self {
        NodeId(value)
    }
}

impl From<i64> for WayId {
    fn from(value: i64) -> Self {
        WayId(value)
    }
}
