use crate::graph::{NodeId, WayId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("the road network has no ways")]
    Empty,

    #[error("node {0} is declared more than once")]
    DuplicateNode(NodeId),

    #[error("way {0} is declared more than once")]
    DuplicateWay(WayId),

    #[error("way {way} references unknown node {node}")]
    UnknownNode { way: WayId, node: NodeId },

    #[error("way {0} must reference at least two nodes")]
    DegenerateWay(WayId),

    #[error("node {0} has a non-finite position")]
    InvalidPosition(NodeId),
}
