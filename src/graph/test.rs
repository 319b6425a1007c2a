use crate::fixture;
use crate::graph::*;
use approx::assert_relative_eq;
use trajmatch_fixtures::{crossroads, one_way_road};
use trajmatch_geo::DistanceFunction;

#[test]
fn rejects_invalid_networks() {
    let empty = RoadNetworkGraph::builder(DistanceFunction::Euclidean)
        .node(1, 0.0, 0.0)
        .build();
    assert_eq!(empty.unwrap_err(), GraphError::Empty);

    let unknown = RoadNetworkGraph::builder(DistanceFunction::Euclidean)
        .node(1, 0.0, 0.0)
        .way(7, [1, 2], false)
        .build();
    assert_eq!(
        unknown.unwrap_err(),
        GraphError::UnknownNode {
            way: WayId(7),
            node: NodeId(2)
        }
    );

    let degenerate = RoadNetworkGraph::builder(DistanceFunction::Euclidean)
        .node(1, 0.0, 0.0)
        .way(7, [1], false)
        .build();
    assert_eq!(degenerate.unwrap_err(), GraphError::DegenerateWay(WayId(7)));

    let duplicate = RoadNetworkGraph::builder(DistanceFunction::Euclidean)
        .node(1, 0.0, 0.0)
        .node(2, 1.0, 0.0)
        .way(7, [1, 2], false)
        .way(7, [2, 1], false)
        .build();
    assert_eq!(duplicate.unwrap_err(), GraphError::DuplicateWay(WayId(7)));
}

#[test]
fn way_geometry_and_offsets() {
    let graph = fixture::graph(one_way_road());
    let way = graph.way(WayId(40)).expect("way exists");

    assert_eq!(way.segment_count(), 2);
    assert_relative_eq!(way.length(), 100.0);
    assert_eq!(way.offsets(), &[0.0, 50.0, 100.0]);
    assert_relative_eq!(way.offset_at(1, 0.5), 75.0);
    assert_eq!(graph.segment_count(), 2);
}

#[test]
fn one_way_traversals() {
    let graph = fixture::graph(one_way_road());

    assert!(graph.is_traversable(DirectedWay::forward(WayId(40))));
    assert!(!graph.is_traversable(DirectedWay::backward(WayId(40))));
    assert_eq!(
        graph.successors(DirectedWay::backward(WayId(40))).count(),
        0
    );
}

#[test]
fn adjacency_between_traversals() {
    let graph = fixture::graph(crossroads());

    let mut next = graph
        .successors(DirectedWay::forward(WayId(10)))
        .collect::<Vec<_>>();
    next.sort();

    // Arriving at the junction at x=100 allows continuing east, turning
    // north, or turning back.
    assert_eq!(
        next,
        vec![
            DirectedWay::backward(WayId(10)),
            DirectedWay::forward(WayId(11)),
            DirectedWay::forward(WayId(12)),
        ]
    );

    assert_eq!(
        graph.end_node(DirectedWay::backward(WayId(14))),
        Some(NodeId(5))
    );
    assert_eq!(
        graph.start_node(DirectedWay::forward(WayId(13))),
        Some(NodeId(4))
    );
}

#[test]
fn bounds_cover_every_node() {
    let graph = fixture::graph(crossroads());
    let bounds = graph.bounds();

    assert_eq!(bounds.min().x, 0.0);
    assert_eq!(bounds.min().y, 0.0);
    assert_eq!(bounds.max().x, 200.0);
    assert_eq!(bounds.max().y, 100.0);
}
