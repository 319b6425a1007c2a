use crate::{
    DistanceFunction, IndexConfig, RoadNetworkGraph, RoadNetworkIndex, Sample, Trajectory,
};
use trajmatch_fixtures::{NetworkFixture, TrajectoryFixture};

pub(crate) fn graph(network: NetworkFixture) -> RoadNetworkGraph {
    graph_with(network, DistanceFunction::Euclidean)
}

pub(crate) fn graph_with(network: NetworkFixture, distance: DistanceFunction) -> RoadNetworkGraph {
    let builder = network.nodes.iter().fold(
        RoadNetworkGraph::builder(distance),
        |builder, (id, x, y)| builder.node(*id, *x, *y),
    );

    network
        .ways
        .iter()
        .fold(builder, |builder, way| {
            builder.way(way.id, way.nodes.iter().copied(), way.one_way)
        })
        .build()
        .expect("fixture networks are valid")
}

pub(crate) fn indexed(network: NetworkFixture) -> (RoadNetworkGraph, RoadNetworkIndex) {
    indexed_with(network, DistanceFunction::Euclidean)
}

pub(crate) fn indexed_with(
    network: NetworkFixture,
    distance: DistanceFunction,
) -> (RoadNetworkGraph, RoadNetworkIndex) {
    let graph = graph_with(network, distance);
    let index = RoadNetworkIndex::build(&graph, &IndexConfig::default())
        .expect("fixture networks index");

    (graph, index)
}

pub(crate) fn trajectory(id: u64, samples: &[(f64, f64, f64)]) -> Trajectory {
    Trajectory::new(
        id,
        samples
            .iter()
            .map(|(x, y, time)| Sample::new(*x, *y, *time))
            .collect(),
    )
}

pub(crate) fn trajectories(fixtures: Vec<TrajectoryFixture>) -> Vec<Trajectory> {
    fixtures
        .into_iter()
        .map(|fixture| trajectory(fixture.id, &fixture.samples))
        .collect()
}
