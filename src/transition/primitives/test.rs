use crate::fixture;
use crate::transition::*;
use crate::{MatchConfig, RoadNetworkGraph, WayId};

use approx::assert_relative_eq;
use geo::Point;
use trajmatch_fixtures::{crossroads, one_way_road};

fn on(graph: &RoadNetworkGraph, way: i64, offset: f64) -> Candidate {
    let way = graph.way(WayId(way)).expect("way exists");
    let (start, end) = (way.geometry()[0], way.geometry()[way.geometry().len() - 1]);
    let fraction = offset / way.length();

    Candidate {
        way: way.id,
        segment: 0,
        position: Point::new(
            start.x() + (end.x() - start.x()) * fraction,
            start.y() + (end.y() - start.y()) * fraction,
        ),
        offset,
        distance: 0.0,
    }
}

fn budget(metres: f64) -> RouteBudget {
    RouteBudget {
        max_distance: metres,
        max_expansions: 10_000,
    }
}

fn ways(path: &RoadPath) -> Vec<i64> {
    path.ways.iter().map(|way| way.0).collect()
}

#[test]
fn route_through_junction() {
    let graph = fixture::graph(crossroads());
    let search = RouteSearch::new(&graph, 0.0);

    let path = search
        .route(&on(&graph, 10, 20.0), &on(&graph, 11, 2.0), &budget(500.0))
        .expect("reachable");

    assert_relative_eq!(path.length, 82.0);
    assert_eq!(ways(&path), vec![10, 11]);
}

#[test]
fn route_along_one_way() {
    let graph = fixture::graph(crossroads());
    let search = RouteSearch::new(&graph, 0.0);

    let forward = search
        .route(&on(&graph, 10, 20.0), &on(&graph, 10, 80.0), &budget(500.0))
        .expect("reachable");
    assert_relative_eq!(forward.length, 60.0);
    assert_eq!(ways(&forward), vec![10]);

    let backward = search
        .route(&on(&graph, 10, 80.0), &on(&graph, 10, 20.0), &budget(500.0))
        .expect("two-way");
    assert_relative_eq!(backward.length, 60.0);
}

#[test]
fn one_way_blocks_reverse_travel() {
    let graph = fixture::graph(one_way_road());
    let search = RouteSearch::new(&graph, 0.0);

    assert!(
        search
            .route(&on(&graph, 40, 80.0), &on(&graph, 40, 20.0), &budget(10_000.0))
            .is_none()
    );
    assert!(
        search
            .route(&on(&graph, 40, 20.0), &on(&graph, 40, 80.0), &budget(10_000.0))
            .is_some()
    );
}

#[test]
fn budget_limits_distance_and_expansions() {
    let graph = fixture::graph(crossroads());
    let search = RouteSearch::new(&graph, 0.0);
    let (source, target) = (on(&graph, 10, 20.0), on(&graph, 13, 50.0));

    let path = search
        .route(&source, &target, &budget(500.0))
        .expect("reachable");
    assert_relative_eq!(path.length, 230.0);
    assert_eq!(ways(&path), vec![10, 12, 13]);

    assert!(search.route(&source, &target, &budget(229.0)).is_none());

    let starved = RouteBudget {
        max_distance: 500.0,
        max_expansions: 1,
    };
    assert!(search.route(&source, &target, &starved).is_none());
}

#[test]
fn routes_to_many_targets() {
    let graph = fixture::graph(crossroads());
    let search = RouteSearch::new(&graph, 0.0);

    let targets = [
        on(&graph, 11, 50.0),
        on(&graph, 12, 50.0),
        on(&graph, 14, 50.0),
    ];
    let routes = search.routes(&on(&graph, 10, 50.0), &targets, &budget(500.0));

    let lengths = routes
        .iter()
        .map(|route| route.as_ref().map(|path| path.length))
        .collect::<Vec<_>>();

    // Way 14 runs from (200, 100) down to (200, 0), so its midpoint is
    // reached through way 11 then backwards along 14.
    assert_eq!(lengths, vec![Some(100.0), Some(100.0), Some(200.0)]);
    assert_eq!(
        ways(routes[2].as_ref().expect("reachable")),
        vec![10, 11, 14]
    );
}

#[test_log::test]
fn u_turn_penalty_ignores_turns_onto_other_ways() {
    let graph = fixture::graph(crossroads());

    // Back along way 13 to node 4, then down way 12: a sharp turn, but
    // onto a different way.
    let source = on(&graph, 13, 10.0);
    let target = on(&graph, 12, 50.0);

    let free = RouteSearch::new(&graph, 0.0)
        .route(&source, &target, &budget(1_000.0))
        .expect("reachable");
    let penalised = RouteSearch::new(&graph, 500.0)
        .route(&source, &target, &budget(1_000.0))
        .expect("reachable");

    assert_relative_eq!(free.length, 60.0);
    assert_eq!(free, penalised);
    assert_eq!(ways(&penalised), vec![13, 12]);
}

#[test]
fn budget_between_samples() {
    let config = MatchConfig::default();

    let roomy = RouteBudget::between(&config, 100.0, 10.0);
    assert_relative_eq!(roomy.max_distance, 500.0);

    let tight = RouteBudget::between(&config, 100.0, 1.0);
    assert_relative_eq!(tight.max_distance, 100.0);

    let detour = RouteBudget::between(&config, 20.0, 60.0);
    assert_relative_eq!(detour.max_distance, 160.0);
    assert_eq!(detour.max_expansions, config.max_expansions);
}
