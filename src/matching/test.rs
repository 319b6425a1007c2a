use crate::fixture;
use crate::transition::{
    Break, BreakReason, Candidate, Decoded, DecodedSegment, MatchError, MatchedState,
    RankedSequence,
};
use crate::{
    BetaPolicy, BreakPolicy, ConfigError, DistanceFunction, GapPolicy, HmmMatcher,
    MapMatchingAlgorithm, MatchConfig, MatchResult, RoadNetworkGraph, RoadNetworkIndex, Sample,
    UnmatchedTrajectory, WayId,
};

use approx::assert_relative_eq;
use geo::Point;
use trajmatch_fixtures::{
    city_grid, crossroads, disconnected, geographic_grid, grid_trajectories, parallel_roads,
    straight_road,
};

fn ways(result: &MatchResult) -> Vec<i64> {
    result.ways().into_iter().map(|WayId(id)| id).collect()
}

fn matcher<'a>(
    graph: &'a RoadNetworkGraph,
    index: &'a RoadNetworkIndex,
    config: MatchConfig,
) -> HmmMatcher<'a> {
    HmmMatcher::new(graph, index, config).expect("valid configuration")
}

#[test_log::test]
fn closer_road_wins() {
    let (graph, index) = fixture::indexed(parallel_roads());
    let matcher = matcher(&graph, &index, MatchConfig::default());

    let trajectory = fixture::trajectory(1, &[(10.0, 4.0, 0.0), (50.0, 5.0, 10.0), (90.0, 4.0, 20.0)]);
    let result = matcher.offline_match(&trajectory).expect("matches");

    assert_eq!(ways(&result), vec![1]);
    assert_eq!(result.segments.len(), 1);
    assert!(result.breaks.is_empty());
    assert!(result.unmatched.is_empty());
    assert_relative_eq!(result.log_probability(), result.segments[0].log_probability);
}

#[test]
fn equidistant_roads_resolve_to_lowest_way() {
    let (graph, index) = fixture::indexed(parallel_roads());
    let matcher = matcher(&graph, &index, MatchConfig::default());

    let trajectory = fixture::trajectory(1, &[(10.0, 10.0, 0.0), (90.0, 10.0, 10.0)]);
    let result = matcher.offline_match(&trajectory).expect("matches");

    assert_eq!(ways(&result), vec![1]);
}

fn junction() -> Vec<(f64, f64, f64)> {
    vec![(50.0, 3.0, 0.0), (100.0, 8.0, 10.0), (150.0, 3.0, 20.0)]
}

#[test_log::test]
fn tight_beta_stays_on_main_road() {
    let (graph, index) = fixture::indexed(crossroads());
    let config = MatchConfig {
        beta: BetaPolicy::Fixed(1.0),
        ..MatchConfig::default()
    };

    let result = matcher(&graph, &index, config)
        .offline_match(&fixture::trajectory(1, &junction()))
        .expect("matches");

    assert_eq!(ways(&result), vec![10, 11]);
}

#[test]
fn loose_beta_follows_the_samples() {
    let (graph, index) = fixture::indexed(crossroads());
    let config = MatchConfig {
        beta: BetaPolicy::Fixed(1_000.0),
        ..MatchConfig::default()
    };

    let result = matcher(&graph, &index, config)
        .offline_match(&fixture::trajectory(1, &junction()))
        .expect("matches");

    // The middle sample sits exactly on the side street.
    assert_eq!(ways(&result), vec![10, 12, 11]);
}

#[test]
fn ranked_alternatives() {
    let (graph, index) = fixture::indexed(crossroads());
    let config = MatchConfig {
        beta: BetaPolicy::Fixed(1.0),
        rank_length: 3,
        ..MatchConfig::default()
    };

    let result = matcher(&graph, &index, config)
        .offline_match(&fixture::trajectory(1, &junction()))
        .expect("matches");

    assert_eq!(result.ranked.len(), 3);
    assert_eq!(result.ranked[0].relative_log_probability, 0.0);
    assert_eq!(
        result.ranked[0].ways,
        result.ways(),
        "rank 0 is the best match"
    );
    assert!(
        result
            .ranked
            .windows(2)
            .all(|pair| pair[0].log_probability >= pair[1].log_probability)
    );
    assert!(result.ranked.iter().all(|route| route.relative_log_probability <= 0.0));
}

#[test]
fn ranks_may_share_ways() {
    let (graph, index) = fixture::indexed(crossroads());
    let config = MatchConfig {
        rank_length: 3,
        ..MatchConfig::default()
    };

    // The middle sample is equally close to the ends of ways 10, 11 and 12.
    let trajectory = fixture::trajectory(1, &[(50.0, -3.0, 0.0), (100.0, -3.0, 10.0), (150.0, -3.0, 20.0)]);
    let result = matcher(&graph, &index, config)
        .offline_match(&trajectory)
        .expect("matches");

    assert_eq!(result.ranked.len(), 3);
    assert!(result.ranked.iter().all(|route| route.relative_log_probability == 0.0));

    let main_road = result
        .ranked
        .iter()
        .filter(|route| route.ways == vec![WayId(10), WayId(11)])
        .count();
    assert_eq!(main_road, 2);
}

fn sequence(sample: usize, way: i64, log_probability: f64) -> RankedSequence {
    RankedSequence {
        states: vec![MatchedState {
            sample,
            candidate: Candidate {
                way: WayId(way),
                segment: 0,
                position: Point::new(0.0, 0.0),
                offset: 0.0,
                distance: 0.0,
            },
            path: None,
        }],
        log_probability,
    }
}

#[test]
fn ranks_combine_best_sums_across_segments() {
    let decoded = Decoded {
        segments: vec![
            DecodedSegment {
                ranked: vec![sequence(0, 10, 0.0), sequence(0, 11, -1.0), sequence(0, 12, -2.0)],
            },
            DecodedSegment {
                ranked: vec![sequence(1, 20, 0.0), sequence(1, 21, -0.1), sequence(1, 22, -5.0)],
            },
        ],
        breaks: vec![Break {
            sample: 1,
            reason: BreakReason::Gap,
        }],
    };

    let result = MatchResult::new(1, decoded.clone(), vec![], -3.0, 3);

    let relative = result
        .ranked
        .iter()
        .map(|route| route.relative_log_probability)
        .collect::<Vec<_>>();
    assert_eq!(relative, vec![0.0, -0.1, -1.0]);

    let ways = result.ranked.iter().map(|route| route.ways.clone()).collect::<Vec<_>>();
    assert_eq!(
        ways,
        vec![
            vec![WayId(10), WayId(20)],
            vec![WayId(10), WayId(21)],
            vec![WayId(11), WayId(20)],
        ]
    );
    assert_eq!(result.log_probability(), -3.0);

    // Fewer combinations exist than ranks were asked for.
    let short = Decoded {
        segments: vec![
            DecodedSegment {
                ranked: vec![sequence(0, 10, 0.0)],
            },
            decoded.segments[1].clone(),
        ],
        ..decoded
    };
    assert_eq!(MatchResult::new(1, short, vec![], 0.0, 5).ranked.len(), 3);
}

fn outlier() -> Vec<(f64, f64, f64)> {
    vec![
        (20.0, 2.0, 0.0),
        (100.0, 2.0, 10.0),
        (150.0, 500.0, 20.0),
        (250.0, 2.0, 30.0),
        (330.0, 2.0, 40.0),
    ]
}

#[test_log::test]
fn outlier_is_bridged() {
    let (graph, index) = fixture::indexed(straight_road());
    let matcher = matcher(&graph, &index, MatchConfig::default());

    let result = matcher
        .offline_match(&fixture::trajectory(1, &outlier()))
        .expect("matches");

    assert_eq!(ways(&result), vec![20, 21]);
    assert_eq!(result.unmatched, vec![2]);
    assert_eq!(
        result.states().map(|state| state.sample).collect::<Vec<_>>(),
        vec![0, 1, 3, 4]
    );

    // The dropped sample is charged as if matched at the search radius.
    assert!(result.log_probability() < result.segments[0].log_probability);

    // A lone outlier is noise, not a stretch off the network.
    assert!(result.unmatched_trajectories.is_empty());
}

#[test_log::test]
fn off_road_stretch_is_reported() {
    let (graph, index) = fixture::indexed(straight_road());
    let matcher = matcher(&graph, &index, MatchConfig::default());

    let trajectory = fixture::trajectory(
        1,
        &[
            (20.0, 2.0, 0.0),
            (100.0, 2.0, 10.0),
            (140.0, 30.0, 15.0),
            (160.0, 300.0, 20.0),
            (200.0, 300.0, 25.0),
            (260.0, 2.0, 35.0),
            (330.0, 2.0, 40.0),
        ],
    );
    let result = matcher.offline_match(&trajectory).expect("matches");

    assert_eq!(result.unmatched, vec![3, 4]);
    assert_eq!(
        result.unmatched_trajectories,
        vec![UnmatchedTrajectory {
            samples: 2..5,
            before: Some(WayId(20)),
            after: Some(WayId(21)),
        }]
    );

    let online = matcher.online_match(&trajectory).expect("matches");
    assert_eq!(online.unmatched_trajectories, result.unmatched_trajectories);
}

#[test]
fn stretch_ending_the_trajectory_is_not_reported() {
    let (graph, index) = fixture::indexed(straight_road());
    let matcher = matcher(&graph, &index, MatchConfig::default());

    let trajectory = fixture::trajectory(
        1,
        &[
            (20.0, 2.0, 0.0),
            (100.0, 2.0, 10.0),
            (140.0, 30.0, 15.0),
            (160.0, 300.0, 20.0),
        ],
    );
    let result = matcher.offline_match(&trajectory).expect("matches");

    assert_eq!(result.unmatched, vec![3]);
    assert!(result.unmatched_trajectories.is_empty());
}

#[test]
fn outlier_terminates() {
    let (graph, index) = fixture::indexed(straight_road());
    let config = MatchConfig {
        gap_policy: GapPolicy::Terminate,
        ..MatchConfig::default()
    };

    assert_eq!(
        matcher(&graph, &index, config)
            .offline_match(&fixture::trajectory(1, &outlier()))
            .unwrap_err(),
        MatchError::UnmatchableSample {
            index: 2,
            radius: 50.0
        }
    );
}

fn across_the_gap() -> Vec<(f64, f64, f64)> {
    vec![
        (50.0, 1.0, 0.0),
        (90.0, 1.0, 10.0),
        (210.0, 1.0, 20.0),
        (280.0, 1.0, 30.0),
    ]
}

#[test_log::test]
fn unreachable_step_restarts() {
    let (graph, index) = fixture::indexed(disconnected());
    let matcher = matcher(&graph, &index, MatchConfig::default());

    let result = matcher
        .offline_match(&fixture::trajectory(1, &across_the_gap()))
        .expect("restarts");

    assert_eq!(result.segments.len(), 2);
    assert_eq!(
        result.breaks,
        vec![Break {
            sample: 2,
            reason: BreakReason::Unreachable
        }]
    );
    assert_eq!(ways(&result), vec![30, 31]);

    let joined = result.segments[0].log_probability + result.segments[1].log_probability;
    assert!(result.log_probability() < joined);
}

#[test]
fn break_grows_into_unmatched_trajectory() {
    let (graph, index) = fixture::indexed(disconnected());
    let matcher = matcher(&graph, &index, MatchConfig::default());

    // Leaves way 30, crosses open ground, and closes in on way 31.
    let trajectory = fixture::trajectory(
        1,
        &[
            (50.0, 1.0, 0.0),
            (90.0, 1.0, 10.0),
            (150.0, 20.0, 20.0),
            (180.0, 25.0, 25.0),
            (230.0, 1.0, 30.0),
            (280.0, 1.0, 40.0),
        ],
    );
    let result = matcher.offline_match(&trajectory).expect("restarts");

    assert_eq!(
        result.breaks,
        vec![Break {
            sample: 3,
            reason: BreakReason::Unreachable
        }]
    );
    assert_eq!(result.unmatched, vec![2]);
    assert_eq!(
        result.unmatched_trajectories,
        vec![UnmatchedTrajectory {
            samples: 2..4,
            before: Some(WayId(30)),
            after: Some(WayId(31)),
        }]
    );
}

#[test]
fn break_on_the_road_is_not_an_unmatched_trajectory() {
    let (graph, index) = fixture::indexed(disconnected());
    let matcher = matcher(&graph, &index, MatchConfig::default());

    let result = matcher
        .offline_match(&fixture::trajectory(1, &across_the_gap()))
        .expect("restarts");

    assert_eq!(result.breaks.len(), 1);
    assert!(result.unmatched_trajectories.is_empty());
}

#[test]
fn great_circle_network_matches_along_street() {
    let (graph, index) = fixture::indexed_with(
        geographic_grid(6, 6, (13.4, 52.5), 0.001),
        DistanceFunction::GreatCircle,
    );
    let matcher = matcher(&graph, &index, MatchConfig::default());

    // Mid-block along the third east-west street, about 3.3m north of it.
    let trajectory = fixture::trajectory(
        1,
        &[
            (13.4005, 52.50203, 0.0),
            (13.4015, 52.50203, 10.0),
            (13.4025, 52.50203, 20.0),
        ],
    );
    let result = matcher.offline_match(&trajectory).expect("matches");

    assert_eq!(ways(&result), vec![11, 12, 13]);
    for state in result.states() {
        assert_relative_eq!(state.candidate.distance, 3.34, epsilon = 0.05);
    }

    let online = matcher.online_match(&trajectory).expect("matches");
    assert_eq!(online.segments, result.segments);
}

#[test]
fn unreachable_step_fails() {
    let (graph, index) = fixture::indexed(disconnected());
    let config = MatchConfig {
        break_policy: BreakPolicy::Fail,
        ..MatchConfig::default()
    };

    assert_eq!(
        matcher(&graph, &index, config)
            .offline_match(&fixture::trajectory(1, &across_the_gap()))
            .unwrap_err(),
        MatchError::DecodeBroken { index: 2 }
    );
}

#[test]
fn rejects_bad_input() {
    let (graph, index) = fixture::indexed(straight_road());
    let matcher = matcher(&graph, &index, MatchConfig::default());

    let unordered = fixture::trajectory(7, &[(10.0, 0.0, 0.0), (20.0, 0.0, 5.0), (30.0, 0.0, 5.0)]);
    assert_eq!(
        matcher.offline_match(&unordered).unwrap_err(),
        MatchError::UnorderedSamples {
            trajectory: 7,
            index: 2
        }
    );
    assert_eq!(
        matcher.online_match(&unordered).unwrap_err(),
        MatchError::UnorderedSamples {
            trajectory: 7,
            index: 2
        }
    );

    let empty = fixture::trajectory(8, &[]);
    assert_eq!(
        matcher.offline_match(&empty).unwrap_err(),
        MatchError::EmptyInput(8)
    );
    assert_eq!(
        matcher.online_session(8).finish().unwrap_err(),
        MatchError::EmptyInput(8)
    );
}

#[test]
fn rejects_invalid_configuration() {
    let (graph, index) = fixture::indexed(straight_road());
    let config = MatchConfig {
        sigma: 0.0,
        ..MatchConfig::default()
    };

    assert_eq!(
        HmmMatcher::new(&graph, &index, config).err(),
        Some(ConfigError::NonPositive {
            field: "sigma",
            value: 0.0
        })
    );
}

#[test]
fn single_sample() {
    let (graph, index) = fixture::indexed(parallel_roads());
    let matcher = matcher(&graph, &index, MatchConfig::default());

    let result = matcher
        .offline_match(&fixture::trajectory(1, &[(40.0, 17.0, 0.0)]))
        .expect("matches");

    assert_eq!(ways(&result), vec![2]);
    assert!(result.segments[0].states[0].path.is_none());
}

#[test]
fn online_agrees_with_offline() {
    let scenarios = [
        (parallel_roads(), vec![(10.0, 4.0, 0.0), (50.0, 5.0, 10.0), (90.0, 4.0, 20.0)]),
        (crossroads(), junction()),
        (straight_road(), outlier()),
        (disconnected(), across_the_gap()),
    ];

    for (network, samples) in scenarios {
        let (graph, index) = fixture::indexed(network);
        let matcher = matcher(&graph, &index, MatchConfig::default());
        let trajectory = fixture::trajectory(1, &samples);

        let offline = matcher.offline_match(&trajectory).expect("matches");
        let online = matcher.online_match(&trajectory).expect("matches");

        assert_eq!(online.ways(), offline.ways());
        assert_eq!(online.segments, offline.segments);
        assert_eq!(online.breaks, offline.breaks);
        assert_eq!(online.unmatched, offline.unmatched);
        assert_eq!(online.unmatched_trajectories, offline.unmatched_trajectories);
        assert_relative_eq!(online.log_probability(), offline.log_probability());
    }
}

#[test_log::test]
fn online_session_reports_progress() {
    let (graph, index) = fixture::indexed(straight_road());
    let matcher = matcher(&graph, &index, MatchConfig::default());
    let mut session = matcher.online_session(3);

    for (pushed, (x, y, time)) in outlier().into_iter().enumerate() {
        session.push(Sample::new(x, y, time)).expect("ordered samples");
        assert_eq!(session.len(), pushed + 1);

        let retained = (0..=pushed).filter(|index| *index != 2).count();
        assert_eq!(session.best_path().len(), retained);
    }

    assert_eq!(session.unmatched(), &[2]);
    assert_eq!(session.best_ways(), vec![WayId(20), WayId(21)]);

    assert_eq!(
        session.push(Sample::new(400.0, 0.0, 40.0)).unwrap_err(),
        MatchError::UnorderedSamples {
            trajectory: 3,
            index: 5
        }
    );

    let result = session.finish().expect("matches");
    assert_eq!(result.trajectory, 3);
    assert_eq!(ways(&result), vec![20, 21]);
}

#[test]
fn matching_is_deterministic() {
    let (graph, index) = fixture::indexed(city_grid(6, 6, 100.0));
    let matcher = matcher(
        &graph,
        &index,
        MatchConfig {
            rank_length: 2,
            ..MatchConfig::default()
        },
    );

    for trajectory in fixture::trajectories(grid_trajectories(20, 6, 6, 6, 100.0, 8.0, 11)) {
        let first = matcher.offline_match(&trajectory);
        let second = matcher.offline_match(&trajectory);
        assert_eq!(first, second);
    }
}

#[test]
fn chosen_candidates_come_from_their_step() {
    let (graph, index) = fixture::indexed(city_grid(6, 6, 100.0));
    let matcher = matcher(&graph, &index, MatchConfig::default());

    for trajectory in fixture::trajectories(grid_trajectories(10, 8, 6, 6, 100.0, 10.0, 5)) {
        let lattice = matcher.lattice(&trajectory).expect("builds");
        let result = matcher.offline_match(&trajectory).expect("matches");

        for state in result.states() {
            let step = lattice
                .steps
                .iter()
                .find(|step| step.index == state.sample)
                .expect("every state has a step");

            assert!(step.candidates.contains(&state.candidate));
            assert!(state.candidate.distance <= matcher.config().search_radius);
        }
    }
}
