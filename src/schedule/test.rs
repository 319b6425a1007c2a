use crate::fixture;
use crate::transition::MatchError;
use crate::{
    BatchOutcome, Cancellation, ConfigError, HmmMatcher, MapMatchingAlgorithm, MatchConfig,
    ParallelMatchScheduler, Trajectory,
};

use std::collections::BTreeSet;
use trajmatch_fixtures::{city_grid, grid_trajectories};

fn workload(count: usize) -> Vec<Trajectory> {
    fixture::trajectories(grid_trajectories(count, 8, 8, 8, 100.0, 5.0, 42))
}

fn with_matcher(test: impl FnOnce(&HmmMatcher)) {
    let (graph, index) = fixture::indexed(city_grid(8, 8, 100.0));
    let matcher =
        HmmMatcher::new(&graph, &index, MatchConfig::default()).expect("valid configuration");

    test(&matcher)
}

#[test_log::test]
fn batch_is_independent_of_worker_count() {
    with_matcher(|matcher| {
        let trajectories = workload(1_000);

        let sequential = ParallelMatchScheduler::new(matcher, 1)
            .expect("one worker")
            .batch(&trajectories);
        let parallel = ParallelMatchScheduler::new(matcher, 8)
            .expect("eight workers")
            .batch(&trajectories);

        assert_eq!(sequential.results.len() + sequential.failures.len(), 1_000);
        assert_eq!(sequential, parallel);
    });
}

#[test]
fn batch_keeps_submission_order() {
    with_matcher(|matcher| {
        let mut trajectories = workload(64);
        trajectories.reverse();

        let outcome = matcher.batch_match(&trajectories, 4).expect("valid workers");
        let ids = outcome
            .results
            .iter()
            .map(|result| result.trajectory)
            .collect::<Vec<_>>();

        assert!(outcome.failures.is_empty());
        assert_eq!(ids, (0..64u64).rev().collect::<Vec<_>>());

        for (trajectory, result) in trajectories.iter().zip(&outcome.results) {
            assert_eq!(
                Ok(result),
                matcher.offline_match(trajectory).as_ref(),
                "trajectory {}",
                trajectory.id
            );
        }
    });
}

#[test_log::test]
fn failures_are_isolated() {
    with_matcher(|matcher| {
        let mut trajectories = workload(10);
        trajectories.insert(3, Trajectory::new(100, vec![]));
        trajectories.insert(7, fixture::trajectory(101, &[(50.0, 0.0, 5.0), (60.0, 0.0, 1.0)]));
        trajectories.push(fixture::trajectory(102, &[(5_000.0, 5_000.0, 0.0)]));

        let BatchOutcome { results, failures } =
            matcher.batch_match(&trajectories, 3).expect("valid workers");

        assert_eq!(results.len(), 10);
        assert_eq!(
            failures
                .iter()
                .map(|failure| (failure.trajectory, failure.error.clone()))
                .collect::<Vec<_>>(),
            vec![
                (100, MatchError::EmptyInput(100)),
                (
                    101,
                    MatchError::UnorderedSamples {
                        trajectory: 101,
                        index: 1
                    }
                ),
                (
                    102,
                    MatchError::UnmatchableSample {
                        index: 0,
                        radius: 50.0
                    }
                ),
            ]
        );
    });
}

#[test_log::test]
fn stream_delivers_every_outcome() {
    with_matcher(|matcher| {
        let trajectories = workload(200);
        let scheduler = ParallelMatchScheduler::new(matcher, 4).expect("four workers");

        let mut seen = BTreeSet::new();
        let summary = scheduler.stream(trajectories.clone(), |outcome| {
            let id = match outcome {
                Ok(result) => result.trajectory,
                Err(failure) => failure.trajectory,
            };
            assert!(seen.insert(id), "trajectory {id} delivered twice");
        });

        assert_eq!(summary.submitted, 200);
        assert_eq!(summary.matched + summary.failed, 200);
        assert_eq!(summary.skipped, 0);
        assert_eq!(seen, trajectories.iter().map(|t| t.id).collect::<BTreeSet<_>>());

        let batch = scheduler.batch(&trajectories);
        assert_eq!(summary.matched, batch.results.len());
    });
}

#[test]
fn cancelled_batch_matches_nothing() {
    with_matcher(|matcher| {
        let cancellation = Cancellation::new();
        let scheduler = ParallelMatchScheduler::new(matcher, 2)
            .expect("two workers")
            .with_cancellation(cancellation.clone());

        cancellation.cancel();
        let outcome = scheduler.batch(&workload(8));

        assert!(outcome.results.is_empty());
        assert!(
            outcome
                .failures
                .iter()
                .all(|failure| failure.error == MatchError::Cancelled(failure.trajectory))
        );
        assert_eq!(outcome.failures.len(), 8);
    });
}

#[test_log::test]
fn cancelled_stream_stops_reading() {
    with_matcher(|matcher| {
        let template = workload(1).remove(0);
        let endless = (0..).map(|id| Trajectory::new(id, template.samples.clone()));

        let cancellation = Cancellation::new();
        let scheduler = ParallelMatchScheduler::new(matcher, 2)
            .expect("two workers")
            .with_cancellation(cancellation.clone());

        let mut delivered = 0;
        let summary = scheduler.stream(endless, |_| {
            delivered += 1;
            if delivered == 5 {
                cancellation.cancel();
            }
        });

        assert!(summary.submitted >= 5);
        assert!(summary.submitted < 100);
        assert_eq!(
            summary.submitted,
            summary.matched + summary.failed + summary.skipped
        );
        assert_eq!(delivered, summary.matched + summary.failed);
    });
}

#[test]
fn rejects_invalid_worker_counts() {
    with_matcher(|matcher| {
        assert_eq!(
            ParallelMatchScheduler::new(matcher, 0).err(),
            Some(ConfigError::InvalidWorkers(0))
        );
        assert!(ParallelMatchScheduler::new(matcher, -2).is_err());
        assert!(ParallelMatchScheduler::new(matcher, -1).is_ok());
        assert!(matcher.batch_match(&[], 0).is_err());
    });
}
