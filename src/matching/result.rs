use crate::transition::{Break, Decoded, DecodedSegment, MatchedState, RankedSequence};
use crate::{TrajectoryId, WayId};

use itertools::Itertools;
use rustc_hash::FxHashSet;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::ops::Range;

/// One unbroken run of matched samples.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedSegment {
    /// The chosen candidate of every retained sample, in order.
    pub states: Vec<MatchedState>,
    /// Ways driven, without consecutive repeats.
    pub ways: Vec<WayId>,
    pub log_probability: f64,
}

/// A complete alternative route through the trajectory.
///
/// Ranks are over candidate sequences, so two ranks may drive the same ways
/// at different positions along them.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRoute {
    pub ways: Vec<WayId>,
    pub log_probability: f64,
    /// Log-probability relative to the best route, so `0` for rank 0 and
    /// negative for the others.
    pub relative_log_probability: f64,
}

/// The outcome of matching one trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub trajectory: TrajectoryId,
    /// The best match, split wherever decoding restarted.
    pub segments: Vec<MatchedSegment>,
    /// Where, and why, each segment after the first begins.
    pub breaks: Vec<Break>,
    /// Indices of samples that had no candidate.
    pub unmatched: Vec<usize>,
    /// Runs of samples that appear to leave the road network.
    pub unmatched_trajectories: Vec<UnmatchedTrajectory>,
    /// Best first. Rank 0 follows [`segments`](Self::segments).
    pub ranked: Vec<RankedRoute>,
}

/// A run of consecutive samples that left the road network, between two
/// matched stretches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmatchedTrajectory {
    pub samples: Range<usize>,
    /// Matched way of the last sample before the run.
    pub before: Option<WayId>,
    /// Matched way of the first sample after the run.
    pub after: Option<WayId>,
}

impl MatchResult {
    /// Assembles a result from decoded segments.
    ///
    /// Ranked routes are the `rank_length` best combinations of one ranked
    /// sequence per segment. `penalty` is added to every rank for the joins
    /// between segments and the dropped samples.
    pub fn new(
        trajectory: TrajectoryId,
        decoded: Decoded,
        unmatched: Vec<usize>,
        penalty: f64,
        rank_length: usize,
    ) -> Self {
        let ranked = rank_routes(&decoded.segments, rank_length, penalty);

        let segments = decoded
            .segments
            .into_iter()
            .filter_map(|segment| segment.ranked.into_iter().next())
            .map(|RankedSequence { states, log_probability }| MatchedSegment {
                ways: crate::transition::route_ways(&states),
                states,
                log_probability,
            })
            .collect();

        MatchResult {
            trajectory,
            segments,
            breaks: decoded.breaks,
            unmatched,
            unmatched_trajectories: vec![],
            ranked,
        }
    }

    /// Grows every break and unmatched sample into the surrounding run of
    /// samples whose closest road lies beyond `max_gap_extension`.
    ///
    /// `nearest` holds the distance from each sample to its closest
    /// candidate, infinite when it had none. Runs of a single sample, and
    /// runs that reach either end of the trajectory, are not reported.
    pub fn with_unmatched_trajectories(mut self, nearest: &[f64], max_gap_extension: f64) -> Self {
        let off_road = |index: usize| nearest.get(index).is_some_and(|d| *d > max_gap_extension);

        let seeds = self
            .breaks
            .iter()
            .map(|b| b.sample)
            .chain(self.unmatched.iter().copied())
            .sorted_unstable()
            .dedup();

        let mut runs: Vec<Range<usize>> = vec![];
        for seed in seeds {
            if runs.last().is_some_and(|run| run.contains(&seed)) {
                continue;
            }

            let mut start = seed;
            while start > 0 && off_road(start - 1) {
                start -= 1;
            }

            let mut end = seed + 1;
            while off_road(end) {
                end += 1;
            }

            match runs.last_mut() {
                Some(run) if run.end >= start => run.end = run.end.max(end),
                _ => runs.push(start..end),
            }
        }

        let ways = self
            .states()
            .map(|state| (state.sample, state.candidate.way))
            .collect::<Vec<_>>();

        self.unmatched_trajectories = runs
            .into_iter()
            .filter(|run| run.len() > 1 && run.start > 0 && run.end < nearest.len())
            .map(|samples| UnmatchedTrajectory {
                before: ways
                    .iter()
                    .rev()
                    .find(|(sample, _)| *sample < samples.start)
                    .map(|(_, way)| *way),
                after: ways
                    .iter()
                    .find(|(sample, _)| *sample >= samples.end)
                    .map(|(_, way)| *way),
                samples,
            })
            .collect();

        self
    }

    /// Every way of the best match, across segments, without consecutive
    /// repeats.
    pub fn ways(&self) -> Vec<WayId> {
        self.segments
            .iter()
            .flat_map(|segment| segment.ways.iter().copied())
            .dedup()
            .collect()
    }

    /// The chosen state of every retained sample, across segments.
    pub fn states(&self) -> impl Iterator<Item = &MatchedState> {
        self.segments.iter().flat_map(|segment| segment.states.iter())
    }

    /// Log-probability of the best match, `-∞` when nothing matched.
    pub fn log_probability(&self) -> f64 {
        self.ranked
            .first()
            .map_or(f64::NEG_INFINITY, |route| route.log_probability)
    }
}

/// One way of choosing a ranked sequence from each segment so far.
struct Combination {
    picks: Vec<usize>,
    log_probability: f64,
}

/// A candidate sum in the merge of two score lists, best first.
struct PairHolder {
    log_probability: f64,
    left: usize,
    right: usize,
}

impl PartialEq for PairHolder {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PairHolder {}

impl PartialOrd for PairHolder {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PairHolder {
    /// Highest score first; equal scores pop the lowest index pair first.
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.log_probability
            .total_cmp(&other.log_probability)
            .then_with(|| (other.left, other.right).cmp(&(self.left, self.right)))
    }
}

/// The `limit` best sums of one entry of `left` with one of `right`, both
/// sorted best first.
fn best_sums(left: &[Combination], right: &[RankedSequence], limit: usize) -> Vec<Combination> {
    let score = |l: usize, r: usize| left[l].log_probability + right[r].log_probability;

    let mut heap = BinaryHeap::new();
    let mut seen = FxHashSet::default();
    let mut merged = Vec::with_capacity(limit);

    if !left.is_empty() && !right.is_empty() {
        heap.push(PairHolder {
            log_probability: score(0, 0),
            left: 0,
            right: 0,
        });
        seen.insert((0, 0));
    }

    while merged.len() < limit {
        let Some(PairHolder { log_probability, left: l, right: r }) = heap.pop() else {
            break;
        };

        let mut picks = left[l].picks.clone();
        picks.push(r);
        merged.push(Combination {
            picks,
            log_probability,
        });

        for (nl, nr) in [(l + 1, r), (l, r + 1)] {
            if nl < left.len() && nr < right.len() && seen.insert((nl, nr)) {
                heap.push(PairHolder {
                    log_probability: score(nl, nr),
                    left: nl,
                    right: nr,
                });
            }
        }
    }

    merged
}

fn rank_routes(segments: &[DecodedSegment], rank_length: usize, penalty: f64) -> Vec<RankedRoute> {
    let segments = segments
        .iter()
        .filter(|segment| !segment.ranked.is_empty())
        .collect::<Vec<_>>();

    if segments.is_empty() {
        return vec![];
    }

    let root = vec![Combination {
        picks: vec![],
        log_probability: 0.0,
    }];
    let combinations = segments.iter().fold(root, |combinations, segment| {
        best_sums(&combinations, &segment.ranked, rank_length.max(1))
    });

    let best = combinations
        .first()
        .map_or(0.0, |combination| combination.log_probability);

    combinations
        .into_iter()
        .map(|Combination { picks, log_probability }| RankedRoute {
            ways: segments
                .iter()
                .zip(picks)
                .flat_map(|(segment, pick)| segment.ranked[pick].ways())
                .dedup()
                .collect(),
            log_probability: log_probability + penalty,
            relative_log_probability: log_probability - best,
        })
        .collect()
}
