use crate::BreakPolicy;
use crate::transition::{
    Break, BreakReason, Decoded, DecodedSegment, Lattice, MatchError, MatchedState,
    RankedSequence, Solver, TimeStep, Transitions,
};

use log::debug;
use measure_time::debug_time;

#[cfg(feature = "tracing")]
use tracing::Level;

#[derive(Debug, Clone, Copy)]
struct Entry {
    score: f64,
    /// `(state, rank)` in the previous column.
    back: Option<(usize, usize)>,
}

/// Per state, its best partial paths in descending score.
type Column = Vec<Vec<Entry>>;

struct Segment {
    /// Lattice position of the first column.
    first: usize,
    columns: Vec<Column>,
}

/// Offline list-Viterbi decoding.
///
/// Every state keeps up to `rank_length` best partial paths, so the
/// `rank_length` best complete sequences can be recovered. Rank 0 is the
/// classic Viterbi path. Equal scores resolve to the lowest predecessor
/// index, and so to the closest candidate, then the lowest way id.
#[derive(Debug, Clone, Copy)]
pub struct ViterbiSolver {
    rank_length: usize,
    policy: BreakPolicy,
}

impl Default for ViterbiSolver {
    fn default() -> Self {
        ViterbiSolver::new(1, BreakPolicy::Restart)
    }
}

impl ViterbiSolver {
    pub fn new(rank_length: usize, policy: BreakPolicy) -> Self {
        ViterbiSolver {
            rank_length: rank_length.max(1),
            policy,
        }
    }

    fn start(step: &TimeStep) -> Column {
        step.emissions
            .iter()
            .map(|emission| {
                vec![Entry {
                    score: *emission,
                    back: None,
                }]
            })
            .collect()
    }

    fn advance(&self, previous: &Column, step: &TimeStep, transitions: &Transitions) -> Column {
        step.emissions
            .iter()
            .enumerate()
            .map(|(state, emission)| {
                let mut entries = previous
                    .iter()
                    .enumerate()
                    .flat_map(|(from, ranked)| {
                        let transition = transitions.log_probability(from, state);
                        ranked.iter().enumerate().map(move |(rank, entry)| Entry {
                            score: entry.score + transition + emission,
                            back: Some((from, rank)),
                        })
                    })
                    .filter(|entry| entry.score.is_finite())
                    .collect::<Vec<_>>();

                // Stable, so equal scores keep the lowest predecessor first.
                entries.sort_by(|a, b| b.score.total_cmp(&a.score));
                entries.truncate(self.rank_length);
                entries
            })
            .collect()
    }

    fn traceback(&self, lattice: &Lattice, segment: Segment) -> DecodedSegment {
        let Some(last) = segment.columns.last() else {
            return DecodedSegment { ranked: vec![] };
        };

        let mut finals = last
            .iter()
            .enumerate()
            .flat_map(|(state, ranked)| {
                ranked
                    .iter()
                    .enumerate()
                    .map(move |(rank, entry)| (entry.score, state, rank))
            })
            .collect::<Vec<_>>();

        finals.sort_by(|a, b| b.0.total_cmp(&a.0));
        finals.truncate(self.rank_length);

        let ranked = finals
            .into_iter()
            .map(|(log_probability, state, rank)| {
                let (mut state, mut rank) = (state, rank);
                let mut states = Vec::with_capacity(segment.columns.len());

                for (offset, column) in segment.columns.iter().enumerate().rev() {
                    let step = &lattice.steps[segment.first + offset];
                    let entry = column[state][rank];

                    let path = entry.back.and_then(|(from, _)| {
                        step.transitions.as_ref()?.path(from, state).cloned()
                    });

                    states.push(MatchedState {
                        sample: step.index,
                        candidate: step.candidates[state],
                        path,
                    });

                    if let Some((from, from_rank)) = entry.back {
                        (state, rank) = (from, from_rank);
                    }
                }

                states.reverse();
                RankedSequence {
                    states,
                    log_probability,
                }
            })
            .collect();

        DecodedSegment { ranked }
    }
}

impl Solver for ViterbiSolver {
    #[cfg_attr(feature = "tracing", tracing::instrument(level = Level::DEBUG, skip_all))]
    fn solve(&self, lattice: &Lattice) -> Result<Decoded, MatchError> {
        debug_time!("viterbi over {} steps", lattice.steps.len());

        if lattice.steps.first().is_none_or(TimeStep::is_empty) {
            return Err(MatchError::EmptyInitialStep);
        }

        let mut decoded = Decoded::default();
        let mut current: Option<Segment> = None;

        for (position, step) in lattice.steps.iter().enumerate() {
            if step.is_empty() {
                if let Some(segment) = current.take() {
                    decoded.segments.push(self.traceback(lattice, segment));
                    decoded.breaks.push(Break {
                        sample: step.index,
                        reason: BreakReason::Unreachable,
                    });
                }
                continue;
            }

            let advanced = match (current.as_ref(), step.transitions.as_ref()) {
                (Some(segment), Some(transitions)) => segment
                    .columns
                    .last()
                    .map(|previous| self.advance(previous, step, transitions)),
                _ => None,
            };

            match advanced {
                Some(column) if column.iter().any(|ranked| !ranked.is_empty()) => {
                    if let Some(segment) = current.as_mut() {
                        segment.columns.push(column);
                    }
                    continue;
                }
                Some(_) => {
                    if self.policy == BreakPolicy::Fail {
                        return Err(MatchError::DecodeBroken { index: step.index });
                    }

                    debug!("No transition reaches sample {}, restarting", step.index);
                    if let Some(segment) = current.take() {
                        decoded.segments.push(self.traceback(lattice, segment));
                    }
                    decoded.breaks.push(Break {
                        sample: step.index,
                        reason: BreakReason::Unreachable,
                    });
                }
                None => {
                    if let Some(segment) = current.take() {
                        decoded.segments.push(self.traceback(lattice, segment));
                        decoded.breaks.push(Break {
                            sample: step.index,
                            reason: BreakReason::Gap,
                        });
                    }
                }
            }

            current = Some(Segment {
                first: position,
                columns: vec![Self::start(step)],
            });
        }

        if let Some(segment) = current.take() {
            decoded.segments.push(self.traceback(lattice, segment));
        }

        Ok(decoded)
    }
}
