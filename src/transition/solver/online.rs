use crate::BreakPolicy;
use crate::transition::{
    Break, BreakReason, Decoded, DecodedSegment, MatchError, MatchedState, RankedSequence,
    TimeStep, Transitions,
};

use log::{debug, trace};
use std::collections::{BTreeSet, VecDeque};

/// A time step awaiting commitment, with its Viterbi scores.
#[derive(Debug, Clone)]
struct Retained {
    step: TimeStep,
    scores: Vec<f64>,
    /// Best predecessor of each state in the step before.
    back: Vec<Option<usize>>,
}

impl Retained {
    fn start(step: TimeStep) -> Self {
        Retained {
            scores: step.emissions.clone(),
            back: vec![None; step.len()],
            step,
        }
    }

    fn state(&self, state: usize) -> MatchedState {
        MatchedState {
            sample: self.step.index,
            candidate: self.step.candidates[state],
            path: self.back[state].and_then(|from| {
                self.step
                    .transitions
                    .as_ref()?
                    .path(from, state)
                    .cloned()
            }),
        }
    }
}

/// The lowest-indexed state with the highest finite score.
fn argmax(scores: &[f64]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .filter(|(_, score)| score.is_finite())
        .fold(None, |best: Option<(usize, f64)>, (state, score)| {
            if best.is_none_or(|(_, top)| *score > top) {
                Some((state, *score))
            } else {
                best
            }
        })
        .map(|(state, _)| state)
}

/// Incremental Viterbi decoding over a bounded window.
///
/// Steps are pushed one at a time. Once every surviving path agrees on the
/// oldest retained step, that step is committed exactly. When more than
/// `window` steps are retained, the oldest is committed along the current
/// best path and paths disagreeing with it are discarded.
///
/// Without forced commits the result equals offline decoding with a single
/// rank.
#[derive(Debug, Clone)]
pub struct OnlineViterbi {
    window: usize,
    policy: BreakPolicy,
    retained: VecDeque<Retained>,
    committed: Vec<MatchedState>,
    segments: Vec<DecodedSegment>,
    breaks: Vec<Break>,
    started: bool,
}

impl OnlineViterbi {
    pub fn new(window: usize, policy: BreakPolicy) -> Self {
        OnlineViterbi {
            window: window.max(1),
            policy,
            retained: VecDeque::new(),
            committed: vec![],
            segments: vec![],
            breaks: vec![],
            started: false,
        }
    }

    pub fn push(&mut self, step: TimeStep) -> Result<(), MatchError> {
        if step.is_empty() {
            if !self.started {
                return Err(MatchError::EmptyInitialStep);
            }

            if self.close_segment() {
                self.breaks.push(Break {
                    sample: step.index,
                    reason: BreakReason::Unreachable,
                });
            }

            return Ok(());
        }

        self.started = true;

        let advanced = match (self.retained.back(), step.transitions.as_ref()) {
            (Some(previous), Some(transitions)) => Some(Self::advance(
                &previous.scores,
                &step.emissions,
                transitions,
            )),
            _ => None,
        };

        let retained = match advanced {
            Some((scores, back)) if scores.iter().any(|score| score.is_finite()) => Retained {
                step,
                scores,
                back,
            },
            Some(_) => {
                if self.policy == BreakPolicy::Fail {
                    return Err(MatchError::DecodeBroken { index: step.index });
                }

                debug!("No transition reaches sample {}, restarting", step.index);
                self.close_segment();
                self.breaks.push(Break {
                    sample: step.index,
                    reason: BreakReason::Unreachable,
                });

                Retained::start(step)
            }
            None => {
                if self.close_segment() {
                    self.breaks.push(Break {
                        sample: step.index,
                        reason: BreakReason::Gap,
                    });
                }

                Retained::start(step)
            }
        };

        self.retained.push_back(retained);
        self.commit();

        Ok(())
    }

    /// The best state sequence of the current segment so far, committed
    /// states first.
    pub fn best_path(&self) -> Vec<MatchedState> {
        let states = self.best_states();

        self.committed
            .iter()
            .cloned()
            .chain(
                states
                    .iter()
                    .zip(&self.retained)
                    .map(|(state, retained)| retained.state(*state)),
            )
            .collect()
    }

    /// Score of [`best_path`](Self::best_path).
    pub fn best_score(&self) -> Option<f64> {
        let newest = self.retained.back()?;
        argmax(&newest.scores).map(|state| newest.scores[state])
    }

    /// States of the current segment that can no longer change.
    pub fn committed(&self) -> &[MatchedState] {
        &self.committed
    }

    /// Steps still open to revision.
    pub fn pending(&self) -> usize {
        self.retained.len()
    }

    pub fn breaks(&self) -> &[Break] {
        &self.breaks
    }

    pub fn finish(mut self) -> Decoded {
        self.close_segment();

        Decoded {
            segments: self.segments,
            breaks: self.breaks,
        }
    }

    fn advance(
        previous: &[f64],
        emissions: &[f64],
        transitions: &Transitions,
    ) -> (Vec<f64>, Vec<Option<usize>>) {
        emissions
            .iter()
            .enumerate()
            .map(|(state, emission)| {
                let best = previous
                    .iter()
                    .enumerate()
                    .map(|(from, score)| (from, score + transitions.log_probability(from, state)))
                    .filter(|(_, total)| total.is_finite())
                    .fold(None, |best: Option<(usize, f64)>, (from, total)| {
                        if best.is_none_or(|(_, top)| total > top) {
                            Some((from, total))
                        } else {
                            best
                        }
                    });

                match best {
                    Some((from, total)) => (total + emission, Some(from)),
                    None => (f64::NEG_INFINITY, None),
                }
            })
            .unzip()
    }

    /// The state of every retained step along the best path, oldest first.
    fn best_states(&self) -> Vec<usize> {
        let Some(mut state) = self.retained.back().and_then(|newest| argmax(&newest.scores))
        else {
            return vec![];
        };

        let mut states = Vec::with_capacity(self.retained.len());
        states.push(state);

        for retained in self.retained.iter().skip(1).rev() {
            match retained.back[state] {
                Some(from) => {
                    state = from;
                    states.push(from);
                }
                None => break,
            }
        }

        states.reverse();
        states
    }

    /// Whether every surviving path passes through the same state of the
    /// oldest retained step.
    fn converged(&self) -> bool {
        let Some(newest) = self.retained.back() else {
            return false;
        };

        let mut live = newest
            .scores
            .iter()
            .enumerate()
            .filter(|(_, score)| score.is_finite())
            .map(|(state, _)| state)
            .collect::<BTreeSet<_>>();

        for retained in self.retained.iter().skip(1).rev() {
            live = live
                .into_iter()
                .filter_map(|state| retained.back[state])
                .collect();
        }

        live.len() == 1
    }

    fn commit(&mut self) {
        loop {
            let forced = self.retained.len() > self.window;
            if !forced && !(self.retained.len() > 1 && self.converged()) {
                break;
            }

            let Some(&chosen) = self.best_states().first() else {
                break;
            };

            let Some(oldest) = self.retained.pop_front() else {
                break;
            };

            trace!(
                "Committing sample {} ({})",
                oldest.step.index,
                if forced { "window full" } else { "converged" }
            );
            self.committed.push(oldest.state(chosen));

            if let Some(front) = self.retained.front_mut() {
                for state in 0..front.scores.len() {
                    if front.back[state] != Some(chosen) {
                        front.scores[state] = f64::NEG_INFINITY;
                    }
                }

                self.rescore();
            }
        }
    }

    /// Recomputes scores after the front step was pruned.
    fn rescore(&mut self) {
        for position in 1..self.retained.len() {
            let previous = self.retained[position - 1].scores.clone();
            let current = &mut self.retained[position];

            if let Some(transitions) = current.step.transitions.as_ref() {
                let (scores, back) = Self::advance(&previous, &current.step.emissions, transitions);
                current.scores = scores;
                current.back = back;
            }
        }
    }

    /// Moves the current segment into the decoded output. Returns whether
    /// there was one.
    fn close_segment(&mut self) -> bool {
        let states = self.best_path();
        let score = self.best_score();

        self.retained.clear();
        self.committed.clear();

        match score {
            Some(log_probability) if !states.is_empty() => {
                self.segments.push(DecodedSegment {
                    ranked: vec![RankedSequence {
                        states,
                        log_probability,
                    }],
                });
                true
            }
            _ => false,
        }
    }
}
