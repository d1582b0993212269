//! Quiz lifecycle state machine.
//!
//! Holds everything that survives between intents: the lifecycle state, the
//! answer key of the current round and its scoreboard. It performs no I/O;
//! fetch results are fed back through [`QuizMachine::complete_round`] tagged
//! with the round they were requested for.

use rand::rngs::StdRng;
use rand::Rng;

use crate::builder::{dedupe_by_name, QuizBuilder};
use crate::error::{QuizError, GENERIC_FAILURE_MESSAGE, NO_DATA_MESSAGE};
use crate::evaluator::{self, Evaluation, Scoreboard};
use crate::model::{QuizItem, QuizState, RoundId};

pub struct QuizMachine<R = StdRng> {
    state: QuizState,
    round: RoundId,
    answer_key: Vec<QuizItem>,
    scoreboard: Scoreboard,
    builder: QuizBuilder<R>,
}

impl<R: Rng> QuizMachine<R> {
    pub fn new(builder: QuizBuilder<R>) -> Self {
        Self {
            state: QuizState::Idle,
            round: 0,
            answer_key: Vec::new(),
            scoreboard: Scoreboard::default(),
            builder,
        }
    }

    pub fn state(&self) -> &QuizState {
        &self.state
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    pub fn answer_key(&self) -> &[QuizItem] {
        &self.answer_key
    }

    /// Identity of the latest round. Results for any other round are stale.
    pub fn round(&self) -> RoundId {
        self.round
    }

    /// Idle -> Loading. Returns the round the caller should fetch for.
    pub fn start(&mut self) -> Option<RoundId> {
        match self.state {
            QuizState::Idle => Some(self.begin_loading()),
            _ => {
                tracing::debug!("Ignoring start while {}", self.state.label());
                None
            }
        }
    }

    /// Error -> Loading.
    pub fn retry(&mut self) -> Option<RoundId> {
        match self.state {
            QuizState::Error(_) => Some(self.begin_loading()),
            _ => {
                tracing::debug!("Ignoring retry while {}", self.state.label());
                None
            }
        }
    }

    fn begin_loading(&mut self) -> RoundId {
        self.clear_round();
        self.state = QuizState::Loading;
        tracing::info!("Round {} loading", self.round);
        self.round
    }

    /// Apply the outcome of a fetch.
    ///
    /// Returns `false` when the result was discarded: the machine is not
    /// loading, or the result belongs to a superseded round.
    pub fn complete_round(
        &mut self,
        round: RoundId,
        result: Result<Vec<QuizItem>, QuizError>,
    ) -> bool {
        if round != self.round || self.state != QuizState::Loading {
            tracing::debug!(
                "Discarding result for round {} (current {}, {})",
                round,
                self.round,
                self.state.label()
            );
            return false;
        }

        match result {
            Ok(items) if items.is_empty() => {
                tracing::warn!("Round {} produced no data", round);
                self.state = QuizState::Error(NO_DATA_MESSAGE.to_string());
            }
            Ok(items) => {
                self.answer_key = dedupe_by_name(items);
                let pools = self.builder.build(&self.answer_key);
                tracing::info!("Round {} ready with {} locations", round, pools.len());
                self.state = QuizState::Success(pools);
            }
            // A cancelled fetch only reaches here if its token fired without a
            // newer round replacing it; stay loading until reset or retry.
            Err(QuizError::Cancelled) => {
                tracing::debug!("Round {} cancelled", round);
                return false;
            }
            Err(e) => {
                tracing::error!("Round {} failed: {}", round, e);
                self.state = QuizState::Error(GENERIC_FAILURE_MESSAGE.to_string());
            }
        }
        true
    }

    /// Score a pairing. Ignored outside `Success` and for out-of-range indices.
    pub fn select_pairing(&mut self, name_index: usize, card_index: usize) -> Option<Evaluation> {
        let QuizState::Success(pools) = &self.state else {
            tracing::debug!("Ignoring pairing while {}", self.state.label());
            return None;
        };

        let evaluation = evaluator::evaluate(
            name_index,
            card_index,
            pools,
            &self.answer_key,
            &mut self.scoreboard,
        )?;

        if evaluation.round_complete {
            let total_locations = evaluator::distinct_locations(&self.answer_key);
            tracing::info!(
                "Round {} complete: {} locations, {} wrong guesses",
                self.round,
                total_locations,
                self.scoreboard.wrong_guesses
            );
            self.state = QuizState::GameOver {
                final_wrong_guesses: self.scoreboard.wrong_guesses,
                total_locations,
            };
        }
        Some(evaluation)
    }

    /// Any state -> Idle. Any in-flight result becomes stale.
    pub fn reset(&mut self) {
        self.clear_round();
        self.state = QuizState::Idle;
    }

    fn clear_round(&mut self) {
        self.round += 1;
        self.answer_key.clear();
        self.scoreboard = Scoreboard::default();
    }
}
