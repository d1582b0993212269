//! Quiz controller: a single task that owns the [`QuizMachine`].
//!
//! Intents arrive over an unbounded queue and are applied one at a time, so
//! score state has exactly one writer no matter how many threads hold a
//! [`QuizHandle`]. Each round's fetch runs in its own task with a
//! [`CancellationToken`]; its result is posted back tagged with the round id
//! and discarded if the round has since been superseded.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use weatherwhiz_catalog::Location;

use crate::builder::QuizBuilder;
use crate::error::QuizError;
use crate::evaluator::{MatchOutcome, Scoreboard};
use crate::fetcher::QuizRepository;
use crate::machine::QuizMachine;
use crate::model::{QuizItem, QuizState, RoundId};

/// Intents accepted from the presentation layer.
#[derive(Debug, Clone)]
pub enum QuizCommand {
    Start(Vec<Location>),
    Retry(Vec<Location>),
    SelectPairing { name_index: usize, card_index: usize },
    Reset,
}

struct RoundResult {
    round: RoundId,
    result: Result<Vec<QuizItem>, QuizError>,
}

/// Cloneable front to a running controller.
#[derive(Clone)]
pub struct QuizHandle {
    commands: mpsc::UnboundedSender<QuizCommand>,
    state: watch::Receiver<QuizState>,
    scoreboard: watch::Receiver<Scoreboard>,
}

impl QuizHandle {
    pub fn start(&self, locations: Vec<Location>) -> Result<(), QuizError> {
        self.send(QuizCommand::Start(locations))
    }

    pub fn retry(&self, locations: Vec<Location>) -> Result<(), QuizError> {
        self.send(QuizCommand::Retry(locations))
    }

    pub fn select_pairing(&self, name_index: usize, card_index: usize) -> Result<(), QuizError> {
        self.send(QuizCommand::SelectPairing {
            name_index,
            card_index,
        })
    }

    pub fn reset(&self) -> Result<(), QuizError> {
        self.send(QuizCommand::Reset)
    }

    /// Queue a command. Fails only once the controller task has stopped.
    pub fn send(&self, command: QuizCommand) -> Result<(), QuizError> {
        self.commands
            .send(command)
            .map_err(|_| QuizError::ControllerClosed)
    }

    /// Latest published state.
    pub fn state(&self) -> QuizState {
        self.state.borrow().clone()
    }

    /// Latest published scoreboard.
    pub fn scoreboard(&self) -> Scoreboard {
        self.scoreboard.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<QuizState> {
        self.state.clone()
    }

    pub fn subscribe_scoreboard(&self) -> watch::Receiver<Scoreboard> {
        self.scoreboard.clone()
    }
}

pub struct QuizController {
    machine: QuizMachine,
    repository: Arc<dyn QuizRepository>,
    results: mpsc::UnboundedSender<RoundResult>,
    state: watch::Sender<QuizState>,
    scoreboard: watch::Sender<Scoreboard>,
    in_flight: Option<CancellationToken>,
}

impl QuizController {
    /// Spawn the controller on the current tokio runtime.
    ///
    /// The task runs until every [`QuizHandle`] clone is dropped; any round
    /// still loading at that point is cancelled.
    pub fn spawn(
        repository: Arc<dyn QuizRepository>,
        builder: QuizBuilder,
    ) -> (QuizHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(QuizState::Idle);
        let (scoreboard_tx, scoreboard_rx) = watch::channel(Scoreboard::default());

        let controller = Self {
            machine: QuizMachine::new(builder),
            repository,
            results: result_tx,
            state: state_tx,
            scoreboard: scoreboard_tx,
            in_flight: None,
        };
        let task = tokio::spawn(controller.run(command_rx, result_rx));

        let handle = QuizHandle {
            commands: command_tx,
            state: state_rx,
            scoreboard: scoreboard_rx,
        };
        (handle, task)
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<QuizCommand>,
        mut results: mpsc::UnboundedReceiver<RoundResult>,
    ) {
        tracing::debug!("Quiz controller started");
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                Some(done) = results.recv() => self.finish(done),
            }
            self.publish();
        }
        self.cancel_in_flight();
        tracing::debug!("Quiz controller stopped");
    }

    fn handle(&mut self, command: QuizCommand) {
        match command {
            QuizCommand::Start(locations) => {
                if let Some(round) = self.machine.start() {
                    self.launch(round, locations);
                }
            }
            QuizCommand::Retry(locations) => {
                if let Some(round) = self.machine.retry() {
                    self.launch(round, locations);
                }
            }
            QuizCommand::SelectPairing {
                name_index,
                card_index,
            } => match self.machine.select_pairing(name_index, card_index) {
                Some(eval) => match eval.outcome {
                    MatchOutcome::Correct { location_id, .. } => {
                        tracing::debug!("Correct match for location {}", location_id)
                    }
                    MatchOutcome::Incorrect { name, .. } => {
                        tracing::debug!("Wrong card for {}", name)
                    }
                },
                None => tracing::debug!(
                    "Ignored pairing ({}, {}) while {}",
                    name_index,
                    card_index,
                    self.machine.state().label()
                ),
            },
            QuizCommand::Reset => {
                self.cancel_in_flight();
                self.machine.reset();
                tracing::info!("Quiz reset");
            }
        }
    }

    /// Start the fetch for `round` in its own task.
    fn launch(&mut self, round: RoundId, locations: Vec<Location>) {
        self.cancel_in_flight();
        let token = CancellationToken::new();
        self.in_flight = Some(token.clone());

        let repository = Arc::clone(&self.repository);
        let results = self.results.clone();

        tokio::spawn(async move {
            let fetch_token = token.clone();
            let mut fetch = tokio::spawn(async move {
                repository.fetch_quiz_data(&locations, &fetch_token).await
            });

            // A panic in the aggregation step surfaces as a JoinError.
            let result = tokio::select! {
                _ = token.cancelled() => {
                    fetch.abort();
                    Err(QuizError::Cancelled)
                }
                joined = &mut fetch => joined.unwrap_or_else(|e| {
                    Err(QuizError::Aggregation(e.to_string()))
                }),
            };

            // Controller gone means nobody is waiting for this round.
            let _ = results.send(RoundResult { round, result });
        });
    }

    fn finish(&mut self, done: RoundResult) {
        if self.machine.complete_round(done.round, done.result) {
            self.in_flight = None;
        }
    }

    fn cancel_in_flight(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
    }

    fn publish(&self) {
        let state = self.machine.state();
        self.state.send_if_modified(|current| {
            if *current == *state {
                return false;
            }
            tracing::debug!("Quiz state: {} -> {}", current.label(), state.label());
            *current = state.clone();
            true
        });

        let scoreboard = self.machine.scoreboard();
        self.scoreboard.send_if_modified(|current| {
            if *current == *scoreboard {
                return false;
            }
            *current = scoreboard.clone();
            true
        });
    }
}
