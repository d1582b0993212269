//! WeatherWhiz quiz engine.
//!
//! Pairs catalog locations with live weather observations and runs the
//! matching game: fetch every location concurrently, shuffle names and
//! weather cards into two pools, then score the player's pairings until
//! every location is matched.

pub mod builder;
pub mod controller;
pub mod error;
pub mod evaluator;
pub mod fetcher;
pub mod machine;
pub mod model;

pub use builder::QuizBuilder;
pub use controller::{QuizCommand, QuizController, QuizHandle};
pub use error::{QuizError, GENERIC_FAILURE_MESSAGE, NO_DATA_MESSAGE};
pub use evaluator::{Evaluation, MatchOutcome, Scoreboard};
pub use fetcher::{QuizRepository, WeatherFetcher};
pub use machine::QuizMachine;
pub use model::{QuizItem, QuizPools, QuizState, RoundId, WeatherCard};
