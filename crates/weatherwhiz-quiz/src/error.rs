use thiserror::Error;

/// Shown when a round produced no weather data at all.
pub const NO_DATA_MESSAGE: &str = "No data available for any selected location.";

/// Shown when preparing a round failed for any reason not tied to a single lookup.
pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred while preparing the quiz.";

#[derive(Debug, Error)]
pub enum QuizError {
    /// The round was abandoned before its fetch finished.
    #[error("Round cancelled")]
    Cancelled,

    /// The aggregation step itself failed (not a single lookup).
    #[error("Quiz aggregation failed: {0}")]
    Aggregation(String),

    /// The controller task is gone; intents can no longer be delivered.
    #[error("Quiz controller is not running")]
    ControllerClosed,
}

impl QuizError {
    pub fn user_message(&self) -> &'static str {
        match self {
            QuizError::Cancelled => "The quiz was cancelled.",
            QuizError::Aggregation(_) => GENERIC_FAILURE_MESSAGE,
            QuizError::ControllerClosed => "The quiz has stopped. Please restart the app.",
        }
    }
}
