use thiserror::Error;
use uzero_core::{EstimatorError, GameError};
use uzero_mcts::SearchError;

/// Failure of a single self-play or evaluation game.
#[derive(Error, Debug)]
pub enum SelfPlayError {
    #[error("search failed: {0}")]
    Search(#[from] SearchError),

    #[error(transparent)]
    Game(#[from] GameError),
}

/// Terminal status of the training loop.
#[derive(Error, Debug)]
pub enum TrainError {
    #[error("invalid training configuration: {0}")]
    InvalidConfig(String),

    #[error("iteration {iteration}: {failed} of {total} self-play games failed (last: {source})")]
    SelfPlay {
        iteration: usize,
        failed: usize,
        total: usize,
        #[source]
        source: SelfPlayError,
    },

    #[error("iteration {iteration}: training step failed: {source}")]
    Training {
        iteration: usize,
        #[source]
        source: EstimatorError,
    },

    #[error("iteration {iteration}: checkpoint failed: {source}")]
    Checkpoint {
        iteration: usize,
        #[source]
        source: EstimatorError,
    },
}

impl TrainError {
    /// Iteration at which the loop stopped, if it got that far.
    pub fn iteration(&self) -> Option<usize> {
        match self {
            TrainError::InvalidConfig(_) => None,
            TrainError::SelfPlay { iteration, .. }
            | TrainError::Training { iteration, .. }
            | TrainError::Checkpoint { iteration, .. } => Some(*iteration),
        }
    }
}
