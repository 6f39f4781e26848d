use thiserror::Error;
use uzero_core::{EstimatorError, GameError, PolicyError};

/// Errors that abort a search call.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("cannot search from a terminal position")]
    TerminalPosition,

    #[error("non-terminal position has no legal moves")]
    NoLegalMoves,

    /// The estimator could not evaluate a leaf.
    #[error("estimator failed: {0}")]
    Estimator(#[from] EstimatorError),

    #[error("rules engine rejected a search move: {0}")]
    Game(#[from] GameError),

    #[error("invalid search policy: {0}")]
    Policy(#[from] PolicyError),

    #[error("invalid search configuration: {0}")]
    InvalidConfig(String),

    #[error("search table lost an expanded node")]
    MissingNode,
}
