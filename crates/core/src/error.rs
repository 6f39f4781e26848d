use std::path::PathBuf;
use thiserror::Error;

/// Why a move was rejected by the rules engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IllegalMoveReason {
    /// The game is already decided.
    GameOver,
    /// A different sub-board is required this turn.
    WrongSubBoard,
    /// The target sub-board is already won or drawn.
    SubBoardClosed,
    /// The target cell is already marked.
    CellOccupied,
}

impl std::fmt::Display for IllegalMoveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            IllegalMoveReason::GameOver => "the game is over",
            IllegalMoveReason::WrongSubBoard => "another sub-board is required",
            IllegalMoveReason::SubBoardClosed => "the sub-board is no longer active",
            IllegalMoveReason::CellOccupied => "the cell is occupied",
        };
        f.write_str(text)
    }
}

/// Errors raised by game rules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    /// Recoverable: the caller should pick another move.
    #[error("illegal move {action}: {reason}")]
    IllegalMove {
        action: String,
        reason: IllegalMoveReason,
    },

    /// A result was requested for a game still in progress.
    #[error("game is not terminal")]
    NotTerminal,
}

/// Errors raised by estimators, both for persistence and prediction.
#[derive(Error, Debug)]
pub enum EstimatorError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt checkpoint {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("checkpoint {path} has version {found}, expected {expected}")]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("failed to serialize parameters: {0}")]
    Serialize(String),

    #[error("{what}: expected length {expected}, got {found}")]
    Shape {
        what: String,
        expected: usize,
        found: usize,
    },

    #[error("non-finite value in {0}")]
    NonFinite(&'static str),

    #[error("invalid training batch: {0}")]
    InvalidBatch(String),
}

impl EstimatorError {
    /// True when a load failed only because the checkpoint does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EstimatorError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }

    /// True for persistence failures, false for prediction/training failures.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            EstimatorError::Io { .. }
                | EstimatorError::Corrupt { .. }
                | EstimatorError::UnsupportedVersion { .. }
                | EstimatorError::Serialize(_)
        )
    }
}

/// Errors from constructing a [`crate::Policy`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("policy cannot be empty")]
    Empty,

    #[error("policy contains negative or non-finite values")]
    Negative,

    #[error("policy sum {0} is not 1.0")]
    BadSum(f32),

    #[error("cannot normalize: all values are zero")]
    AllZero,

    #[error("index {index} out of range for policy of length {len}")]
    OutOfRange { index: usize, len: usize },
}
