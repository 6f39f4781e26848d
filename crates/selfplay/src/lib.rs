//! Self-play training for the Ultimate Tic-Tac-Toe engine.
//!
//! - [`Trainer`] runs the iterate / self-play / train / checkpoint loop.
//! - [`play_game`] plays one search-guided game and labels its positions.
//! - [`get_best_move`] and [`evaluate_position`] answer gameplay queries.
//! - [`MinimaxPlayer`] and [`play_match`] measure a trained estimator
//!   against a heuristic baseline.

pub mod config;
mod error;
mod game;
pub mod minimax;
mod observer;
mod query;
mod replay_buffer;
mod trainer;

pub use config::TrainingConfig;
pub use error::{SelfPlayError, TrainError};
pub use game::{play_game, GameRecord};
pub use minimax::{evaluate_heuristic, play_match, MatchResult, MinimaxPlayer};
pub use observer::{IterationReport, LoggingObserver, ProgressObserver};
pub use query::{analyze, evaluate_position, get_best_move};
pub use replay_buffer::ReplayBuffer;
pub use trainer::{StopHandle, Trainer, TrainingSummary};
