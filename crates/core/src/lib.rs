//! Ultimate Zero Core - Game and estimator abstractions
//!
//! This crate defines the seams between the rules engine, the tree search,
//! the learned estimator and the self-play trainer. Nothing here knows about
//! a concrete game or a concrete parameter layout.
//!
//! # Types
//!
//! - [`Game`] - Trait for deterministic two-player game implementations
//! - [`Estimator`] - Trainable value/policy predictor
//! - [`Policy`] - Probability distribution over action indices (sums to 1.0)
//! - [`TrainingExample`] - One labelled position produced by self-play

mod error;
mod estimator;
mod game;
mod types;

pub use error::{EstimatorError, GameError, IllegalMoveReason, PolicyError};
pub use estimator::{Estimator, Prediction, TrainStats, TrainingExample};
pub use game::Game;
pub use types::{Policy, GREEDY_TEMPERATURE};
