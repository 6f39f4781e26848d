//! Monte Carlo Tree Search for the self-play engine.
//!
//! This crate provides a PUCT search that can be used with any game
//! implementing `uzero_core::Game` and any `uzero_core::Estimator`.
//!
//! # Features
//!
//! - **Generic**: Works with any `Game` implementation
//! - **PUCT Selection**: Unvisited moves first, ties broken by action index
//! - **Transposition table**: Nodes keyed by canonical position key, owned
//!   by one search instance
//! - **Dirichlet Noise**: Resampled at the root on every search call,
//!   applied to a copy of the priors
//! - **Temperature Sampling**: `SearchResult::select_action`
//!
//! # Example
//!
//! ```
//! use uzero_board::UltimateTicTacToe;
//! use uzero_core::Game;
//! use uzero_mcts::{Mcts, MctsConfig};
//! use uzero_net::{MlpConfig, MlpEstimator};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let game = UltimateTicTacToe;
//! let state = game.initial_state();
//! let estimator = MlpEstimator::new(MlpConfig::default());
//!
//! let rng = ChaCha8Rng::seed_from_u64(42);
//! let mut mcts = Mcts::new(MctsConfig::default(), &estimator, rng);
//!
//! let result = mcts.search(&game, &state, 64).unwrap();
//! assert!((result.policy.sum() - 1.0).abs() < 1e-4);
//! println!("Best action: {}", result.best_action);
//! println!("Root value: {}", result.root_value);
//! ```

pub mod config;
mod error;
pub mod evaluator;
mod node;
pub mod search;
mod tree;

pub use config::MctsConfig;
pub use error::SearchError;
pub use evaluator::{evaluate, mask_priors, Evaluation};
pub use search::{Mcts, MoveStats, SearchResult};
