//! Training-loop configuration.

use crate::TrainError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uzero_mcts::MctsConfig;

/// Everything the self-play loop needs, loadable from JSON.
///
/// Missing fields fall back to [`TrainingConfig::default`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub iterations: usize,
    pub games_per_iteration: usize,
    pub simulations_per_move: usize,

    /// Replay buffer size; oldest examples are evicted beyond this.
    pub replay_capacity: usize,
    pub batch_size: usize,

    /// Passes over the buffer per iteration.
    pub epochs: usize,

    /// Save every N iterations (0 disables periodic checkpoints).
    pub checkpoint_every: usize,
    pub checkpoint_dir: Option<PathBuf>,

    /// Plies played at `early_temperature` before switching to `late_temperature`.
    pub temperature_threshold: usize,
    pub early_temperature: f32,
    pub late_temperature: f32,

    pub c_puct: f32,
    pub dirichlet_alpha: f32,
    pub exploration_fraction: f32,

    pub seed: u64,

    /// Abort the iteration when more than this share of its games fail.
    pub max_failed_fraction: f32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            games_per_iteration: 16,
            simulations_per_move: 100,
            replay_capacity: 50_000,
            batch_size: 128,
            epochs: 2,
            checkpoint_every: 1,
            checkpoint_dir: Some(PathBuf::from("checkpoints")),
            temperature_threshold: 10,
            early_temperature: 1.0,
            late_temperature: 0.1,
            c_puct: 1.5,
            dirichlet_alpha: 0.3,
            exploration_fraction: 0.25,
            seed: 42,
            max_failed_fraction: 0.5,
        }
    }
}

impl TrainingConfig {
    /// Sampling temperature for the move at `ply` (0-based).
    pub fn temperature(&self, ply: usize) -> f32 {
        if ply < self.temperature_threshold {
            self.early_temperature
        } else {
            self.late_temperature
        }
    }

    /// Search parameters for self-play games (root noise on).
    pub fn mcts_config(&self) -> MctsConfig {
        MctsConfig::for_self_play(self.c_puct, self.dirichlet_alpha, self.exploration_fraction)
    }

    /// True if a checkpoint is due after `iteration` (0-based).
    pub fn checkpoint_due(&self, iteration: usize) -> bool {
        self.checkpoint_dir.is_some()
            && ((self.checkpoint_every > 0 && (iteration + 1) % self.checkpoint_every == 0)
                || iteration + 1 == self.iterations)
    }

    pub fn validate(&self) -> Result<(), TrainError> {
        let invalid = |msg: String| Err(TrainError::InvalidConfig(msg));

        if self.games_per_iteration == 0 {
            return invalid("games_per_iteration must be at least 1".into());
        }
        if self.replay_capacity == 0 {
            return invalid("replay_capacity must be at least 1".into());
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be at least 1".into());
        }
        for (name, t) in [
            ("early_temperature", self.early_temperature),
            ("late_temperature", self.late_temperature),
        ] {
            if !(t.is_finite() && t >= 0.0) {
                return invalid(format!("{name} must be a non-negative number, got {t}"));
            }
        }
        if !(0.0..=1.0).contains(&self.max_failed_fraction) {
            return invalid(format!(
                "max_failed_fraction must be in [0, 1], got {}",
                self.max_failed_fraction
            ));
        }
        self.mcts_config()
            .validate()
            .map_err(|e| TrainError::InvalidConfig(e.to_string()))
    }
}
