//! Estimator abstraction.
//!
//! An estimator maps an encoded position to a value in [-1, 1] (from the
//! perspective of the side to move) and a probability distribution over the
//! whole action space. Search and training depend only on this trait.

use crate::EstimatorError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Output of [`Estimator::predict`].
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    /// Value for the side to move, in [-1, 1].
    pub value: f32,

    /// Distribution over every action index, legal or not. Non-negative, sums to 1.
    pub policy: Vec<f32>,
}

/// One labelled position produced by self-play.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    /// Encoded position, as produced by `Game::encode`.
    pub observation: Vec<f32>,

    /// Target distribution over the action space (search visit shares).
    pub policy: Vec<f32>,

    /// Which action indices were legal in this position.
    pub legal_mask: Vec<bool>,

    /// Final game result from the perspective of the side to move here.
    pub value: f32,
}

/// Losses reported by a single optimization step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TrainStats {
    /// Mean cross-entropy over legal moves.
    pub policy_loss: f32,
    /// Mean squared value error.
    pub value_loss: f32,
    pub batch_size: usize,
}

impl TrainStats {
    /// Combined loss with the value term weighted by `value_weight`.
    pub fn total(&self, value_weight: f32) -> f32 {
        self.policy_loss + value_weight * self.value_loss
    }
}

/// A trainable value/policy predictor.
///
/// `predict` takes `&self` so many games can share one estimator during
/// self-play; `train` and `load` take `&mut self` and therefore cannot
/// overlap with any prediction.
pub trait Estimator: Send + Sync {
    /// Evaluates one encoded position.
    ///
    /// # Errors
    /// [`EstimatorError::Shape`] for malformed input, [`EstimatorError::NonFinite`]
    /// if the computation produced NaN or infinity.
    fn predict(&self, observation: &[f32]) -> Result<Prediction, EstimatorError>;

    /// Performs one optimization step on `batch`.
    fn train(&mut self, batch: &[TrainingExample]) -> Result<TrainStats, EstimatorError>;

    /// Writes all parameters to `path`.
    fn save(&self, path: &Path) -> Result<(), EstimatorError>;

    /// Replaces all parameters with those stored at `path`.
    ///
    /// A missing or unreadable file is an error; parameters are left
    /// untouched in that case.
    fn load(&mut self, path: &Path) -> Result<(), EstimatorError>;
}
