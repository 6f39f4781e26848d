use serde::{Deserialize, Serialize};
use uzero_board::{NUM_MOVES, OBSERVATION_SIZE};

/// Network shape and optimizer settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlpConfig {
    /// Length of the encoded observation.
    pub input_size: usize,

    /// Width of both hidden layers.
    pub hidden_size: usize,

    /// Size of the policy head (action space).
    pub num_actions: usize,

    pub learning_rate: f32,
    pub momentum: f32,

    /// L2 penalty on weight matrices (biases are not decayed).
    pub weight_decay: f32,

    /// Multiplier on the squared value error in the combined loss.
    pub value_loss_weight: f32,

    /// Seed for parameter initialization.
    pub seed: u64,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            input_size: OBSERVATION_SIZE,
            hidden_size: 128,
            num_actions: NUM_MOVES,
            learning_rate: 0.01,
            momentum: 0.9,
            weight_decay: 1e-4,
            value_loss_weight: 1.0,
            seed: 0,
        }
    }
}

impl MlpConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_hidden_size(mut self, hidden_size: usize) -> Self {
        self.hidden_size = hidden_size;
        self
    }

    /// Total number of trainable scalars.
    pub fn num_parameters(&self) -> usize {
        let h = self.hidden_size;
        (self.input_size + 1) * h + (h + 1) * h + (h + 1) * self.num_actions + (h + 1)
    }
}
