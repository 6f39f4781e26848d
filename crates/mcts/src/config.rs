//! MCTS configuration parameters.
//!
//! These parameters control the behavior of the Monte Carlo Tree Search
//! algorithm. The simulation budget is passed per search call instead.

use crate::SearchError;

/// MCTS configuration parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct MctsConfig {
    /// PUCT exploration constant.
    /// Score = Q + c_puct * P * sqrt(N_parent) / (1 + N_child)
    pub c_puct: f32,

    /// Dirichlet noise alpha (for root exploration).
    /// Higher values = more uniform noise, lower = more concentrated.
    pub dirichlet_alpha: f32,

    /// Fraction of prior replaced with Dirichlet noise at root.
    /// 0 = no exploration noise, 1 = pure noise.
    pub exploration_fraction: f32,

    /// Whether root noise is applied at all.
    pub add_root_noise: bool,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            c_puct: 1.5,
            dirichlet_alpha: 0.3,
            exploration_fraction: 0.25,
            add_root_noise: true,
        }
    }
}

impl MctsConfig {
    /// Config for self-play with explicit exploration settings.
    pub fn for_self_play(c_puct: f32, dirichlet_alpha: f32, exploration_fraction: f32) -> Self {
        Self {
            c_puct,
            dirichlet_alpha,
            exploration_fraction,
            add_root_noise: true,
        }
    }

    /// Config for evaluation and gameplay (no exploration noise).
    pub fn for_evaluation() -> Self {
        Self {
            add_root_noise: false,
            exploration_fraction: 0.0,
            ..Default::default()
        }
    }

    /// Returns a copy with the given PUCT constant.
    pub fn with_c_puct(mut self, c_puct: f32) -> Self {
        self.c_puct = c_puct;
        self
    }

    /// True if root priors will actually be perturbed.
    pub fn noise_enabled(&self) -> bool {
        self.add_root_noise && self.exploration_fraction > 0.0
    }

    /// Rejects non-finite or out-of-range parameters.
    pub fn validate(&self) -> Result<(), SearchError> {
        if !(self.c_puct.is_finite() && self.c_puct >= 0.0) {
            return Err(SearchError::InvalidConfig(format!(
                "c_puct must be a non-negative number, got {}",
                self.c_puct
            )));
        }
        if !(0.0..=1.0).contains(&self.exploration_fraction) {
            return Err(SearchError::InvalidConfig(format!(
                "exploration_fraction must be in [0, 1], got {}",
                self.exploration_fraction
            )));
        }
        if self.noise_enabled() && !(self.dirichlet_alpha.is_finite() && self.dirichlet_alpha > 0.0)
        {
            return Err(SearchError::InvalidConfig(format!(
                "dirichlet_alpha must be positive, got {}",
                self.dirichlet_alpha
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MctsConfig::default();
        assert!((config.c_puct - 1.5).abs() < 1e-6);
        assert!((config.dirichlet_alpha - 0.3).abs() < 1e-6);
        assert!((config.exploration_fraction - 0.25).abs() < 1e-6);
        assert!(config.noise_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_for_evaluation() {
        let config = MctsConfig::for_evaluation().with_c_puct(2.0);
        assert!(!config.noise_enabled());
        assert_eq!(config.c_puct, 2.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            MctsConfig::default().with_c_puct(f32::NAN),
            MctsConfig::default().with_c_puct(-1.0),
            MctsConfig::for_self_play(1.0, 0.0, 0.25),
            MctsConfig::for_self_play(1.0, 0.3, 1.5),
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(SearchError::InvalidConfig(_))),
                "{config:?} should be rejected"
            );
        }
        // Alpha is irrelevant when noise is off.
        let mut quiet = MctsConfig::for_evaluation();
        quiet.dirichlet_alpha = 0.0;
        assert!(quiet.validate().is_ok());
    }
}
