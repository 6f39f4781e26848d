//! Leaf evaluation: estimator output turned into per-move priors.
//!
//! The estimator returns a distribution over the whole action space. Search
//! only cares about legal moves, so the distribution is masked to them and
//! renormalized; if it puts no mass on any legal move the priors fall back
//! to uniform.

use tracing::debug;
use uzero_core::{Estimator, EstimatorError, Game};

use crate::SearchError;

/// Estimator output restricted to the legal moves of one position.
#[derive(Clone, Debug)]
pub struct Evaluation<A> {
    /// `(action, action index, prior)` for each legal move, ascending by index.
    pub priors: Vec<(A, usize, f32)>,

    /// Value for the side to move, clamped to [-1, 1].
    pub value: f32,
}

/// Masks `policy` to `legal` indices and renormalizes.
///
/// Returns a uniform distribution if the legal mass is zero or not finite.
pub fn mask_priors(policy: &[f32], legal: &[usize]) -> Vec<f32> {
    let masked: Vec<f32> = legal
        .iter()
        .map(|&i| policy.get(i).copied().unwrap_or(0.0).max(0.0))
        .collect();
    let sum: f32 = masked.iter().sum();

    if sum > 0.0 && sum.is_finite() {
        masked.into_iter().map(|p| p / sum).collect()
    } else {
        vec![1.0 / legal.len().max(1) as f32; legal.len()]
    }
}

/// Queries `estimator` for a non-terminal `state`.
///
/// # Errors
/// Propagates estimator failures, and rejects predictions whose policy has
/// the wrong length or whose value is not finite.
pub fn evaluate<G, E>(
    game: &G,
    estimator: &E,
    state: &G::State,
) -> Result<Evaluation<G::Action>, SearchError>
where
    G: Game,
    E: Estimator + ?Sized,
{
    let prediction = estimator.predict(&game.encode(state))?;
    if prediction.policy.len() != game.num_actions() {
        return Err(EstimatorError::Shape {
            what: "policy".to_string(),
            expected: game.num_actions(),
            found: prediction.policy.len(),
        }
        .into());
    }
    if !prediction.value.is_finite() {
        return Err(EstimatorError::NonFinite("value").into());
    }

    let mut legal: Vec<(G::Action, usize)> = game
        .legal_actions(state)
        .into_iter()
        .map(|a| (a, game.action_to_index(a)))
        .collect();
    legal.sort_by_key(|&(_, index)| index);

    let indices: Vec<usize> = legal.iter().map(|&(_, i)| i).collect();
    let priors = mask_priors(&prediction.policy, &indices);
    let legal_mass: f32 = indices
        .iter()
        .filter_map(|&i| prediction.policy.get(i))
        .sum();
    if legal_mass <= 0.0 || !legal_mass.is_finite() {
        debug!(
            legal = indices.len(),
            "estimator gave no usable mass to legal moves, using uniform priors"
        );
    }

    Ok(Evaluation {
        priors: legal
            .into_iter()
            .zip(priors)
            .map(|((action, index), prior)| (action, index, prior))
            .collect(),
        value: prediction.value.clamp(-1.0, 1.0),
    })
}
