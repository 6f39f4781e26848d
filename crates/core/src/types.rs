//! Policy distribution with enforced invariants.
//!
//! Policy: non-negative probabilities over action indices summing to 1.0.

use crate::PolicyError;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Tolerance for policy sum validation.
const POLICY_SUM_TOLERANCE: f32 = 1e-4;

/// Temperatures at or below this are treated as greedy selection.
pub const GREEDY_TEMPERATURE: f32 = 1e-3;

/// A probability distribution over action indices.
///
/// Invariant: All values are non-negative and sum to 1.0 (±1e-4).
///
/// # Example
/// ```
/// use uzero_core::Policy;
///
/// let policy = Policy::new(vec![0.3, 0.5, 0.2]).unwrap();
/// assert!((policy.sum() - 1.0).abs() < 1e-5);
/// assert_eq!(policy.argmax(), 1);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Policy(Vec<f32>);

impl Policy {
    /// Create a new policy from a probability distribution.
    ///
    /// # Errors
    /// Returns an error if the vector is empty, holds a negative or
    /// non-finite value, or does not sum to 1.0.
    pub fn new(probs: Vec<f32>) -> Result<Self, PolicyError> {
        check_entries(&probs)?;
        let sum: f32 = probs.iter().sum();
        if (sum - 1.0).abs() > POLICY_SUM_TOLERANCE {
            return Err(PolicyError::BadSum(sum));
        }
        Ok(Self(probs))
    }

    /// Create a policy from raw non-negative weights, normalizing them.
    pub fn from_unnormalized(values: Vec<f32>) -> Result<Self, PolicyError> {
        check_entries(&values)?;
        let sum: f32 = values.iter().sum();
        if sum <= 0.0 {
            return Err(PolicyError::AllZero);
        }
        Ok(Self(values.into_iter().map(|v| v / sum).collect()))
    }

    /// Uniform over `indices`, zero elsewhere, in a vector of length `len`.
    pub fn uniform_over(indices: &[usize], len: usize) -> Result<Self, PolicyError> {
        if indices.is_empty() {
            return Err(PolicyError::Empty);
        }
        let mut probs = vec![0.0; len];
        let p = 1.0 / indices.len() as f32;
        for &index in indices {
            let slot = probs
                .get_mut(index)
                .ok_or(PolicyError::OutOfRange { index, len })?;
            *slot = p;
        }
        Ok(Self(probs))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sum(&self) -> f32 {
        self.0.iter().sum()
    }

    /// Index of the maximum probability. Ties go to the lowest index.
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        for (i, &p) in self.0.iter().enumerate() {
            if p > self.0[best] {
                best = i;
            }
        }
        best
    }

    /// Sample an index with probability proportional to `p^(1/temperature)`.
    ///
    /// Temperatures at or below [`GREEDY_TEMPERATURE`] return [`Policy::argmax`].
    /// Zero-probability entries are never chosen.
    pub fn sample<R: Rng + ?Sized>(&self, temperature: f32, rng: &mut R) -> usize {
        if temperature <= GREEDY_TEMPERATURE {
            return self.argmax();
        }

        // Scale by the maximum first so small temperatures cannot underflow
        // every weight to zero.
        let max = self.0[self.argmax()] as f64;
        if max <= 0.0 {
            return self.argmax();
        }
        let inv_temp = 1.0 / temperature as f64;
        let weights: Vec<f64> = self
            .0
            .iter()
            .map(|&p| {
                if p > 0.0 {
                    (p as f64 / max).powf(inv_temp)
                } else {
                    0.0
                }
            })
            .collect();

        match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(rng),
            Err(_) => self.argmax(),
        }
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &f32> {
        self.0.iter()
    }
}

fn check_entries(values: &[f32]) -> Result<(), PolicyError> {
    if values.is_empty() {
        return Err(PolicyError::Empty);
    }
    if values.iter().any(|&v| !v.is_finite() || v < 0.0) {
        return Err(PolicyError::Negative);
    }
    Ok(())
}

impl std::ops::Index<usize> for Policy {
    type Output = f32;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IntoIterator for Policy {
    type Item = f32;
    type IntoIter = std::vec::IntoIter<f32>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
