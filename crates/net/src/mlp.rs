//! Two-layer perceptron with policy and value heads.

use crate::{checkpoint, MlpConfig};
use ndarray::{Array, Array1, Array2, ArrayView1, ArrayViewMut1, Axis, Dimension, Zip};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, trace};
use uzero_core::{Estimator, EstimatorError, Prediction, TrainStats, TrainingExample};

/// Learnable weights. Also reused as the gradient and velocity buffers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct Params {
    pub w1: Array2<f32>,
    pub b1: Array1<f32>,
    pub w2: Array2<f32>,
    pub b2: Array1<f32>,
    pub wp: Array2<f32>,
    pub bp: Array1<f32>,
    pub wv: Array2<f32>,
    pub bv: Array1<f32>,
}

struct Activations {
    z1: Array2<f32>,
    a1: Array2<f32>,
    z2: Array2<f32>,
    a2: Array2<f32>,
    logits: Array2<f32>,
    value: Array1<f32>,
}

/// Training batch laid out row-per-example.
struct Batch {
    x: Array2<f32>,
    target: Array2<f32>,
    mask: Array2<f32>,
    z: Array1<f32>,
}

impl Params {
    /// He-uniform weights, zero biases.
    fn init(config: &MlpConfig, rng: &mut ChaCha8Rng) -> Self {
        let h = config.hidden_size;
        Self {
            w1: he_uniform(config.input_size, h, rng),
            b1: Array1::zeros(h),
            w2: he_uniform(h, h, rng),
            b2: Array1::zeros(h),
            wp: he_uniform(h, config.num_actions, rng),
            bp: Array1::zeros(config.num_actions),
            wv: he_uniform(h, 1, rng),
            bv: Array1::zeros(1),
        }
    }

    pub(crate) fn zeros(config: &MlpConfig) -> Self {
        let h = config.hidden_size;
        Self {
            w1: Array2::zeros((config.input_size, h)),
            b1: Array1::zeros(h),
            w2: Array2::zeros((h, h)),
            b2: Array1::zeros(h),
            wp: Array2::zeros((h, config.num_actions)),
            bp: Array1::zeros(config.num_actions),
            wv: Array2::zeros((h, 1)),
            bv: Array1::zeros(1),
        }
    }

    /// Checks every array against the dimensions in `config`.
    pub(crate) fn check_shapes(&self, config: &MlpConfig) -> Result<(), EstimatorError> {
        let h = config.hidden_size;
        let expected: [(&str, &[usize], (usize, usize)); 8] = [
            ("w1", self.w1.shape(), (config.input_size, h)),
            ("b1", self.b1.shape(), (h, 1)),
            ("w2", self.w2.shape(), (h, h)),
            ("b2", self.b2.shape(), (h, 1)),
            ("wp", self.wp.shape(), (h, config.num_actions)),
            ("bp", self.bp.shape(), (config.num_actions, 1)),
            ("wv", self.wv.shape(), (h, 1)),
            ("bv", self.bv.shape(), (1, 1)),
        ];
        for (name, shape, (rows, cols)) in expected {
            let found = shape.iter().product::<usize>();
            let ok = match shape {
                [r, c] => *r == rows && *c == cols,
                [n] => *n == rows,
                _ => false,
            };
            if !ok {
                return Err(EstimatorError::Shape {
                    what: format!("parameter {name}"),
                    expected: rows * cols,
                    found,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn is_finite(&self) -> bool {
        all_finite(&self.w1)
            && all_finite(&self.b1)
            && all_finite(&self.w2)
            && all_finite(&self.b2)
            && all_finite(&self.wp)
            && all_finite(&self.bp)
            && all_finite(&self.wv)
            && all_finite(&self.bv)
    }

    fn forward(&self, x: &Array2<f32>) -> Activations {
        let z1 = x.dot(&self.w1) + &self.b1;
        let a1 = z1.mapv(relu);
        let z2 = a1.dot(&self.w2) + &self.b2;
        let a2 = z2.mapv(relu);
        let logits = a2.dot(&self.wp) + &self.bp;
        let value = (a2.dot(&self.wv) + &self.bv)
            .column(0)
            .mapv(f32::tanh);
        Activations {
            z1,
            a1,
            z2,
            a2,
            logits,
            value,
        }
    }

    /// Mean losses over the batch and their gradients.
    ///
    /// Policy loss is cross-entropy between the target and the softmax
    /// restricted to legal moves. Value loss is the squared error of the
    /// tanh output, scaled by `value_weight` in the gradient.
    fn gradients(&self, batch: &Batch, value_weight: f32) -> (Params, f32, f32) {
        let n = batch.x.nrows() as f32;
        let act = self.forward(&batch.x);

        let mut probs = act.logits.clone();
        let mut policy_loss = 0.0;
        for i in 0..probs.nrows() {
            let mask = batch.mask.row(i);
            masked_softmax(&mut probs.row_mut(i), &mask);
            for ((&p, &m), &t) in probs.row(i).iter().zip(mask).zip(batch.target.row(i)) {
                if m > 0.0 && t > 0.0 {
                    policy_loss -= t * p.max(1e-12).ln();
                }
            }
        }
        policy_loss /= n;
        let dlogits = (&probs - &batch.target) * &batch.mask / n;

        let diff = &act.value - &batch.z;
        let value_loss = diff.mapv(|d| d * d).sum() / n;
        let dvalue = (&diff * &act.value.mapv(|v| 1.0 - v * v)) * (2.0 * value_weight / n);
        let dvalue = dvalue.insert_axis(Axis(1));

        let wp = act.a2.t().dot(&dlogits);
        let bp = dlogits.sum_axis(Axis(0));
        let wv = act.a2.t().dot(&dvalue);
        let bv = dvalue.sum_axis(Axis(0));

        let da2 = dlogits.dot(&self.wp.t()) + dvalue.dot(&self.wv.t());
        let dz2 = da2 * &act.z2.mapv(relu_grad);
        let w2 = act.a1.t().dot(&dz2);
        let b2 = dz2.sum_axis(Axis(0));

        let da1 = dz2.dot(&self.w2.t());
        let dz1 = da1 * &act.z1.mapv(relu_grad);
        let w1 = batch.x.t().dot(&dz1);
        let b1 = dz1.sum_axis(Axis(0));

        let grads = Params {
            w1,
            b1,
            w2,
            b2,
            wp,
            bp,
            wv,
            bv,
        };
        (grads, policy_loss, value_loss)
    }
}

fn relu(v: f32) -> f32 {
    v.max(0.0)
}

fn relu_grad(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else {
        0.0
    }
}

fn he_uniform(fan_in: usize, fan_out: usize, rng: &mut ChaCha8Rng) -> Array2<f32> {
    let limit = (6.0 / fan_in.max(1) as f32).sqrt();
    Array2::from_shape_fn((fan_in, fan_out), |_| rng.gen_range(-limit..limit))
}

fn all_finite<D: Dimension>(a: &Array<f32, D>) -> bool {
    a.iter().all(|v| v.is_finite())
}

/// Softmax over the entries where `mask` is positive; masked entries become 0.
fn masked_softmax(row: &mut ArrayViewMut1<f32>, mask: &ArrayView1<f32>) {
    let max = row
        .iter()
        .zip(mask)
        .filter(|(_, &m)| m > 0.0)
        .map(|(&l, _)| l)
        .fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for (l, &m) in row.iter_mut().zip(mask) {
        if m > 0.0 {
            *l = (*l - max).exp();
            sum += *l;
        } else {
            *l = 0.0;
        }
    }
    if sum > 0.0 {
        row.mapv_inplace(|v| v / sum);
    }
}

/// One SGD-with-momentum update: `v = mu*v + g + wd*w; w -= lr*v`.
fn sgd_step<D: Dimension>(
    w: &mut Array<f32, D>,
    v: &mut Array<f32, D>,
    g: &Array<f32, D>,
    lr: f32,
    mu: f32,
    wd: f32,
) {
    Zip::from(w).and(v).and(g).for_each(|w, v, &g| {
        *v = mu * *v + g + wd * *w;
        *w -= lr * *v;
    });
}

/// The default [`Estimator`]: a small MLP trained with SGD + momentum.
///
/// Prediction is a pure read of the parameters, so one instance can be
/// shared by reference across self-play threads.
#[derive(Clone, Debug)]
pub struct MlpEstimator {
    config: MlpConfig,
    params: Params,
    velocity: Params,
    steps: u64,
}

impl MlpEstimator {
    /// Freshly initialized network, seeded from `config.seed`.
    pub fn new(config: MlpConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let params = Params::init(&config, &mut rng);
        let velocity = Params::zeros(&config);
        Self {
            config,
            params,
            velocity,
            steps: 0,
        }
    }

    /// Builds an estimator directly from a checkpoint file.
    pub fn from_checkpoint(path: &Path) -> Result<Self, EstimatorError> {
        let (config, params) = checkpoint::read(path)?;
        let velocity = Params::zeros(&config);
        Ok(Self {
            config,
            params,
            velocity,
            steps: 0,
        })
    }

    pub fn config(&self) -> &MlpConfig {
        &self.config
    }

    /// Optimizer steps taken since construction or the last load.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn prepare_batch(&self, batch: &[TrainingExample]) -> Result<Batch, EstimatorError> {
        if batch.is_empty() {
            return Err(EstimatorError::InvalidBatch("batch is empty".into()));
        }
        let input = self.config.input_size;
        let actions = self.config.num_actions;
        let rows = batch.len();

        let mut x = Array2::zeros((rows, input));
        let mut target = Array2::zeros((rows, actions));
        let mut mask = Array2::zeros((rows, actions));
        let mut z = Array1::zeros(rows);

        for (i, example) in batch.iter().enumerate() {
            check_len("observation", input, example.observation.len())?;
            check_len("policy target", actions, example.policy.len())?;
            check_len("legal mask", actions, example.legal_mask.len())?;
            if !example.value.is_finite() || example.value.abs() > 1.0 {
                return Err(EstimatorError::InvalidBatch(format!(
                    "value target {} outside [-1, 1]",
                    example.value
                )));
            }
            if example.observation.iter().any(|v| !v.is_finite()) {
                return Err(EstimatorError::NonFinite("observation"));
            }

            let legal = example.legal_mask.iter().filter(|&&l| l).count();
            if legal == 0 {
                return Err(EstimatorError::InvalidBatch(
                    "example has no legal moves".into(),
                ));
            }
            let legal_mass: f32 = example
                .policy
                .iter()
                .zip(&example.legal_mask)
                .filter(|(_, &l)| l)
                .map(|(&p, _)| p.max(0.0))
                .sum();

            x.row_mut(i)
                .iter_mut()
                .zip(&example.observation)
                .for_each(|(dst, &src)| *dst = src);
            for (a, (&p, &l)) in example.policy.iter().zip(&example.legal_mask).enumerate() {
                if !l {
                    continue;
                }
                mask[[i, a]] = 1.0;
                target[[i, a]] = if legal_mass > 0.0 && legal_mass.is_finite() {
                    p.max(0.0) / legal_mass
                } else {
                    1.0 / legal as f32
                };
            }
            z[i] = example.value;
        }

        Ok(Batch { x, target, mask, z })
    }

    fn apply_gradients(&mut self, grads: &Params) {
        let lr = self.config.learning_rate;
        let mu = self.config.momentum;
        let wd = self.config.weight_decay;
        let (p, v) = (&mut self.params, &mut self.velocity);
        sgd_step(&mut p.w1, &mut v.w1, &grads.w1, lr, mu, wd);
        sgd_step(&mut p.b1, &mut v.b1, &grads.b1, lr, mu, 0.0);
        sgd_step(&mut p.w2, &mut v.w2, &grads.w2, lr, mu, wd);
        sgd_step(&mut p.b2, &mut v.b2, &grads.b2, lr, mu, 0.0);
        sgd_step(&mut p.wp, &mut v.wp, &grads.wp, lr, mu, wd);
        sgd_step(&mut p.bp, &mut v.bp, &grads.bp, lr, mu, 0.0);
        sgd_step(&mut p.wv, &mut v.wv, &grads.wv, lr, mu, wd);
        sgd_step(&mut p.bv, &mut v.bv, &grads.bv, lr, mu, 0.0);
    }
}

fn check_len(what: &str, expected: usize, found: usize) -> Result<(), EstimatorError> {
    if expected == found {
        Ok(())
    } else {
        Err(EstimatorError::Shape {
            what: what.to_string(),
            expected,
            found,
        })
    }
}

impl Estimator for MlpEstimator {
    fn predict(&self, observation: &[f32]) -> Result<Prediction, EstimatorError> {
        check_len("observation", self.config.input_size, observation.len())?;
        if observation.iter().any(|v| !v.is_finite()) {
            return Err(EstimatorError::NonFinite("observation"));
        }

        let x = Array2::from_shape_vec((1, observation.len()), observation.to_vec()).map_err(
            |_| EstimatorError::Shape {
                what: "observation".into(),
                expected: self.config.input_size,
                found: observation.len(),
            },
        )?;
        let act = self.params.forward(&x);

        let mut logits = act.logits.row(0).to_owned();
        let mask = Array1::<f32>::ones(logits.len());
        masked_softmax(&mut logits.view_mut(), &mask.view());
        let value = act.value[0];

        if !value.is_finite() {
            return Err(EstimatorError::NonFinite("value"));
        }
        if !all_finite(&logits) {
            return Err(EstimatorError::NonFinite("policy"));
        }

        Ok(Prediction {
            value: value.clamp(-1.0, 1.0),
            policy: logits.to_vec(),
        })
    }

    fn train(&mut self, batch: &[TrainingExample]) -> Result<TrainStats, EstimatorError> {
        let prepared = self.prepare_batch(batch)?;
        let (grads, policy_loss, value_loss) = self
            .params
            .gradients(&prepared, self.config.value_loss_weight);

        if !policy_loss.is_finite() || !value_loss.is_finite() || !grads.is_finite() {
            return Err(EstimatorError::NonFinite("gradients"));
        }
        self.apply_gradients(&grads);
        self.steps += 1;

        trace!(
            step = self.steps,
            policy_loss,
            value_loss,
            batch = batch.len(),
            "sgd step"
        );
        Ok(TrainStats {
            policy_loss,
            value_loss,
            batch_size: batch.len(),
        })
    }

    fn save(&self, path: &Path) -> Result<(), EstimatorError> {
        checkpoint::write(path, &self.config, &self.params)?;
        debug!(path = %path.display(), "saved checkpoint");
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<(), EstimatorError> {
        let (config, params) = checkpoint::read(path)?;
        check_len("checkpoint input size", self.config.input_size, config.input_size)?;
        check_len("checkpoint action count", self.config.num_actions, config.num_actions)?;

        self.velocity = Params::zeros(&config);
        self.config = config;
        self.params = params;
        self.steps = 0;
        debug!(path = %path.display(), "loaded checkpoint");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn tiny_config() -> MlpConfig {
        MlpConfig {
            input_size: 6,
            hidden_size: 5,
            num_actions: 4,
            learning_rate: 0.02,
            momentum: 0.9,
            weight_decay: 0.0,
            value_loss_weight: 1.0,
            seed: 7,
        }
    }

    fn example(obs: [f32; 6], target: usize, value: f32) -> TrainingExample {
        let mut policy = vec![0.0; 4];
        policy[target] = 1.0;
        TrainingExample {
            observation: obs.to_vec(),
            policy,
            legal_mask: vec![true, true, true, false],
            value,
        }
    }

    fn tiny_batch() -> Vec<TrainingExample> {
        vec![
            example([1.0, 0.0, 0.5, 0.0, 1.0, 0.2], 0, 1.0),
            example([0.0, 1.0, 0.0, 0.5, 1.0, 0.8], 2, -1.0),
            example([0.3, 0.3, 1.0, 0.0, 1.0, 0.0], 1, 0.0),
        ]
    }

    #[test]
    fn test_predict_is_distribution() {
        let net = MlpEstimator::new(MlpConfig::default());
        let prediction = net.predict(&vec![0.5; 648]).unwrap();

        assert_eq!(prediction.policy.len(), 81);
        assert_abs_diff_eq!(prediction.policy.iter().sum::<f32>(), 1.0, epsilon = 1e-4);
        assert!(prediction.policy.iter().all(|&p| p >= 0.0));
        assert!((-1.0..=1.0).contains(&prediction.value));
    }

    #[test]
    fn test_predict_rejects_wrong_length() {
        let net = MlpEstimator::new(MlpConfig::default());
        let err = net.predict(&[0.0; 10]).unwrap_err();
        assert!(matches!(
            err,
            EstimatorError::Shape {
                expected: 648,
                found: 10,
                ..
            }
        ));
    }

    #[test]
    fn test_predict_rejects_nan_input() {
        let net = MlpEstimator::new(tiny_config());
        let err = net.predict(&[0.0, f32::NAN, 0.0, 0.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, EstimatorError::NonFinite(_)));
    }

    #[test]
    fn test_same_seed_same_network() {
        let a = MlpEstimator::new(tiny_config());
        let b = MlpEstimator::new(tiny_config());
        assert_eq!(a.params, b.params);

        let c = MlpEstimator::new(tiny_config().with_seed(8));
        assert_ne!(a.params, c.params);
    }

    #[test]
    fn test_training_reduces_loss() {
        let mut net = MlpEstimator::new(tiny_config());
        let batch = tiny_batch();

        let first = net.train(&batch).unwrap();
        let mut last = first;
        for _ in 0..300 {
            last = net.train(&batch).unwrap();
        }

        assert_eq!(last.batch_size, 3);
        assert!(
            last.total(1.0) < first.total(1.0) * 0.5,
            "loss did not fall: {:?} -> {:?}",
            first,
            last
        );
        assert_eq!(net.steps(), 301);
    }

    #[test]
    fn test_trained_policy_ignores_illegal_moves() {
        let mut net = MlpEstimator::new(tiny_config());
        let batch = tiny_batch();
        for _ in 0..300 {
            net.train(&batch).unwrap();
        }
        let prediction = net.predict(&batch[0].observation).unwrap();
        let best = prediction
            .policy
            .iter()
            .enumerate()
            .take(3)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(best, Some(0));
    }

    #[test]
    fn test_train_rejects_bad_batches() {
        let mut net = MlpEstimator::new(tiny_config());
        let before = net.params.clone();

        assert!(matches!(
            net.train(&[]),
            Err(EstimatorError::InvalidBatch(_))
        ));

        let mut short = tiny_batch();
        short[1].observation.pop();
        assert!(matches!(
            net.train(&short),
            Err(EstimatorError::Shape { .. })
        ));

        let mut no_legal = tiny_batch();
        no_legal[0].legal_mask = vec![false; 4];
        assert!(matches!(
            net.train(&no_legal),
            Err(EstimatorError::InvalidBatch(_))
        ));

        let mut bad_value = tiny_batch();
        bad_value[2].value = 2.0;
        assert!(matches!(
            net.train(&bad_value),
            Err(EstimatorError::InvalidBatch(_))
        ));

        assert_eq!(net.params, before);
        assert_eq!(net.steps(), 0);
    }

    #[test]
    fn test_output_bias_gradients_match_finite_differences() {
        let config = tiny_config();
        let net = MlpEstimator::new(config.clone());
        let batch = net.prepare_batch(&tiny_batch()).unwrap();
        let (grads, _, _) = net.params.gradients(&batch, 1.0);

        let loss = |params: &Params| {
            let (_, p, v) = params.gradients(&batch, 1.0);
            p + v
        };
        let eps = 1e-2;

        for j in 0..config.num_actions {
            let mut plus = net.params.clone();
            plus.bp[j] += eps;
            let mut minus = net.params.clone();
            minus.bp[j] -= eps;
            let numeric = (loss(&plus) - loss(&minus)) / (2.0 * eps);
            assert_abs_diff_eq!(grads.bp[j], numeric, epsilon = 2e-3);
        }

        let mut plus = net.params.clone();
        plus.bv[0] += eps;
        let mut minus = net.params.clone();
        minus.bv[0] -= eps;
        let numeric = (loss(&plus) - loss(&minus)) / (2.0 * eps);
        assert_abs_diff_eq!(grads.bv[0], numeric, epsilon = 2e-3);
    }

    #[test]
    fn test_masked_softmax_zeroes_masked_entries() {
        let mut row = Array1::from(vec![1.0, 2.0, 3.0, 4.0]);
        let mask = Array1::from(vec![1.0, 0.0, 1.0, 0.0]);
        masked_softmax(&mut row.view_mut(), &mask.view());

        assert_eq!(row[1], 0.0);
        assert_eq!(row[3], 0.0);
        assert_abs_diff_eq!(row[0] + row[2], 1.0, epsilon = 1e-6);
        assert!(row[2] > row[0]);
    }

    #[test]
    fn test_check_shapes() {
        let config = tiny_config();
        let params = Params::zeros(&config);
        assert!(params.check_shapes(&config).is_ok());

        let wider = config.with_hidden_size(9);
        assert!(matches!(
            params.check_shapes(&wider),
            Err(EstimatorError::Shape { .. })
        ));
    }
}
