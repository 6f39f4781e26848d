//! Default estimator for the self-play engine.
//!
//! A small fully-connected network on `ndarray`: two ReLU hidden layers
//! shared by a softmax policy head and a tanh value head, trained with
//! SGD + momentum. Parameters are persisted as versioned MessagePack
//! checkpoints.

mod checkpoint;
mod config;
mod mlp;

pub use checkpoint::{CHECKPOINT_MAGIC, CHECKPOINT_VERSION};
pub use config::MlpConfig;
pub use mlp::MlpEstimator;
