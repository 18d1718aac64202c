//! Epoch-wise training driver for multi-class classifiers.
//!
//! [`Trainer`] alternates training and validation passes, records per-class
//! metrics for both, and stops early after `patience` epochs in which the
//! validation loss and the recall of the monitored (non-normal) classes did
//! not improve together. The best model is checkpointed as training goes.

mod checkpoint;
mod config;
mod error;
mod evaluation;
mod loader;
mod loss;
mod model;
mod progress;
mod scheduler;
mod stopping;
mod trainer;

#[cfg(test)]
mod tests;

pub use checkpoint::{CheckpointStore, SafetensorsStore};
pub use config::{TrainConfig, DEFAULT_MAX_EPOCHS, DEFAULT_PATIENCE};
pub use error::{Error, Result};
pub use evaluation::{evaluate, predicted_labels, Phase};
pub use loader::{Batch, BatchSource, TensorBatches, TensorLoader};
pub use loss::Loss;
pub use model::{Model, ModelSnapshot};
pub use scheduler::{ExponentialDecay, Scheduler, StepDecay};
pub use stopping::{Decision, EarlyStopping, StoppingState};
pub use trainer::{Trainer, TrainingReport};
