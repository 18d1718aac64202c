use candle_core::{Result, Tensor};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::Error;

/// An input batch and its integer labels.
pub type Batch = (Tensor, Tensor);

/// A finite sequence of batches that can be walked once per epoch.
pub trait BatchSource {
    type Iter<'a>: Iterator<Item = Result<Batch>>
    where
        Self: 'a;

    /// Starts a fresh pass over the data.
    fn batches(&mut self) -> Self::Iter<'_>;

    fn num_batches(&self) -> usize;
}

/// Serves fixed-size batches from tensors held in memory.
pub struct TensorLoader {
    inputs: Tensor,
    labels: Tensor,
    batch_size: usize,
    order: Vec<u32>,
    rng: Option<StdRng>,
}

impl TensorLoader {
    /// `inputs` is `(N, ...)`, `labels` is `(N,)`.
    pub fn new(inputs: Tensor, labels: Tensor, batch_size: usize) -> crate::Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be at least 1".into()));
        }

        let num_samples = inputs.dim(0)?;
        let num_labels = labels.dim(0)?;
        if num_samples != num_labels {
            return Err(Error::InvalidConfig(format!(
                "{} input rows but {} labels",
                num_samples, num_labels
            )));
        }

        Ok(Self {
            inputs,
            labels,
            batch_size,
            order: (0..num_samples as u32).collect(),
            rng: None,
        })
    }

    /// Reshuffles the sample order before every pass.
    pub fn shuffled(mut self, seed: u64) -> Self {
        self.rng = Some(StdRng::seed_from_u64(seed));
        self
    }

    pub fn num_samples(&self) -> usize {
        self.order.len()
    }
}

impl BatchSource for TensorLoader {
    type Iter<'a> = TensorBatches<'a>;

    fn batches(&mut self) -> Self::Iter<'_> {
        if let Some(rng) = self.rng.as_mut() {
            self.order.shuffle(rng);
        }

        TensorBatches {
            loader: self,
            idx: 0,
        }
    }

    fn num_batches(&self) -> usize {
        self.num_samples().div_ceil(self.batch_size)
    }
}

pub struct TensorBatches<'a> {
    loader: &'a TensorLoader,
    idx: usize,
}

impl Iterator for TensorBatches<'_> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        let order = &self.loader.order;
        if self.idx >= order.len() {
            return None;
        }

        let end = (self.idx + self.loader.batch_size).min(order.len());
        let batch_order = &order[self.idx..end];
        self.idx = end;

        let select = || -> Result<Batch> {
            let device = self.loader.inputs.device();
            let idx = Tensor::from_slice(batch_order, batch_order.len(), device)?;
            let x = self.loader.inputs.index_select(&idx, 0)?;
            let y = self.loader.labels.index_select(&idx, 0)?;
            Ok((x, y))
        };

        Some(select())
    }
}
