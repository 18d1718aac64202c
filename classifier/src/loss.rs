use candle_core::{bail, DType, Device, Result, Tensor, D};
use candle_nn::ops::log_softmax;
use training::Loss;

pub use candle_nn::loss::cross_entropy;

/// Cross entropy where every sample is scaled by the weight of its true class.
///
/// The batch loss is the weighted mean `sum(w[y] * nll) / sum(w[y])`, so a
/// uniform weight vector gives plain cross entropy.
#[derive(Debug, Clone)]
pub struct WeightedCrossEntropy {
    weights: Tensor,
}

impl WeightedCrossEntropy {
    pub fn new(weights: &[f32], device: &Device) -> Result<Self> {
        if weights.is_empty() {
            bail!("class weights must not be empty");
        }
        Ok(Self {
            weights: Tensor::new(weights, device)?,
        })
    }

    /// Balanced weights `n / (k * count[c])` for `n` samples over `k` classes.
    ///
    /// Classes absent from `labels` get weight 1.
    pub fn inverse_frequency(labels: &[u32], num_classes: usize, device: &Device) -> Result<Self> {
        let mut counts = vec![0usize; num_classes];
        for &label in labels {
            match counts.get_mut(label as usize) {
                Some(count) => *count += 1,
                None => bail!("label {} is out of range for {} classes", label, num_classes),
            }
        }

        let total = labels.len() as f32;
        let weights: Vec<f32> = counts
            .iter()
            .map(|&count| {
                if count == 0 {
                    1.0
                } else {
                    total / (num_classes as f32 * count as f32)
                }
            })
            .collect();

        Self::new(&weights, device)
    }

    pub fn weights(&self) -> Result<Vec<f32>> {
        self.weights.to_vec1::<f32>()
    }
}

impl Loss for WeightedCrossEntropy {
    fn compute(&self, scores: &Tensor, labels: &Tensor) -> Result<Tensor> {
        let labels = labels.to_dtype(DType::U32)?;
        let log_probs = log_softmax(scores, D::Minus1)?;
        let nll = log_probs
            .gather(&labels.unsqueeze(1)?, 1)?
            .squeeze(1)?
            .neg()?;

        let weights = self.weights.index_select(&labels, 0)?;
        nll.mul(&weights)?.sum_all()?.div(&weights.sum_all()?)
    }
}
