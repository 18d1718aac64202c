use candle_core::{DType, Result, Tensor};

/// Scalar loss over a batch of per-class scores and integer labels.
pub trait Loss {
    fn compute(&self, scores: &Tensor, labels: &Tensor) -> Result<Tensor>;
}

impl<F> Loss for F
where
    F: Fn(&Tensor, &Tensor) -> Result<Tensor>,
{
    fn compute(&self, scores: &Tensor, labels: &Tensor) -> Result<Tensor> {
        self(scores, labels)
    }
}

/// Reads a scalar loss tensor back to the host.
pub(crate) fn scalar(loss: &Tensor) -> Result<f64> {
    loss.to_dtype(DType::F64)?.to_scalar::<f64>()
}
