use std::fmt;

use candle_core::{DType, Tensor, D};
use candle_nn::ModuleT;
use metrics::{ClassCounts, EpochMetrics};

use crate::loader::BatchSource;
use crate::loss::{scalar, Loss};
use crate::progress::PhaseProgressBar;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Training,
    Validation,
    Test,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Training => "training",
            Phase::Validation => "validation",
            Phase::Test => "test",
        };
        f.write_str(name)
    }
}

/// Runs `model` over every batch of `source` in evaluation mode.
///
/// No parameters are updated. `counts` is reset first and holds the confusion
/// counts of this pass afterwards.
pub fn evaluate<M, L, B>(
    model: &M,
    loss_fn: &L,
    source: &mut B,
    counts: &mut ClassCounts,
    phase: Phase,
    show_progress: bool,
) -> Result<EpochMetrics>
where
    M: ModuleT + ?Sized,
    L: Loss + ?Sized,
    B: BatchSource,
{
    let progress = PhaseProgressBar::new(source.num_batches(), phase, show_progress);
    let mut running = RunningLoss::default();
    counts.reset(counts.num_classes());

    for batch in source.batches() {
        let (x, y) = batch?;
        let scores = model.forward_t(&x, false)?.detach();
        let loss = loss_fn.compute(&scores, &y)?;

        running.add(scalar(&loss)?);
        accumulate_batch(counts, &scores, &y)?;
        progress.update(running.mean());
    }

    finish_phase(counts, &running, phase, &progress)
}

/// Mean of per-batch losses over a phase.
#[derive(Debug, Default)]
pub(crate) struct RunningLoss {
    sum: f64,
    batches: usize,
}

impl RunningLoss {
    pub(crate) fn add(&mut self, loss: f64) {
        self.sum += loss;
        self.batches += 1;
    }

    pub(crate) fn mean(&self) -> f64 {
        self.sum / self.batches.max(1) as f64
    }
}

/// Arg-max of each row of `scores`.
pub fn predicted_labels(scores: &Tensor) -> candle_core::Result<Vec<u32>> {
    scores.argmax(D::Minus1)?.to_vec1::<u32>()
}

pub(crate) fn accumulate_batch(
    counts: &mut ClassCounts,
    scores: &Tensor,
    labels: &Tensor,
) -> Result<()> {
    let targets = labels.to_dtype(DType::U32)?.to_vec1::<u32>()?;
    let predictions = predicted_labels(scores)?;
    counts.accumulate(&targets, &predictions)?;
    Ok(())
}

pub(crate) fn finish_phase(
    counts: &ClassCounts,
    running: &RunningLoss,
    phase: Phase,
    progress: &PhaseProgressBar,
) -> Result<EpochMetrics> {
    if running.batches == 0 {
        progress.abandon();
        return Err(Error::EmptyPhase(phase));
    }

    let metrics = EpochMetrics::from_counts(counts, running.mean())?;
    progress.finish(metrics.loss, metrics.accuracy);
    Ok(metrics)
}
