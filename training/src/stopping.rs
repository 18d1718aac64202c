use metrics::History;

use crate::{Error, Result};

/// Thresholds carried from one epoch to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct StoppingState {
    /// Validation loss of the best epoch so far.
    pub best_loss: f64,

    /// Monitored average recall of the best epoch so far.
    pub best_recall: f64,

    /// Consecutive epochs without improvement.
    pub unchanged_epochs: usize,

    /// 1-based numbers of every epoch that improved, oldest first.
    pub improvement_epochs: Vec<usize>,
}

impl Default for StoppingState {
    fn default() -> Self {
        Self {
            best_loss: f64::INFINITY,
            best_recall: 0.0,
            unchanged_epochs: 0,
            improvement_epochs: Vec::new(),
        }
    }
}

impl StoppingState {
    pub fn best_epoch(&self) -> Option<usize> {
        self.improvement_epochs.last().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// New best model, both loss and monitored recall improved.
    Improved,
    /// No improvement, patience not yet exhausted.
    Unchanged,
    /// Patience exhausted, training should end.
    Stop,
}

/// Early stopping on validation loss and the recall of the monitored classes.
///
/// An epoch counts as an improvement only when the validation loss drops
/// below the best loss *and* the average recall over the monitored classes
/// rises above the best recall, both strictly. A model that keeps lowering
/// its loss on the majority classes while the minority recall stalls does
/// not count.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience: usize,
    num_classes: usize,
    normal_classes: Vec<usize>,
    target_classes: Vec<usize>,
}

impl EarlyStopping {
    /// `normal_classes` are excluded from the monitored recall.
    ///
    /// Fails if a label is out of range or if nothing would be left to monitor.
    pub fn new(
        num_classes: usize,
        patience: usize,
        normal_classes: Option<&[usize]>,
    ) -> Result<Self> {
        if patience == 0 {
            return Err(Error::InvalidConfig("patience must be at least 1".into()));
        }

        let normal_classes = normal_classes.map(<[usize]>::to_vec).unwrap_or_default();
        if let Some(&label) = normal_classes.iter().find(|&&c| c >= num_classes) {
            return Err(Error::InvalidConfig(format!(
                "normal class {} is out of range for {} classes",
                label, num_classes
            )));
        }

        let target_classes: Vec<usize> = (0..num_classes)
            .filter(|c| !normal_classes.contains(c))
            .collect();

        let policy = Self {
            patience,
            num_classes,
            normal_classes,
            target_classes,
        };
        policy.ensure_targets()?;

        Ok(policy)
    }

    pub fn patience(&self) -> usize {
        self.patience
    }

    /// Classes whose recall is monitored.
    pub fn target_classes(&self) -> &[usize] {
        &self.target_classes
    }

    /// Mean recall over the monitored classes.
    pub fn target_recall(&self, recall_per_class: &[f64]) -> Result<f64> {
        self.ensure_targets()?;

        if recall_per_class.len() != self.num_classes {
            return Err(metrics::Error::ClassCountMismatch {
                expected: self.num_classes,
                got: recall_per_class.len(),
            }
            .into());
        }

        let sum: f64 = self.target_classes.iter().map(|&c| recall_per_class[c]).sum();
        Ok(sum / self.target_classes.len() as f64)
    }

    /// Pure transition: returns the next state and what to do with the model.
    ///
    /// `epoch` is 1-based and is what gets recorded on improvement.
    pub fn evaluate(
        &self,
        state: &StoppingState,
        epoch: usize,
        val_loss: f64,
        recall_per_class: &[f64],
    ) -> Result<(StoppingState, Decision)> {
        let recall = self.target_recall(recall_per_class)?;
        let mut next = state.clone();

        if val_loss < state.best_loss && state.best_recall < recall {
            next.best_loss = val_loss;
            next.best_recall = recall;
            next.unchanged_epochs = 0;
            next.improvement_epochs.push(epoch);
            return Ok((next, Decision::Improved));
        }

        next.unchanged_epochs += 1;

        // The counter moves one step at a time, so >= fires on the same epoch
        // as == would.
        let decision = if next.unchanged_epochs >= self.patience {
            Decision::Stop
        } else {
            Decision::Unchanged
        };

        Ok((next, decision))
    }

    /// Evaluates the most recent epoch of a validation history.
    pub fn check(
        &self,
        state: &StoppingState,
        history: &History,
    ) -> Result<(StoppingState, Decision)> {
        let (Some(loss), Some(recall)) = (
            history.latest_loss(),
            history.latest_recall_per_class(),
        ) else {
            return Err(Error::InvalidConfig(
                "early stopping needs at least one validation epoch".into(),
            ));
        };

        self.evaluate(state, history.len(), loss, &recall)
    }

    fn ensure_targets(&self) -> Result<()> {
        if self.target_classes.is_empty() {
            return Err(Error::NoTargetClasses {
                normal: self.normal_classes.clone(),
                num_classes: self.num_classes,
            });
        }
        Ok(())
    }
}
