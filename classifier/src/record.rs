use metrics::{EpochMetrics, History};
use serde::{Deserialize, Serialize};
use training::TrainingReport;

/// What a finished run writes to `history.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub train: History,
    pub validation: History,
    pub improvement_epochs: Vec<usize>,
    pub best_epoch: Option<usize>,
    pub epochs_run: usize,
    pub stopped_early: bool,
    /// Metrics of the final model on the held-out test split, if there was one.
    pub test: Option<EpochMetrics>,
}

impl RunRecord {
    pub fn new(report: &TrainingReport, test: Option<EpochMetrics>) -> Self {
        Self {
            train: report.train.clone(),
            validation: report.validation.clone(),
            improvement_epochs: report.improvement_epochs.clone(),
            best_epoch: report.best_epoch(),
            epochs_run: report.epochs_run,
            stopped_early: report.stopped_early,
            test,
        }
    }
}
