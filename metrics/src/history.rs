use serde::{Deserialize, Serialize};

use crate::{EpochMetrics, Error, Result};

/// Append-only per-epoch time series of one phase.
///
/// Index `e` of every series belongs to epoch `e` (0-based). Per-class series
/// are indexed by class first: `recall_per_class()[c][e]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHistory")]
pub struct History {
    loss: Vec<f64>,
    accuracy: Vec<f64>,
    avg_recall: Vec<f64>,
    avg_precision: Vec<f64>,
    avg_f1: Vec<f64>,
    recall_per_class: Vec<Vec<f64>>,
    precision_per_class: Vec<Vec<f64>>,
    f1_per_class: Vec<Vec<f64>>,
}

/// Unchecked wire form, validated into a [`History`].
#[derive(Deserialize)]
struct RawHistory {
    loss: Vec<f64>,
    accuracy: Vec<f64>,
    avg_recall: Vec<f64>,
    avg_precision: Vec<f64>,
    avg_f1: Vec<f64>,
    recall_per_class: Vec<Vec<f64>>,
    precision_per_class: Vec<Vec<f64>>,
    f1_per_class: Vec<Vec<f64>>,
}

impl TryFrom<RawHistory> for History {
    type Error = Error;

    fn try_from(raw: RawHistory) -> Result<Self> {
        let epochs = raw.loss.len();
        let num_classes = raw.recall_per_class.len();

        for (series, values) in [
            ("accuracy", &raw.accuracy),
            ("avg_recall", &raw.avg_recall),
            ("avg_precision", &raw.avg_precision),
            ("avg_f1", &raw.avg_f1),
        ] {
            check_len(series, values.len(), epochs)?;
        }

        for (series, per_class) in [
            ("recall_per_class", &raw.recall_per_class),
            ("precision_per_class", &raw.precision_per_class),
            ("f1_per_class", &raw.f1_per_class),
        ] {
            if per_class.len() != num_classes {
                return Err(Error::ClassCountMismatch {
                    expected: num_classes,
                    got: per_class.len(),
                });
            }
            for values in per_class {
                check_len(series, values.len(), epochs)?;
            }
        }

        Ok(Self {
            loss: raw.loss,
            accuracy: raw.accuracy,
            avg_recall: raw.avg_recall,
            avg_precision: raw.avg_precision,
            avg_f1: raw.avg_f1,
            recall_per_class: raw.recall_per_class,
            precision_per_class: raw.precision_per_class,
            f1_per_class: raw.f1_per_class,
        })
    }
}

fn check_len(series: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(Error::SeriesLengthMismatch {
            series,
            expected,
            got,
        });
    }
    Ok(())
}

impl History {
    pub fn new(num_classes: usize) -> Self {
        Self {
            loss: Vec::new(),
            accuracy: Vec::new(),
            avg_recall: Vec::new(),
            avg_precision: Vec::new(),
            avg_f1: Vec::new(),
            recall_per_class: vec![Vec::new(); num_classes],
            precision_per_class: vec![Vec::new(); num_classes],
            f1_per_class: vec![Vec::new(); num_classes],
        }
    }

    pub fn append(&mut self, metrics: &EpochMetrics) -> Result<()> {
        if metrics.num_classes() != self.num_classes() {
            return Err(Error::ClassCountMismatch {
                expected: self.num_classes(),
                got: metrics.num_classes(),
            });
        }

        self.loss.push(metrics.loss);
        self.accuracy.push(metrics.accuracy);
        self.avg_recall.push(metrics.avg_recall);
        self.avg_precision.push(metrics.avg_precision);
        self.avg_f1.push(metrics.avg_f1);

        for c in 0..self.num_classes() {
            self.recall_per_class[c].push(metrics.recall_per_class[c]);
            self.precision_per_class[c].push(metrics.precision_per_class[c]);
            self.f1_per_class[c].push(metrics.f1_per_class[c]);
        }

        Ok(())
    }

    /// Number of epochs recorded.
    pub fn len(&self) -> usize {
        self.loss.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loss.is_empty()
    }

    pub fn num_classes(&self) -> usize {
        self.recall_per_class.len()
    }

    pub fn loss(&self) -> &[f64] {
        &self.loss
    }

    pub fn accuracy(&self) -> &[f64] {
        &self.accuracy
    }

    pub fn avg_recall(&self) -> &[f64] {
        &self.avg_recall
    }

    pub fn avg_precision(&self) -> &[f64] {
        &self.avg_precision
    }

    pub fn avg_f1(&self) -> &[f64] {
        &self.avg_f1
    }

    pub fn recall_per_class(&self) -> &[Vec<f64>] {
        &self.recall_per_class
    }

    pub fn precision_per_class(&self) -> &[Vec<f64>] {
        &self.precision_per_class
    }

    pub fn f1_per_class(&self) -> &[Vec<f64>] {
        &self.f1_per_class
    }

    pub fn latest_loss(&self) -> Option<f64> {
        self.loss.last().copied()
    }

    /// Recall of every class at the most recent epoch.
    pub fn latest_recall_per_class(&self) -> Option<Vec<f64>> {
        if self.is_empty() {
            return None;
        }
        self.recall_per_class
            .iter()
            .map(|series| series.last().copied())
            .collect()
    }

    /// Rebuilds the metrics of a recorded epoch.
    pub fn epoch(&self, epoch: usize) -> Option<EpochMetrics> {
        fn column(series: &[Vec<f64>], epoch: usize) -> Option<Vec<f64>> {
            series.iter().map(|s| s.get(epoch).copied()).collect()
        }

        Some(EpochMetrics {
            loss: *self.loss.get(epoch)?,
            accuracy: *self.accuracy.get(epoch)?,
            avg_recall: *self.avg_recall.get(epoch)?,
            avg_precision: *self.avg_precision.get(epoch)?,
            avg_f1: *self.avg_f1.get(epoch)?,
            recall_per_class: column(&self.recall_per_class, epoch)?,
            precision_per_class: column(&self.precision_per_class, epoch)?,
            f1_per_class: column(&self.f1_per_class, epoch)?,
        })
    }
}
