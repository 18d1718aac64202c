use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{mean, round2, ClassCounts, Error, Result};

/// Metrics of one phase (training or validation) of one epoch.
///
/// All ratios are rounded to two decimals. Averages are macro averages,
/// each class weighs the same regardless of how many instances it has.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub loss: f64,
    pub accuracy: f64,
    pub avg_recall: f64,
    pub avg_precision: f64,
    pub avg_f1: f64,
    pub recall_per_class: Vec<f64>,
    pub precision_per_class: Vec<f64>,
    pub f1_per_class: Vec<f64>,
}

impl EpochMetrics {
    /// Derives the metrics of a finished phase from its counts.
    ///
    /// Fails with [`Error::NoInstances`] when nothing was accumulated, since
    /// accuracy has no meaning then.
    pub fn from_counts(counts: &ClassCounts, loss: f64) -> Result<Self> {
        let total = counts.total();
        if total == 0 {
            return Err(Error::NoInstances);
        }

        let num_classes = counts.num_classes();
        let mut recall_per_class = Vec::with_capacity(num_classes);
        let mut precision_per_class = Vec::with_capacity(num_classes);
        let mut f1_per_class = Vec::with_capacity(num_classes);

        for c in 0..num_classes {
            let correct = counts.correct_true()[c];
            let recall = ratio(correct, counts.target_true()[c]);
            let precision = ratio(correct, counts.predicted_true()[c]);

            recall_per_class.push(recall);
            precision_per_class.push(precision);
            f1_per_class.push(f1(precision, recall));
        }

        Ok(Self {
            loss,
            accuracy: round2(counts.total_correct() as f64 / total as f64),
            avg_recall: macro_average(&recall_per_class),
            avg_precision: macro_average(&precision_per_class),
            avg_f1: macro_average(&f1_per_class),
            recall_per_class,
            precision_per_class,
            f1_per_class,
        })
    }

    pub fn num_classes(&self) -> usize {
        self.recall_per_class.len()
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    round2(numerator as f64 / denominator as f64)
}

// Rounded before and after doubling, matching the reference numbers.
fn f1(precision: f64, recall: f64) -> f64 {
    let denominator = precision + recall;
    if denominator <= 0.0 {
        return 0.0;
    }
    round2(2.0 * round2(precision * recall / denominator))
}

fn macro_average(values: &[f64]) -> f64 {
    mean(values).map(round2).unwrap_or(0.0)
}

impl fmt::Display for EpochMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loss={:.4} Accuracy={:.2} Recall={:.2} Precision={:.2} F1={:.2} - Recall per class={:?}",
            self.loss,
            self.accuracy,
            self.avg_recall,
            self.avg_precision,
            self.avg_f1,
            self.recall_per_class
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn assert_approx_eq(actual: f64, expected: f64, label: &str) {
        assert!(
            (actual - expected).abs() < EPSILON,
            "{}: expected {}, got {}",
            label,
            expected,
            actual
        );
    }

    fn assert_slice_approx_eq(actual: &[f64], expected: &[f64], label: &str) {
        assert_eq!(actual.len(), expected.len(), "{} length", label);
        for (a, e) in actual.iter().zip(expected) {
            assert_approx_eq(*a, *e, label);
        }
    }

    #[test]
    fn test_two_class_scenario() {
        let counts = ClassCounts::from_parts(vec![10, 5], vec![9, 5], vec![8, 4]).unwrap();
        let metrics = EpochMetrics::from_counts(&counts, 0.5).unwrap();

        assert_slice_approx_eq(&metrics.recall_per_class, &[0.8, 0.8], "recall");
        assert_slice_approx_eq(&metrics.precision_per_class, &[0.89, 0.8], "precision");
        assert_slice_approx_eq(&metrics.f1_per_class, &[0.84, 0.8], "f1");
        assert_approx_eq(metrics.accuracy, 0.8, "accuracy");
        assert_approx_eq(metrics.avg_recall, 0.8, "avg recall");
        assert_approx_eq(metrics.avg_precision, 0.85, "avg precision");
        assert_approx_eq(metrics.avg_f1, 0.82, "avg f1");
        assert_approx_eq(metrics.loss, 0.5, "loss");
    }

    #[test]
    fn test_f1_rounds_before_doubling() {
        // 1.0 * 0.14 / 1.14 = 0.1228 -> 0.12 -> 0.24, a single rounding would give 0.25
        let counts = ClassCounts::from_parts(vec![7, 1], vec![1, 7], vec![1, 1]).unwrap();
        let metrics = EpochMetrics::from_counts(&counts, 0.0).unwrap();

        assert_slice_approx_eq(&metrics.recall_per_class, &[0.14, 1.0], "recall");
        assert_slice_approx_eq(&metrics.precision_per_class, &[1.0, 0.14], "precision");
        assert_slice_approx_eq(&metrics.f1_per_class, &[0.24, 0.24], "f1");
        assert_approx_eq(metrics.accuracy, 0.25, "accuracy");
    }

    #[test]
    fn test_class_never_seen_nor_predicted_scores_zero() {
        let counts = ClassCounts::from_parts(vec![4, 0, 2], vec![4, 0, 2], vec![4, 0, 2]).unwrap();
        let metrics = EpochMetrics::from_counts(&counts, 0.1).unwrap();

        assert_slice_approx_eq(&metrics.recall_per_class, &[1.0, 0.0, 1.0], "recall");
        assert_slice_approx_eq(&metrics.f1_per_class, &[1.0, 0.0, 1.0], "f1");
        assert_approx_eq(metrics.accuracy, 1.0, "accuracy");
        // Macro average still divides by all three classes.
        assert_approx_eq(metrics.avg_recall, 0.67, "avg recall");
    }

    #[test]
    fn test_no_instances_is_an_error() {
        let counts = ClassCounts::new(3);
        assert_eq!(
            EpochMetrics::from_counts(&counts, 0.0),
            Err(Error::NoInstances)
        );
    }

    #[test]
    fn test_derivation_is_pure() {
        let mut counts = ClassCounts::new(3);
        counts
            .accumulate(&[0, 1, 2, 2, 1, 0, 0], &[0, 2, 2, 1, 1, 0, 2])
            .unwrap();

        let first = EpochMetrics::from_counts(&counts, 1.25).unwrap();
        let second = EpochMetrics::from_counts(&counts, 1.25).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_per_class_metrics_stay_in_unit_range() {
        let mut counts = ClassCounts::new(4);
        let targets: Vec<u32> = (0..97).map(|i| (i * 7 % 4) as u32).collect();
        let predictions: Vec<u32> = (0..97).map(|i| (i * 3 % 4) as u32).collect();
        counts.accumulate(&targets, &predictions).unwrap();

        let metrics = EpochMetrics::from_counts(&counts, 0.0).unwrap();
        for values in [
            &metrics.recall_per_class,
            &metrics.precision_per_class,
            &metrics.f1_per_class,
        ] {
            assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn test_display() {
        let counts = ClassCounts::from_parts(vec![1, 1], vec![1, 1], vec![1, 0]).unwrap();
        let metrics = EpochMetrics::from_counts(&counts, 0.25).unwrap();
        let line = metrics.to_string();
        assert!(line.starts_with("Loss=0.2500 Accuracy=0.50"));
        assert!(line.ends_with("Recall per class=[1.0, 0.0]"));
    }
}
