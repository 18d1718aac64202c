use crate::{Error, Result};

/// Per-class confusion counters for a single phase of an epoch.
///
/// `target_true[c]` counts instances whose true label is `c`,
/// `predicted_true[c]` counts instances predicted as `c`, and
/// `correct_true[c]` counts instances that are both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassCounts {
    target_true: Vec<u64>,
    predicted_true: Vec<u64>,
    correct_true: Vec<u64>,
}

impl ClassCounts {
    pub fn new(num_classes: usize) -> Self {
        Self {
            target_true: vec![0; num_classes],
            predicted_true: vec![0; num_classes],
            correct_true: vec![0; num_classes],
        }
    }

    /// Builds counts directly, mostly useful for tests and replaying logs.
    ///
    /// A class can never have more correct predictions than targets or
    /// predictions.
    pub fn from_parts(
        target_true: Vec<u64>,
        predicted_true: Vec<u64>,
        correct_true: Vec<u64>,
    ) -> Result<Self> {
        let num_classes = target_true.len();
        for other in [predicted_true.len(), correct_true.len()] {
            if other != num_classes {
                return Err(Error::ClassCountMismatch {
                    expected: num_classes,
                    got: other,
                });
            }
        }

        for (class, ((&target, &predicted), &correct)) in target_true
            .iter()
            .zip(&predicted_true)
            .zip(&correct_true)
            .enumerate()
        {
            if correct > target || correct > predicted {
                return Err(Error::InconsistentCounts {
                    class,
                    target,
                    predicted,
                    correct,
                });
            }
        }

        Ok(Self {
            target_true,
            predicted_true,
            correct_true,
        })
    }

    /// Zeroes all counters, resizing to `num_classes`.
    pub fn reset(&mut self, num_classes: usize) {
        for counts in [
            &mut self.target_true,
            &mut self.predicted_true,
            &mut self.correct_true,
        ] {
            counts.clear();
            counts.resize(num_classes, 0);
        }
    }

    /// Adds one batch worth of labels.
    ///
    /// The batch is validated before anything is counted, so a rejected
    /// batch leaves the counters untouched.
    pub fn accumulate(&mut self, targets: &[u32], predictions: &[u32]) -> Result<()> {
        if targets.len() != predictions.len() {
            return Err(Error::LengthMismatch {
                targets: targets.len(),
                predictions: predictions.len(),
            });
        }

        let num_classes = self.num_classes();
        if let Some(&label) = targets
            .iter()
            .chain(predictions)
            .find(|&&label| label as usize >= num_classes)
        {
            return Err(Error::LabelOutOfRange { label, num_classes });
        }

        for (&target, &predicted) in targets.iter().zip(predictions) {
            self.target_true[target as usize] += 1;
            self.predicted_true[predicted as usize] += 1;
            if target == predicted {
                self.correct_true[target as usize] += 1;
            }
        }

        Ok(())
    }

    pub fn num_classes(&self) -> usize {
        self.target_true.len()
    }

    /// Number of instances accumulated since the last reset.
    pub fn total(&self) -> u64 {
        self.target_true.iter().sum()
    }

    pub fn total_correct(&self) -> u64 {
        self.correct_true.iter().sum()
    }

    pub fn target_true(&self) -> &[u64] {
        &self.target_true
    }

    pub fn predicted_true(&self) -> &[u64] {
        &self.predicted_true
    }

    pub fn correct_true(&self) -> &[u64] {
        &self.correct_true
    }
}
