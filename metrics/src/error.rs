use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("no instances were accumulated, accuracy is undefined")]
    NoInstances,

    #[error("label batch length mismatch: {targets} targets vs {predictions} predictions")]
    LengthMismatch { targets: usize, predictions: usize },

    #[error("label {label} is out of range for {num_classes} classes")]
    LabelOutOfRange { label: u32, num_classes: usize },

    #[error("metrics cover {got} classes, history expects {expected}")]
    ClassCountMismatch { expected: usize, got: usize },

    #[error("class {class}: {correct} correct exceeds {target} targets or {predicted} predictions")]
    InconsistentCounts {
        class: usize,
        target: u64,
        predicted: u64,
        correct: u64,
    },

    #[error("series '{series}' has {got} epochs, expected {expected}")]
    SeriesLengthMismatch {
        series: &'static str,
        expected: usize,
        got: usize,
    },
}
