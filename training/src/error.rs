use std::io;

use thiserror::Error;

use crate::evaluation::Phase;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} phase produced no batches")]
    EmptyPhase(Phase),

    #[error("normal classes {normal:?} leave no class to monitor out of {num_classes}")]
    NoTargetClasses {
        normal: Vec<usize>,
        num_classes: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("snapshot is missing parameter '{0}'")]
    MissingParameter(String),

    #[error("parameter store lock was poisoned")]
    PoisonedLock,

    #[error(transparent)]
    Metrics(#[from] metrics::Error),

    #[error(transparent)]
    Candle(#[from] candle_core::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}
