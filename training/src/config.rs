use crate::{Error, Result};

pub const DEFAULT_MAX_EPOCHS: usize = 100;
pub const DEFAULT_PATIENCE: usize = 20;

/// Options fixed for the whole training run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainConfig {
    /// Upper bound on the number of epochs.
    pub max_epochs: usize,

    /// Consecutive epochs without improvement before stopping.
    pub patience: usize,

    pub num_classes: usize,

    /// Classes left out of the recall that early stopping monitors,
    /// typically the healthy ones. `None` monitors every class.
    pub normal_classes: Option<Vec<usize>>,

    /// Load the best snapshot back into the model once training ends.
    pub restore_best: bool,

    /// Draw per-batch progress bars.
    pub show_progress: bool,
}

impl TrainConfig {
    pub fn new(num_classes: usize) -> Self {
        Self {
            max_epochs: DEFAULT_MAX_EPOCHS,
            patience: DEFAULT_PATIENCE,
            num_classes,
            normal_classes: None,
            restore_best: true,
            show_progress: true,
        }
    }

    pub fn with_max_epochs(mut self, max_epochs: usize) -> Self {
        self.max_epochs = max_epochs;
        self
    }

    pub fn with_patience(mut self, patience: usize) -> Self {
        self.patience = patience;
        self
    }

    pub fn with_normal_classes(mut self, normal_classes: Vec<usize>) -> Self {
        self.normal_classes = Some(normal_classes);
        self
    }

    pub fn with_restore_best(mut self, restore_best: bool) -> Self {
        self.restore_best = restore_best;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Checks the plain numeric options. Normal class labels are checked by
    /// [`crate::EarlyStopping::new`].
    pub fn validate(&self) -> Result<()> {
        if self.num_classes == 0 {
            return Err(Error::InvalidConfig("num_classes must be at least 1".into()));
        }
        if self.max_epochs == 0 {
            return Err(Error::InvalidConfig("max_epochs must be at least 1".into()));
        }
        if self.patience == 0 {
            return Err(Error::InvalidConfig("patience must be at least 1".into()));
        }
        Ok(())
    }
}
