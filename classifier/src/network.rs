use std::path::Path;

use candle_core::{DType, Device, Result, Tensor};
use candle_nn::{linear, Dropout, Linear, ModuleT, VarBuilder, VarMap};
use training::{Model, ModelSnapshot};

pub const DEFAULT_HIDDEN_SIZE: usize = 64;
pub const DEFAULT_DROPOUT: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkConfig {
    pub num_features: usize,
    pub num_classes: usize,
    pub hidden_size: usize,
    /// Probability of zeroing a hidden activation while training.
    pub dropout: f32,
}

impl NetworkConfig {
    pub fn new(num_features: usize, num_classes: usize) -> Self {
        Self {
            num_features,
            num_classes,
            hidden_size: DEFAULT_HIDDEN_SIZE,
            dropout: DEFAULT_DROPOUT,
        }
    }
}

/// Two hidden ReLU layers with dropout, followed by a linear layer producing
/// one unnormalized score per class.
pub struct Network {
    hidden1: Linear,
    hidden2: Linear,
    output: Linear,
    dropout: Dropout,
    varmap: VarMap,
}

impl Network {
    pub fn new(config: &NetworkConfig, device: &Device) -> Result<Self> {
        let varmap = VarMap::new();
        let vs = VarBuilder::from_varmap(&varmap, DType::F32, device);

        Ok(Self {
            hidden1: linear(config.num_features, config.hidden_size, vs.pp("hidden1"))?,
            hidden2: linear(config.hidden_size, config.hidden_size, vs.pp("hidden2"))?,
            output: linear(config.hidden_size, config.num_classes, vs.pp("output"))?,
            dropout: Dropout::new(config.dropout),
            varmap,
        })
    }

    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.varmap.save(path)
    }

    /// Overwrites the parameters with the ones stored at `path`.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.varmap.load(path)
    }
}

impl ModuleT for Network {
    fn forward_t(&self, x: &Tensor, train: bool) -> Result<Tensor> {
        let h1 = x
            .apply(&self.hidden1)?
            .relu()?
            .apply_t(&self.dropout, train)?;
        let h2 = h1
            .apply(&self.hidden2)?
            .relu()?
            .apply_t(&self.dropout, train)?;
        h2.apply(&self.output)
    }
}

impl Model for Network {
    fn snapshot(&self) -> training::Result<ModelSnapshot> {
        ModelSnapshot::from_varmap(&self.varmap)
    }

    fn restore(&self, snapshot: &ModelSnapshot) -> training::Result<()> {
        snapshot.restore_into(&self.varmap)
    }
}
