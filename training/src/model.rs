use std::collections::HashMap;
use std::path::Path;

use candle_core::{Device, Tensor};
use candle_nn::{ModuleT, VarMap};

use crate::{Error, Result};

/// A classifier the trainer can drive.
///
/// `forward_t` maps an input batch to per-class scores, its `train` flag
/// switches stochastic layers such as dropout. Snapshots must be independent
/// of the live parameters so that further training does not alter them.
pub trait Model: ModuleT {
    fn snapshot(&self) -> Result<ModelSnapshot>;
    fn restore(&self, snapshot: &ModelSnapshot) -> Result<()>;
}

/// Deep copy of every named parameter of a model.
#[derive(Debug, Clone)]
pub struct ModelSnapshot {
    tensors: HashMap<String, Tensor>,
}

impl ModelSnapshot {
    pub fn new(tensors: HashMap<String, Tensor>) -> Self {
        Self { tensors }
    }

    pub fn from_varmap(varmap: &VarMap) -> Result<Self> {
        let vars = varmap.data().lock().map_err(|_| Error::PoisonedLock)?;

        let mut tensors = HashMap::with_capacity(vars.len());
        for (name, var) in vars.iter() {
            // Detach first so the copy carries no autograd history.
            let tensor = var.as_tensor().detach().copy()?;
            tensors.insert(name.clone(), tensor);
        }

        Ok(Self { tensors })
    }

    /// Writes the snapshot into the variables of `varmap`.
    ///
    /// Every variable must have a counterpart of the same shape.
    pub fn restore_into(&self, varmap: &VarMap) -> Result<()> {
        let vars = varmap.data().lock().map_err(|_| Error::PoisonedLock)?;

        for (name, var) in vars.iter() {
            let tensor = self
                .tensors
                .get(name)
                .ok_or_else(|| Error::MissingParameter(name.clone()))?;
            var.set(tensor)?;
        }

        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        candle_core::safetensors::save(&self.tensors, path)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P, device: &Device) -> Result<Self> {
        let tensors = candle_core::safetensors::load(path, device)?;
        Ok(Self { tensors })
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}
