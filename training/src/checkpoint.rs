use std::fs;
use std::path::{Path, PathBuf};

use candle_core::Device;

use crate::{ModelSnapshot, Result};

/// Durable storage for best-model snapshots, keyed by 1-based epoch number.
pub trait CheckpointStore {
    fn save(&mut self, snapshot: &ModelSnapshot, epoch: usize) -> Result<()>;
    fn delete(&mut self, epoch: usize) -> Result<()>;
}

/// Writes one safetensors file per checkpoint into a directory.
#[derive(Debug, Clone)]
pub struct SafetensorsStore {
    dir: PathBuf,
}

impl SafetensorsStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("model_epoch{}.safetensors", epoch))
    }

    pub fn load(&self, epoch: usize, device: &Device) -> Result<ModelSnapshot> {
        ModelSnapshot::load(self.path(epoch), device)
    }
}

impl CheckpointStore for SafetensorsStore {
    fn save(&mut self, snapshot: &ModelSnapshot, epoch: usize) -> Result<()> {
        let path = self.path(epoch);
        snapshot.save(&path)?;
        log::debug!("Saved checkpoint {}", path.display());
        Ok(())
    }

    fn delete(&mut self, epoch: usize) -> Result<()> {
        let path = self.path(epoch);
        fs::remove_file(&path)?;
        log::debug!("Deleted checkpoint {}", path.display());
        Ok(())
    }
}
