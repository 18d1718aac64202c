use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Numbered run directories `v0`, `v1`, ... under a common root.
pub struct RunManager {
    root_path: PathBuf,
}

impl RunManager {
    pub fn new<P: AsRef<Path>>(root: P) -> io::Result<Self> {
        let root_path = root.as_ref().to_path_buf();
        fs::create_dir_all(&root_path)?;
        Ok(Self { root_path })
    }

    /// Creates the directory after the highest existing `v{n}` and returns `n`.
    ///
    /// Entries that are not directories named `v<number>` are ignored.
    pub fn create_next_run(&self) -> io::Result<u32> {
        let mut next = 0;
        for entry in fs::read_dir(&self.root_path)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }

            let run = entry
                .file_name()
                .to_str()
                .and_then(|name| name.strip_prefix('v'))
                .and_then(|num| num.parse::<u32>().ok());
            if let Some(run) = run {
                next = next.max(run + 1);
            }
        }

        // Fails with AlreadyExists if another process took this number.
        fs::create_dir(self.run_path(next))?;
        Ok(next)
    }

    pub fn run_path(&self, run: u32) -> PathBuf {
        self.root_path.join(format!("v{}", run))
    }

    pub fn file_path(&self, run: u32, filename: &str) -> PathBuf {
        self.run_path(run).join(filename)
    }

    /// Where the best-model checkpoints of a run are kept.
    pub fn checkpoint_dir(&self, run: u32) -> PathBuf {
        self.run_path(run).join("checkpoints")
    }

    pub fn write_json<T: Serialize>(
        &self,
        run: u32,
        filename: &str,
        value: &T,
    ) -> io::Result<PathBuf> {
        let path = self.file_path(run, filename);
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, value)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_are_numbered_in_sequence() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let root = dir.path().join("runs");
        let manager = RunManager::new(&root)?;

        assert_eq!(manager.create_next_run()?, 0);
        assert_eq!(manager.create_next_run()?, 1);

        // Stray entries are ignored.
        fs::create_dir(root.join("scratch"))?;
        File::create(root.join("v9"))?;

        assert_eq!(manager.create_next_run()?, 2);
        assert!(manager.run_path(2).is_dir());
        Ok(())
    }

    #[test]
    fn test_next_run_follows_highest_existing() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir(dir.path().join("v4"))?;
        fs::create_dir(dir.path().join("v1"))?;

        let manager = RunManager::new(dir.path())?;
        assert_eq!(manager.create_next_run()?, 5);
        Ok(())
    }

    #[test]
    fn test_write_json() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let manager = RunManager::new(dir.path())?;
        let run = manager.create_next_run()?;

        let path = manager.write_json(run, "history.json", &vec![1, 2, 3])?;
        assert_eq!(path, manager.file_path(run, "history.json"));

        let written: Vec<u32> = serde_json::from_str(&fs::read_to_string(path)?)?;
        assert_eq!(written, vec![1, 2, 3]);
        Ok(())
    }
}
