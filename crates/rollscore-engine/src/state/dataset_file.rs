use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rollscore_core::tabular;

use super::atomic::{atomic_write, AdvisoryLock};
use crate::merge::Dataset;

/// A scorecard CSV held open for one read-merge-write cycle.
///
/// Holds the advisory lock from [`DatasetFile::open`] until drop, so two
/// merges into the same file cannot interleave.
pub struct DatasetFile {
    path: PathBuf,
    _lock: AdvisoryLock,
}

impl DatasetFile {
    /// Lock `path` and load its scorecards. A missing file is an empty dataset.
    pub fn open(path: &Path) -> Result<(Self, Dataset)> {
        let lock = AdvisoryLock::acquire(path)
            .with_context(|| format!("cannot lock dataset {}", path.display()))?;
        let dataset = if path.exists() {
            load(path)?
        } else {
            Dataset::new()
        };
        Ok((
            Self {
                path: path.to_path_buf(),
                _lock: lock,
            },
            dataset,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn commit(&self, dataset: &Dataset) -> Result<()> {
        atomic_write(&self.path, tabular::to_csv(dataset.entries()).as_bytes())
    }
}

/// Read a scorecard CSV without locking it.
pub fn load(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let cards =
        tabular::from_csv(&text).with_context(|| format!("invalid scorecards in {}", path.display()))?;
    Dataset::from_scorecards(cards)
        .with_context(|| format!("duplicate scorecard in {}", path.display()))
}
