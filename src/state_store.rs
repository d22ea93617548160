//! Durable stock status store
//!
//! A flat JSON map of product id -> last known in-stock flag. It is the
//! source of truth for "did we already alert on this" across restarts.
//!
//! Every mutation rewrites the whole file: the new content goes to a sibling
//! `<file>.tmp`, is synced, then renamed over the live file. The live file is
//! always either the previous complete state or the new one.

use crate::error::{Result, StockError};
use crate::tracker::Observation;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A decision was made but could not be written to disk.
///
/// The observation still stands for the current cycle. After a crash the
/// next run recomputes against the older file, which may repeat an alert.
#[derive(Debug, Error)]
#[error("stock state for {id} not persisted: {source}")]
pub struct PersistError {
    pub id: String,
    pub observation: Observation,
    pub source: StockError,
}

/// JSON-file backed map of product id -> in stock
#[derive(Debug)]
pub struct StockStateStore {
    path: PathBuf,
    data: BTreeMap<String, bool>,
}

impl StockStateStore {
    /// Open the store at `path`. A missing file is an empty store; an
    /// unreadable or corrupt one is logged and also treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match Self::load(&path) {
            Ok(data) => {
                log::info!(
                    "Loaded stock state with {} entries from {}",
                    data.len(),
                    path.display()
                );
                data
            }
            Err(e) => {
                log::warn!(
                    "Could not load stock state from {}, starting fresh: {}",
                    path.display(),
                    e
                );
                BTreeMap::new()
            }
        };
        Self { path, data }
    }

    fn load(path: &Path) -> Result<BTreeMap<String, bool>> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, id: &str) -> Option<bool> {
        self.data.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Store a status and persist before returning.
    pub fn set(&mut self, id: &str, in_stock: bool) -> Result<()> {
        self.data.insert(id.to_string(), in_stock);
        self.save()
    }

    /// Compare `current` against the durable record, then write it.
    ///
    /// On a failed write the in-memory decision is returned inside the error.
    pub fn confirm(
        &mut self,
        id: &str,
        current: bool,
    ) -> std::result::Result<Observation, PersistError> {
        let observation = Observation::compare(self.get(id), current);
        match self.set(id, current) {
            Ok(()) => Ok(observation),
            Err(source) => Err(PersistError {
                id: id.to_string(),
                observation,
                source,
            }),
        }
    }

    /// Rewrite the whole file via temp file + rename.
    pub fn save(&self) -> Result<()> {
        let tmp = self.stage()?;
        self.commit(&tmp)?;
        log::debug!(
            "Saved stock state with {} entries to {}",
            self.data.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Write the full state to the sibling temp file and sync it.
    fn stage(&self) -> Result<PathBuf> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.data)?;
        let tmp = self.temp_path();
        let mut file = File::create(&tmp)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        Ok(tmp)
    }

    /// Atomically replace the live file with a staged one, then sync the
    /// directory so the rename itself survives a power loss.
    fn commit(&self, tmp: &Path) -> Result<()> {
        std::fs::rename(tmp, &self.path).map_err(StockError::from)?;
        self.sync_parent()
    }

    #[cfg(unix)]
    fn sync_parent(&self) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        File::open(parent)?.sync_all()?;
        Ok(())
    }

    // Directories cannot be opened for syncing here
    #[cfg(not(unix))]
    fn sync_parent(&self) -> Result<()> {
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "stock_state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
