//! Whitelist persistence: the storage seam and its JSON file backend.
//!
//! The on-disk format is a single pretty-printed JSON array of hardware id
//! strings. There is no append log: each save replaces the whole file.

use std::fs;
use std::path::{Path, PathBuf};

use lanwatch_core::HardwareId;

/// Errors that can occur during whitelist storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Whitelist at {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Trait for whitelist persistence backends.
pub trait WhitelistStore: Send + Sync {
    /// Load the persisted whitelist. A missing store yields an empty list.
    fn load(&self) -> Result<Vec<HardwareId>, StoreError>;

    /// Durably replace the persisted whitelist with `ids`.
    fn save(&self, ids: &[HardwareId]) -> Result<(), StoreError>;
}

/// File-system backed whitelist store.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file the new contents are written to before the rename.
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl WhitelistStore for JsonFileStore {
    fn load(&self) -> Result<Vec<HardwareId>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let json = fs::read_to_string(&self.path)?;
        let raw: Vec<String> = serde_json::from_str(&json).map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        // Hand-edited files may carry duplicates or non-canonical ids.
        let mut ids: Vec<HardwareId> = Vec::with_capacity(raw.len());
        for entry in raw {
            let id = HardwareId::canonicalize(&entry);
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        Ok(ids)
    }

    fn save(&self, ids: &[HardwareId]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(ids)?;
        let staging = self.staging_path();
        fs::write(&staging, json)?;
        fs::rename(&staging, &self.path)?;

        tracing::debug!(
            path = %self.path.display(),
            entries = ids.len(),
            "Whitelist saved"
        );

        Ok(())
    }
}
