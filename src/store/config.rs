//! On-disk layout

use std::path::{Path, PathBuf};

use super::Document;

/// Configuration for the durable stores
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Path to the data directory
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl StoreConfig {
    /// Create config with custom data directory
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of one persisted document
    pub fn document_path(&self, document: Document) -> PathBuf {
        self.data_dir.join(document.file_name())
    }

    /// Get path to the backups directory
    pub fn backups_dir(&self) -> PathBuf {
        self.data_dir.join("backups")
    }
}
