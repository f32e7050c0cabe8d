//! Error taxonomy for the monitor core
//!
//! Load paths degrade (empty result plus a warning); write paths return
//! these errors to the caller.

use std::io;
use std::path::PathBuf;

use crate::store::Document;

/// Result type for monitor operations
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Errors that can occur in monitor operations
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Storage could not be read or written
    #[error("I/O failure on {document}: {source}")]
    Io {
        document: Document,
        #[source]
        source: io::Error,
    },

    /// A stored document is not the expected shape
    #[error("{document} is not a valid document: {source}")]
    Schema {
        document: Document,
        #[source]
        source: serde_json::Error,
    },

    /// Archiving before a destructive clear failed; nothing was cleared
    #[error("backup before clear failed, store left untouched: {0}")]
    Backup(#[source] io::Error),

    /// A target outside the three documents (export, backup, data dir)
    /// could not be written
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A snapshot file or backup directory could not be read back
    #[error("cannot read snapshot {}: {reason}", path.display())]
    InvalidSnapshot { path: PathBuf, reason: String },

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl MonitorError {
    pub(crate) fn io(document: Document, source: io::Error) -> Self {
        MonitorError::Io { document, source }
    }

    pub(crate) fn schema(document: Document, source: serde_json::Error) -> Self {
        MonitorError::Schema { document, source }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        MonitorError::Write {
            path: path.into(),
            source,
        }
    }

    /// Short machine-friendly kind, used in audit event details
    pub fn kind(&self) -> &'static str {
        match self {
            MonitorError::Io { .. } => "io_failure",
            MonitorError::Schema { .. } => "schema_failure",
            MonitorError::Backup(_) => "backup_failure",
            MonitorError::Write { .. } => "write_failure",
            MonitorError::InvalidSnapshot { .. } => "snapshot_failure",
            MonitorError::Config(_) => "config_failure",
        }
    }
}
