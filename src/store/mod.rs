//! Durable stores
//!
//! Three independent documents live behind a [`StorageBackend`]:
//! - `EventLog`: append-only audit trail (JSON lines)
//! - `FileAccessRegistry`: keyed aggregate table (one JSON object)
//! - `EncryptionLedger`: append-only cipher metadata (one JSON array)
//!
//! `SnapshotManager` captures all three at one instant for export/backup.
//!
//! # Concurrency
//!
//! ```text
//! in-process:    per-document Mutex around every read-modify-write
//! cross-process: whole-document last-writer-wins (no file locking)
//! ```
//!
//! The cross-process behaviour is a known limitation: two processes that
//! record a file access at the same moment can lose one increment. The data
//! is advisory monitoring output, not a transactional ledger.

mod backend;
mod config;
mod events;
mod file;
mod files;
mod ledger;
mod memory;
mod snapshot;

pub use backend::{Document, StorageBackend};
pub use config::StoreConfig;
pub use events::{ClearReport, EventLog};
pub use file::FileBackend;
pub use files::FileAccessRegistry;
pub use ledger::EncryptionLedger;
pub use memory::MemoryBackend;
pub use snapshot::{BackupInfo, SnapshotManager};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{MonitorError, MonitorResult};

/// Read a whole JSON document, treating absent or blank as `T::default()`
pub(crate) fn read_json<T>(backend: &dyn StorageBackend, document: Document) -> MonitorResult<T>
where
    T: DeserializeOwned + Default,
{
    let raw = backend
        .read(document)
        .map_err(|e| MonitorError::io(document, e))?;

    match raw {
        Some(text) if !text.trim().is_empty() => {
            serde_json::from_str(&text).map_err(|e| MonitorError::schema(document, e))
        }
        _ => Ok(T::default()),
    }
}

/// Replace a whole JSON document
pub(crate) fn write_json<T>(
    backend: &dyn StorageBackend,
    document: Document,
    value: &T,
) -> MonitorResult<()>
where
    T: Serialize + ?Sized,
{
    let text = serde_json::to_string_pretty(value).map_err(|e| MonitorError::schema(document, e))?;
    backend
        .replace(document, &text)
        .map_err(|e| MonitorError::io(document, e))
}
