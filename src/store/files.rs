//! File Access Registry
//!
//! Keyed aggregate table persisted as one JSON object. Every access is a
//! load → upsert → persist of the whole table, serialized in-process.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use super::{read_json, write_json, Document, StorageBackend};
use crate::error::MonitorResult;
use crate::types::{apply_access, by_recency, FileAccess, FileAccessRecord, FileAccessTable};

pub struct FileAccessRegistry {
    backend: Arc<dyn StorageBackend>,
    lock: Mutex<()>,
}

impl FileAccessRegistry {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            lock: Mutex::new(()),
        }
    }

    /// Record one access and persist the table
    ///
    /// A table that fails to parse is reported, never overwritten.
    pub fn record_access(
        &self,
        access: &FileAccess,
        at: DateTime<Utc>,
    ) -> MonitorResult<FileAccessRecord> {
        let _guard = self.lock.lock();

        let mut table = self.read_locked()?;
        let record = apply_access(&mut table, access, at).clone();
        write_json(self.backend.as_ref(), Document::FileAccess, &table)?;

        debug!(
            key = %access.key(),
            count = record.accessed_count,
            user = %access.username,
            "Recorded file access"
        );
        Ok(record)
    }

    /// Load the whole table; absent storage is an empty table
    pub fn load(&self) -> MonitorResult<FileAccessTable> {
        let _guard = self.lock.lock();
        self.read_locked()
    }

    /// Records sorted by last access, newest first
    pub fn list_by_recency(&self) -> MonitorResult<Vec<(String, FileAccessRecord)>> {
        let table = self.load()?;
        Ok(by_recency(&table)
            .into_iter()
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect())
    }

    pub(crate) fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock()
    }

    pub(crate) fn read_locked(&self) -> MonitorResult<FileAccessTable> {
        read_json(self.backend.as_ref(), Document::FileAccess)
    }
}
