//! Encryption Ledger - append-only cipher metadata

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use super::{read_json, write_json, Document, StorageBackend};
use crate::error::MonitorResult;
use crate::types::EncryptionOperation;

pub struct EncryptionLedger {
    backend: Arc<dyn StorageBackend>,
    lock: Mutex<()>,
}

impl EncryptionLedger {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            lock: Mutex::new(()),
        }
    }

    /// Append one operation; returns the ledger length afterwards
    pub fn record(&self, operation: &EncryptionOperation) -> MonitorResult<usize> {
        let _guard = self.lock.lock();

        let mut ledger = self.read_locked()?;
        ledger.push(operation.clone());
        write_json(self.backend.as_ref(), Document::EncryptionLedger, &ledger)?;

        debug!(
            user = %operation.username,
            action = operation.operation.name(),
            session = %operation.session_id,
            "Recorded cipher operation"
        );
        Ok(ledger.len())
    }

    pub fn load(&self) -> MonitorResult<Vec<EncryptionOperation>> {
        let _guard = self.lock.lock();
        self.read_locked()
    }

    pub(crate) fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock()
    }

    pub(crate) fn read_locked(&self) -> MonitorResult<Vec<EncryptionOperation>> {
        read_json(self.backend.as_ref(), Document::EncryptionLedger)
    }
}
