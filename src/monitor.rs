//! ActivityMonitor - the facade producers and consumers share
//!
//! Owns the three stores over one backend, the clock, and the snapshot
//! manager. Write paths return errors; load paths have a strict `try_`
//! form and a degrading form that logs and returns empty data.
//!
//! Failures of the registry, the ledger, export and backup are recorded as
//! audit events. Failures of the event log itself are not, since that would
//! recurse into the component that just failed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::analytics::{self, Session};
use crate::config::MonitorConfig;
use crate::error::{MonitorError, MonitorResult};
use crate::scheduler::RefreshScheduler;
use crate::store::{
    BackupInfo, ClearReport, EncryptionLedger, EventLog, FileAccessRegistry, FileBackend,
    SnapshotManager, StorageBackend,
};
use crate::types::{
    Action, ActivityTimeline, CipherCounts, DashboardStats, EncryptionOperation,
    Event, FileAccess, FileAccessRecord, FileAccessTable, SnapshotDocument, SnapshotKind,
    UserActivitySummary,
};
use crate::utils::{Clock, SystemClock};

pub struct ActivityMonitor {
    config: MonitorConfig,
    clock: Arc<dyn Clock>,
    backend: Arc<dyn StorageBackend>,
    events: EventLog,
    files: FileAccessRegistry,
    ledger: EncryptionLedger,
    snapshots: SnapshotManager,
}

impl ActivityMonitor {
    pub fn new(
        config: MonitorConfig,
        backend: Arc<dyn StorageBackend>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            snapshots: SnapshotManager::new(config.store.backups_dir()),
            events: EventLog::new(Arc::clone(&backend)),
            files: FileAccessRegistry::new(Arc::clone(&backend)),
            ledger: EncryptionLedger::new(Arc::clone(&backend)),
            config,
            clock,
            backend,
        }
    }

    /// Open the durable stores under `config.store` with the system clock
    pub fn open(config: MonitorConfig) -> MonitorResult<Self> {
        let backend = FileBackend::open(config.store.clone())
            .map_err(|e| MonitorError::write(config.store.data_dir(), e))?;
        info!(location = %backend.describe(), "Opened activity stores");
        Ok(Self::new(config, Arc::new(backend), Arc::new(SystemClock)))
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn backend(&self) -> &dyn StorageBackend {
        self.backend.as_ref()
    }

    // ========================================================================
    // Producers
    // ========================================================================

    /// Append an audit event stamped with the current time
    pub fn append_event(
        &self,
        username: &str,
        action: impl Into<Action>,
        details: impl Into<String>,
    ) -> MonitorResult<Event> {
        let event = Event::new(self.now(), username, action, details);
        self.events.append(&event)?;
        Ok(event)
    }

    pub fn record_file_access(&self, access: &FileAccess) -> MonitorResult<FileAccessRecord> {
        self.files.record_access(access, self.now()).map_err(|e| {
            self.audit(
                &access.username,
                Action::FileAccessError,
                format!("Error accessing {}: {}", access.path, e),
            );
            e
        })
    }

    /// Append to the cipher ledger; returns the ledger length afterwards
    pub fn record_encryption_op(&self, operation: &EncryptionOperation) -> MonitorResult<usize> {
        self.ledger.record(operation).map_err(|e| {
            let action = if operation.operation.is_encryption() {
                Action::EncryptionError
            } else {
                Action::DecryptionError
            };
            self.audit(
                &operation.username,
                action,
                format!("Could not record {}: {}", operation.operation.name(), e),
            );
            e
        })
    }

    // ========================================================================
    // Loads
    // ========================================================================

    pub fn try_load_events(&self) -> MonitorResult<Vec<Event>> {
        self.events.load_all()
    }

    pub fn try_load_files(&self) -> MonitorResult<FileAccessTable> {
        self.files.load()
    }

    pub fn try_load_ops(&self) -> MonitorResult<Vec<EncryptionOperation>> {
        self.ledger.load()
    }

    /// All events, or empty with a logged warning if the log is unreadable
    pub fn load_events(&self) -> Vec<Event> {
        degrade(self.try_load_events(), &mut Vec::new())
    }

    pub fn load_files(&self) -> FileAccessTable {
        degrade(self.try_load_files(), &mut Vec::new())
    }

    pub fn load_ops(&self) -> Vec<EncryptionOperation> {
        degrade(self.try_load_ops(), &mut Vec::new())
    }

    // ========================================================================
    // Read models
    // ========================================================================

    /// Dashboard numbers; never fails, problems land in `warnings`
    pub fn compute_stats(&self) -> DashboardStats {
        let mut warnings = Vec::new();
        let events = degrade(self.try_load_events(), &mut warnings);
        let files = degrade(self.try_load_files(), &mut warnings);
        let ops = degrade(self.try_load_ops(), &mut warnings);

        let mut stats = analytics::summarize(
            &events,
            &files,
            &ops,
            self.now(),
            self.config.session_window,
        );
        stats.warnings = warnings;
        stats
    }

    pub fn active_sessions(&self) -> usize {
        analytics::active_sessions(&self.load_events(), self.now(), self.config.session_window)
    }

    pub fn sessions(&self) -> Vec<Session> {
        analytics::reconstruct(&self.load_events(), self.now(), self.config.session_window)
    }

    pub fn filter_events(&self, user: Option<&str>, action: Option<&str>) -> Vec<Event> {
        analytics::filter_events(&self.load_events(), user, action)
    }

    pub fn user_activity(&self, username: &str) -> UserActivitySummary {
        analytics::user_activity_summary(&self.load_events(), username)
    }

    pub fn cipher_breakdown(&self) -> BTreeMap<String, CipherCounts> {
        analytics::cipher_breakdown(&self.load_ops())
    }

    pub fn recent_activity(&self, limit: usize) -> Vec<Event> {
        analytics::recent_activity(&self.load_events(), limit)
    }

    pub fn activity_timeline(&self) -> Option<ActivityTimeline> {
        analytics::activity_timeline(&self.load_events())
    }

    /// File records, most recently accessed first
    pub fn files_by_recency(&self) -> Vec<(String, FileAccessRecord)> {
        degrade(self.files.list_by_recency(), &mut Vec::new())
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    fn capture(&self, kind: SnapshotKind) -> MonitorResult<SnapshotDocument> {
        SnapshotManager::capture(
            &self.events,
            &self.files,
            &self.ledger,
            &self.config.actor,
            kind,
            self.now(),
        )
    }

    /// Export every store to `destination`
    pub fn export_snapshot(&self, destination: &Path) -> MonitorResult<PathBuf> {
        let result = self
            .capture(SnapshotKind::Export)
            .and_then(|snapshot| self.snapshots.export(&snapshot, destination));

        match result {
            Ok(path) => {
                self.audit(
                    &self.config.actor,
                    Action::AdminExportData,
                    format!("Exported data to {}", path.display()),
                );
                Ok(path)
            }
            Err(e) => {
                self.audit(
                    &self.config.actor,
                    Action::AdminExportError,
                    format!("Export to {} failed: {}", destination.display(), e),
                );
                Err(e)
            }
        }
    }

    /// Write a timestamped backup into the backups directory
    ///
    /// When `backup_keep` is configured, older backups beyond it are pruned
    /// afterwards; a pruning failure is logged, not returned.
    pub fn backup(&self) -> MonitorResult<PathBuf> {
        let result = self
            .capture(SnapshotKind::Backup)
            .and_then(|snapshot| self.snapshots.backup_default(&snapshot));

        let path = match result {
            Ok(path) => path,
            Err(e) => {
                self.audit(
                    &self.config.actor,
                    Action::AdminBackupError,
                    format!("Backup failed: {}", e),
                );
                return Err(e);
            }
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.audit(
            &self.config.actor,
            Action::AdminCreateBackup,
            format!("Created backup: {}", name),
        );

        if let Some(keep) = self.config.backup_keep {
            if let Err(e) = self.snapshots.prune_backups(keep) {
                warn!(error = %e, keep, "Could not prune old backups");
            }
        }

        Ok(path)
    }

    pub fn list_backups(&self) -> MonitorResult<Vec<BackupInfo>> {
        self.snapshots.list_backups()
    }

    pub fn prune_backups(&self, keep: usize) -> MonitorResult<usize> {
        self.snapshots.prune_backups(keep)
    }

    /// Archive then truncate the event log
    ///
    /// On success the log holds exactly one `admin_clear_logs` event naming
    /// the archive. On failure the log is untouched and nothing is appended.
    pub fn clear_events(&self) -> MonitorResult<ClearReport> {
        let report = self.events.clear(self.now())?;

        self.audit(
            &self.config.actor,
            Action::AdminClearLogs,
            format!(
                "Cleared {} events, backup: {}",
                report.cleared,
                report.archive.display()
            ),
        );
        Ok(report)
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// A stopped scheduler that recomputes dashboard stats every
    /// `refresh_interval`, reading storage on the blocking pool
    pub fn scheduler(
        self: &Arc<Self>,
        results: mpsc::UnboundedSender<DashboardStats>,
    ) -> RefreshScheduler<DashboardStats> {
        let monitor = Arc::clone(self);
        RefreshScheduler::new(self.config.refresh_interval, results, move || {
            let monitor = Arc::clone(&monitor);
            async move {
                match tokio::task::spawn_blocking(move || monitor.compute_stats()).await {
                    Ok(stats) => stats,
                    Err(e) => {
                        warn!(error = %e, "Stats refresh task failed");
                        DashboardStats {
                            warnings: vec![format!("refresh failed: {}", e)],
                            ..Default::default()
                        }
                    }
                }
            }
        })
    }

    /// Best-effort audit append; its own failure is only logged
    fn audit(&self, username: &str, action: Action, details: String) {
        let event = Event::new(self.now(), username, action, details);
        if let Err(e) = self.events.append(&event) {
            warn!(error = %e, action = %event.action, "Could not record audit event");
        }
    }
}

fn degrade<T: Default>(result: MonitorResult<T>, warnings: &mut Vec<String>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, kind = e.kind(), "Load failed, continuing with empty data");
            warnings.push(e.to_string());
            T::default()
        }
    }
}
