//! Snapshot Manager for export and backup
//!
//! A snapshot bundles metadata, aggregate counts and the full contents of
//! all three stores, captured while holding every store lock so the
//! counts and contents agree. Files are written temp-then-rename: a
//! destination either holds a complete snapshot or is untouched.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use super::{EncryptionLedger, EventLog, FileAccessRegistry};
use crate::analytics::distinct_users;
use crate::error::{MonitorError, MonitorResult};
use crate::types::{
    AggregateCounts, SnapshotDocument, SnapshotInfo, SnapshotKind, SNAPSHOT_FORMAT_VERSION,
    SYSTEM_NAME,
};
use crate::utils::{
    atomic_create_with, atomic_write_with, format_stamp, format_timestamp, parse_timestamp,
};

const BACKUP_PREFIX: &str = "system_backup_";

/// A backup file found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    pub path: PathBuf,
    pub name: String,
    /// Size in bytes
    pub size: u64,
}

/// Snapshot Manager handles capturing, writing and listing snapshots
#[derive(Debug, Clone)]
pub struct SnapshotManager {
    backups_dir: PathBuf,
}

impl SnapshotManager {
    /// Create a manager whose default backup location is `backups_dir`
    pub fn new(backups_dir: impl Into<PathBuf>) -> Self {
        Self {
            backups_dir: backups_dir.into(),
        }
    }

    pub fn backups_dir(&self) -> &Path {
        &self.backups_dir
    }

    /// Capture all three stores at one instant
    ///
    /// Locks are taken in a fixed order (events, files, ledger) so two
    /// concurrent captures cannot deadlock.
    pub fn capture(
        events: &EventLog,
        files: &FileAccessRegistry,
        ledger: &EncryptionLedger,
        exported_by: &str,
        kind: SnapshotKind,
        at: DateTime<Utc>,
    ) -> MonitorResult<SnapshotDocument> {
        let _events_guard = events.guard();
        let _files_guard = files.guard();
        let _ledger_guard = ledger.guard();

        let events = events.read_locked()?;
        let file_access = files.read_locked()?;
        let encryption_ledger = ledger.read_locked()?;

        let statistics = AggregateCounts {
            total_users: distinct_users(&events, &file_access, &encryption_ledger).len(),
            total_events: events.len(),
            total_files: file_access.len(),
            total_encryption_operations: encryption_ledger.len(),
        };

        Ok(SnapshotDocument {
            info: SnapshotInfo {
                exported_by: exported_by.to_string(),
                timestamp: format_timestamp(at),
                system_name: SYSTEM_NAME.to_string(),
                format_version: SNAPSHOT_FORMAT_VERSION,
                kind,
            },
            statistics,
            events,
            file_access,
            encryption_ledger,
        })
    }

    /// Write `snapshot` to exactly `destination`, replacing any file there
    pub fn export(&self, snapshot: &SnapshotDocument, destination: &Path) -> MonitorResult<PathBuf> {
        atomic_write_with(destination, |file| write_pretty(file, snapshot))
            .map_err(|e| MonitorError::write(destination, e.into()))?;

        Self::log_written(snapshot, destination);
        Ok(destination.to_path_buf())
    }

    /// Write `snapshot` into `destination_dir` under a timestamped name
    ///
    /// An existing backup is never replaced; a name collision within the
    /// same millisecond gets a `_1`, `_2`, ... suffix.
    pub fn backup(&self, snapshot: &SnapshotDocument, destination_dir: &Path) -> MonitorResult<PathBuf> {
        let at = parse_timestamp(&snapshot.info.timestamp).unwrap_or_else(Utc::now);
        let path = destination_dir.join(Self::backup_file_name(at));

        let written = atomic_create_with(&path, |file| write_pretty(file, snapshot))
            .map_err(|e| MonitorError::write(&path, e.into()))?;

        Self::log_written(snapshot, &written);
        Ok(written)
    }

    fn log_written(snapshot: &SnapshotDocument, path: &Path) {
        info!(
            path = %path.display(),
            events = snapshot.statistics.total_events,
            files = snapshot.statistics.total_files,
            operations = snapshot.statistics.total_encryption_operations,
            "Wrote snapshot"
        );
    }

    /// Write `snapshot` into the default backups directory
    pub fn backup_default(&self, snapshot: &SnapshotDocument) -> MonitorResult<PathBuf> {
        self.backup(snapshot, &self.backups_dir)
    }

    /// `system_backup_YYYYmmdd_HHMMSS_mmm.json`
    pub fn backup_file_name(at: DateTime<Utc>) -> String {
        format!(
            "{}{}_{:03}.json",
            BACKUP_PREFIX,
            format_stamp(at),
            at.timestamp_subsec_millis()
        )
    }

    /// Read a snapshot back from disk
    pub fn load(path: &Path) -> MonitorResult<SnapshotDocument> {
        let invalid = |reason: String| MonitorError::InvalidSnapshot {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| invalid(e.to_string()))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| invalid(e.to_string()))
    }

    /// Backups in the default directory, oldest first
    pub fn list_backups(&self) -> MonitorResult<Vec<BackupInfo>> {
        if !self.backups_dir.exists() {
            return Ok(Vec::new());
        }

        let listing_failed = |e: std::io::Error| MonitorError::InvalidSnapshot {
            path: self.backups_dir.clone(),
            reason: e.to_string(),
        };

        let mut backups = Vec::new();
        for entry in fs::read_dir(&self.backups_dir).map_err(listing_failed)? {
            let entry = entry.map_err(listing_failed)?;
            let name = entry.file_name().to_string_lossy().into_owned();

            if name.starts_with(BACKUP_PREFIX) && name.ends_with(".json") {
                let size = entry.metadata().map_err(listing_failed)?.len();
                backups.push(BackupInfo {
                    path: entry.path(),
                    name,
                    size,
                });
            }
        }

        // Names embed the timestamp, so name order is age order
        backups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(backups)
    }

    /// Delete all but the newest `keep` backups, returning how many went
    pub fn prune_backups(&self, keep: usize) -> MonitorResult<usize> {
        let backups = self.list_backups()?;
        if backups.len() <= keep {
            return Ok(0);
        }

        let excess = backups.len() - keep;
        for backup in &backups[..excess] {
            fs::remove_file(&backup.path).map_err(|e| MonitorError::write(&backup.path, e))?;
            info!(path = %backup.path.display(), "Deleted old backup");
        }

        Ok(excess)
    }
}

fn write_pretty(file: &mut File, snapshot: &SnapshotDocument) -> std::io::Result<()> {
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, snapshot)?;
    writer.flush()
}
