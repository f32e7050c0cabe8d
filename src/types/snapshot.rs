//! Export / backup document format

use serde::{Deserialize, Serialize};

use super::{EncryptionOperation, Event, FileAccessTable};

/// Current snapshot format version
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Name recorded in every snapshot
pub const SYSTEM_NAME: &str = "activity-monitor";

/// Why the snapshot was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotKind {
    /// Operator-requested export to a chosen destination
    Export,
    /// System-named backup (scheduled, or before a destructive clear)
    Backup,
}

/// Snapshot metadata block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub exported_by: String,
    pub timestamp: String,
    pub system_name: String,
    /// Version of snapshot format (for future migrations)
    #[serde(default = "default_version")]
    pub format_version: u32,
    pub kind: SnapshotKind,
}

fn default_version() -> u32 {
    SNAPSHOT_FORMAT_VERSION
}

/// Store sizes at capture time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateCounts {
    pub total_users: usize,
    pub total_events: usize,
    pub total_files: usize,
    pub total_encryption_operations: usize,
}

/// Everything captured at one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub info: SnapshotInfo,
    pub statistics: AggregateCounts,
    pub events: Vec<Event>,
    pub file_access: FileAccessTable,
    pub encryption_ledger: Vec<EncryptionOperation>,
}
