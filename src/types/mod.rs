//! Data types for the activity monitor
//!
//! This module contains all the record shapes that are persisted or
//! delivered to collaborators.

mod action;
mod encryption;
mod event;
mod file_access;
mod snapshot;
mod stats;

pub use action::{Action, ActionCategory};
pub use encryption::{session_id_for, CipherOperation, EncryptionOperation};
pub use event::{sort_newest_first, Event};
pub use file_access::{apply_access, by_recency, file_key, FileAccess, FileAccessRecord, FileAccessTable};
pub use snapshot::{
    AggregateCounts, SnapshotDocument, SnapshotInfo, SnapshotKind, SNAPSHOT_FORMAT_VERSION,
    SYSTEM_NAME,
};
pub use stats::{ActivityTimeline, CipherCounts, DashboardStats, UserActivitySummary};
