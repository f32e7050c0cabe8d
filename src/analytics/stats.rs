//! Dashboard statistics
//!
//! Pure functions over already-loaded store contents. Loading, and
//! degrading on load failure, is the caller's concern.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};

use super::session::active_sessions;
use crate::types::{
    sort_newest_first, ActionCategory, ActivityTimeline, CipherCounts, DashboardStats,
    EncryptionOperation, Event, FileAccessTable, UserActivitySummary,
};
use crate::utils::format_timestamp;

/// Default number of rows in the recent-activity list
pub const DEFAULT_RECENT_LIMIT: usize = 15;

/// Distinct usernames across the event log, file accessors and the ledger
pub fn distinct_users<'a>(
    events: &'a [Event],
    files: &'a FileAccessTable,
    ops: &'a [EncryptionOperation],
) -> BTreeSet<&'a str> {
    events
        .iter()
        .map(|e| e.username.as_str())
        .chain(
            files
                .values()
                .flat_map(|record| record.accessed_by.iter().map(String::as_str)),
        )
        .chain(ops.iter().map(|op| op.username.as_str()))
        .collect()
}

/// Top-level dashboard numbers
pub fn summarize(
    events: &[Event],
    files: &FileAccessTable,
    ops: &[EncryptionOperation],
    now: DateTime<Utc>,
    window: Duration,
) -> DashboardStats {
    DashboardStats {
        total_users: distinct_users(events, files, ops).len(),
        total_events: events.len(),
        total_files: files.len(),
        active_sessions: active_sessions(events, now, window),
        last_activity: dated(events)
            .max_by_key(|(at, _)| *at)
            .map(|(_, e)| e.timestamp.clone()),
        encryption_ops: ops.len(),
        generated_at: format_timestamp(now),
        warnings: Vec::new(),
    }
}

/// Count one user's actions by category
pub fn user_activity_summary(events: &[Event], username: &str) -> UserActivitySummary {
    let mut summary = UserActivitySummary {
        username: username.to_string(),
        ..Default::default()
    };

    for event in events.iter().filter(|e| e.username == username) {
        summary.total_events += 1;
        match event.category() {
            ActionCategory::Login => summary.logins += 1,
            ActionCategory::FileAccess => summary.file_accesses += 1,
            ActionCategory::Encryption => summary.encryptions += 1,
            ActionCategory::Decryption => summary.decryptions += 1,
            _ => {}
        }
    }

    summary
}

/// Encrypt/decrypt counts per ledger user
pub fn cipher_breakdown(ops: &[EncryptionOperation]) -> BTreeMap<String, CipherCounts> {
    let mut breakdown: BTreeMap<String, CipherCounts> = BTreeMap::new();
    for op in ops {
        let counts = breakdown.entry(op.username.clone()).or_default();
        if op.operation.is_encryption() {
            counts.encryptions += 1;
        } else {
            counts.decryptions += 1;
        }
    }
    breakdown
}

/// The `limit` newest events
pub fn recent_activity(events: &[Event], limit: usize) -> Vec<Event> {
    let mut recent = events.to_vec();
    sort_newest_first(&mut recent);
    recent.truncate(limit);
    recent
}

/// First and last event timestamps, `None` for an empty log
pub fn activity_timeline(events: &[Event]) -> Option<ActivityTimeline> {
    let (_, first) = dated(events).min_by_key(|(at, _)| *at)?;
    let (_, last) = dated(events).max_by_key(|(at, _)| *at)?;
    Some(ActivityTimeline {
        first: first.timestamp.clone(),
        last: last.timestamp.clone(),
    })
}

/// Events whose timestamp parses, paired with the parsed instant
fn dated(events: &[Event]) -> impl Iterator<Item = (DateTime<Utc>, &Event)> {
    events.iter().filter_map(|e| e.occurred_at().map(|at| (at, e)))
}
