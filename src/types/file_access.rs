//! File access aggregate types

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{format_timestamp, parse_timestamp};

/// One observed access to a file, as reported by a producer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAccess {
    pub path: String,
    pub username: String,
    /// Size in bytes at access time, when the producer knows it
    pub size_bytes: Option<u64>,
}

impl FileAccess {
    pub fn new(path: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            username: username.into(),
            size_bytes: None,
        }
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }

    /// Registry key: the file's basename, or the whole path if it has none
    pub fn key(&self) -> String {
        file_key(&self.path)
    }
}

/// Registry key for a path
pub fn file_key(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// Per-file access statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAccessRecord {
    pub full_path: String,
    /// Never decreases
    pub accessed_count: u64,
    /// Set on creation, never overwritten
    #[serde(default)]
    pub first_access: String,
    #[serde(default)]
    pub last_access: String,
    /// Grows only
    #[serde(default)]
    pub accessed_by: BTreeSet<String>,
    #[serde(default)]
    pub file_size: u64,
}

impl FileAccessRecord {
    fn first_seen(path: &str, at: &str) -> Self {
        Self {
            full_path: path.to_string(),
            accessed_count: 0,
            first_access: at.to_string(),
            last_access: at.to_string(),
            accessed_by: BTreeSet::new(),
            file_size: 0,
        }
    }

    fn touch(&mut self, access: &FileAccess, at: DateTime<Utc>) {
        let stamp = format_timestamp(at);

        self.accessed_count += 1;
        if self.first_access.is_empty() {
            self.first_access = stamp.clone();
        }

        // keep first_access <= last_access even if the caller's clock went backwards
        let before_first = parse_timestamp(&self.first_access).is_some_and(|first| at < first);
        self.last_access = if before_first {
            self.first_access.clone()
        } else {
            stamp
        };

        self.accessed_by.insert(access.username.clone());
        if let Some(size) = access.size_bytes {
            self.file_size = size;
        }
    }
}

/// The whole registry document, keyed by basename
pub type FileAccessTable = BTreeMap<String, FileAccessRecord>;

/// Upsert one access into `table`, returning the updated record
pub fn apply_access<'a>(
    table: &'a mut FileAccessTable,
    access: &FileAccess,
    at: DateTime<Utc>,
) -> &'a FileAccessRecord {
    let stamp = format_timestamp(at);
    let record = table
        .entry(access.key())
        .or_insert_with(|| FileAccessRecord::first_seen(&access.path, &stamp));
    record.touch(access, at);
    record
}

/// Records sorted by most recent access first
pub fn by_recency(table: &FileAccessTable) -> Vec<(&String, &FileAccessRecord)> {
    let mut records: Vec<_> = table.iter().collect();
    records.sort_by(|a, b| b.1.last_access.cmp(&a.1.last_access));
    records
}
