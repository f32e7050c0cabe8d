//! Dashboard statistics types

use serde::{Deserialize, Serialize};

/// Top-level dashboard numbers, recomputed on every refresh
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Distinct usernames seen across events, file accessors and the ledger
    pub total_users: usize,
    pub total_events: usize,
    pub total_files: usize,
    pub active_sessions: usize,
    /// Greatest event timestamp, `None` when the log is empty
    pub last_activity: Option<String>,
    pub encryption_ops: usize,
    pub generated_at: String,
    /// Load-path problems that were degraded to empty data
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl DashboardStats {
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Per-user action counts by category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActivitySummary {
    pub username: String,
    pub total_events: usize,
    pub logins: usize,
    pub file_accesses: usize,
    pub encryptions: usize,
    pub decryptions: usize,
}

impl std::fmt::Display for UserActivitySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Logins: {}, Files: {}, Encryption: {}, Decryption: {}",
            self.logins, self.file_accesses, self.encryptions, self.decryptions
        )
    }
}

/// Ledger operations for one user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherCounts {
    pub encryptions: usize,
    pub decryptions: usize,
}

impl CipherCounts {
    pub fn total(&self) -> usize {
        self.encryptions + self.decryptions
    }
}

/// First and last timestamps in the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityTimeline {
    pub first: String,
    pub last: String,
}
