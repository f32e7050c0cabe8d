//! Activity Monitor
//!
//! Durable telemetry and audit store for a user-facing application and the
//! admin dashboard that watches it.
//!
//! # Features
//!
//! - **Audit log**: append-only JSON lines, fsync'd before returning
//! - **File access registry**: per-file counters, first/last access, accessors
//! - **Encryption ledger**: cipher metadata only, never plaintext
//! - **Sessions**: reconstructed from the log on every read
//! - **Snapshots**: atomic export and timestamped backups
//! - **Refresh scheduler**: periodic dashboard recomputation on a tokio task
//!
//! # Modules
//!
//! - `types`: Records (Event, FileAccessRecord, EncryptionOperation, ...)
//! - `store`: Storage backends and the three durable stores
//! - `analytics`: Sessions, dashboard stats and log filtering
//! - `scheduler`: Cancellable periodic refresh
//! - `monitor`: The `ActivityMonitor` facade
//! - `config`: Environment configuration
//! - `utils`: Time and atomic-write helpers
//!
//! # Example
//!
//! ```no_run
//! use activity_monitor::{ActivityMonitor, MonitorConfig};
//! use activity_monitor::types::{Action, FileAccess};
//!
//! fn main() -> activity_monitor::MonitorResult<()> {
//!     let monitor = ActivityMonitor::open(MonitorConfig::from_env()?)?;
//!     monitor.append_event("anna", Action::Login, "User logged in")?;
//!     monitor.record_file_access(&FileAccess::new("/home/anna/plan.txt", "anna"))?;
//!     println!("{:?}", monitor.compute_stats());
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod config;
pub mod error;
pub mod monitor;
pub mod scheduler;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::MonitorConfig;
pub use error::{MonitorError, MonitorResult};
pub use monitor::ActivityMonitor;
pub use scheduler::{RefreshScheduler, SchedulerState};
pub use store::{FileBackend, MemoryBackend, StorageBackend, StoreConfig};
pub use types::{
    Action, ActionCategory, DashboardStats, EncryptionOperation, Event, FileAccess,
    FileAccessRecord,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
