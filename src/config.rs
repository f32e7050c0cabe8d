//! Runtime configuration
//!
//! Environment variables:
//! - `ACTIVITY_DATA_DIR`: data directory (default `data`, relative to cwd)
//! - `ACTIVITY_REFRESH_SECS`: dashboard refresh period (default 10)
//! - `ACTIVITY_SESSION_WINDOW_SECS`: session look-back window (default 3600)
//! - `ACTIVITY_BACKUP_KEEP`: backups to retain after each backup (default: all)

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analytics::DEFAULT_SESSION_WINDOW_SECS;
use crate::error::{MonitorError, MonitorResult};
use crate::scheduler::DEFAULT_REFRESH_INTERVAL;
use crate::store::StoreConfig;
use crate::utils::get_current_user;

pub const DATA_DIR_VAR: &str = "ACTIVITY_DATA_DIR";
pub const REFRESH_SECS_VAR: &str = "ACTIVITY_REFRESH_SECS";
pub const SESSION_WINDOW_VAR: &str = "ACTIVITY_SESSION_WINDOW_SECS";
pub const BACKUP_KEEP_VAR: &str = "ACTIVITY_BACKUP_KEEP";

/// Everything the monitor needs to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub store: StoreConfig,
    pub refresh_interval: Duration,
    pub session_window: chrono::Duration,
    /// Prune to this many backups after each backup; `None` keeps all
    pub backup_keep: Option<usize>,
    /// Username recorded on admin audit events and snapshots
    pub actor: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            session_window: chrono::Duration::seconds(DEFAULT_SESSION_WINDOW_SECS),
            backup_keep: None,
            actor: get_current_user(),
        }
    }
}

impl MonitorConfig {
    /// Build from the process environment
    pub fn from_env() -> MonitorResult<Self> {
        let current_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::from_lookup(|key| env::var(key).ok(), &current_dir)
    }

    /// Build from an arbitrary variable lookup, resolving relative paths
    /// against `current_dir`
    pub fn from_lookup<F>(lookup: F, current_dir: &Path) -> MonitorResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let data_dir = lookup(DATA_DIR_VAR).unwrap_or_else(|| "data".to_string());
        let data_dir = if Path::new(&data_dir).is_absolute() {
            PathBuf::from(data_dir)
        } else {
            current_dir.join(data_dir)
        };
        config.store = StoreConfig::new(data_dir);

        if let Some(secs) = parse_var::<u64, _>(&lookup, REFRESH_SECS_VAR)? {
            if secs == 0 {
                return Err(MonitorError::Config(format!(
                    "{} must be at least 1",
                    REFRESH_SECS_VAR
                )));
            }
            config.refresh_interval = Duration::from_secs(secs);
        }

        if let Some(secs) = parse_var::<i64, _>(&lookup, SESSION_WINDOW_VAR)? {
            if secs <= 0 {
                return Err(MonitorError::Config(format!(
                    "{} must be positive",
                    SESSION_WINDOW_VAR
                )));
            }
            config.session_window = chrono::Duration::seconds(secs);
        }

        config.backup_keep = parse_var::<usize, _>(&lookup, BACKUP_KEEP_VAR)?;

        Ok(config)
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }
}

fn parse_var<T, L>(lookup: &L, key: &str) -> MonitorResult<Option<T>>
where
    L: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| MonitorError::Config(format!("{}={:?}: {}", key, raw, e))),
    }
}
