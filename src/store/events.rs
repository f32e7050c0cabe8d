//! Event Log - the append-only audit trail
//!
//! One JSON event per line. Appends are confirmed durable before
//! returning; clearing always archives first.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use tracing::{info, warn};

use super::{Document, StorageBackend};
use crate::error::{MonitorError, MonitorResult};
use crate::types::Event;
use crate::utils::format_stamp;

/// Outcome of a successful clear
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearReport {
    /// Where the previous contents were archived
    pub archive: PathBuf,
    /// Number of events that were archived and removed
    pub cleared: usize,
}

/// The EventLog manages the append-only audit trail
pub struct EventLog {
    backend: Arc<dyn StorageBackend>,
    lock: Mutex<()>,
}

impl EventLog {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            lock: Mutex::new(()),
        }
    }

    /// Append an event to the log
    ///
    /// Fails if the backend cannot confirm the write; the event is never
    /// silently dropped.
    pub fn append(&self, event: &Event) -> MonitorResult<()> {
        let line = event
            .to_json_line()
            .map_err(|e| MonitorError::schema(Document::Events, e))?;

        let _guard = self.lock.lock();
        self.backend
            .append_line(Document::Events, &line)
            .map_err(|e| MonitorError::io(Document::Events, e))
    }

    /// Load all events in insertion order
    ///
    /// An absent or empty log is an empty vector. Lines that do not parse
    /// are skipped with a warning so one bad line never hides the rest.
    pub fn load_all(&self) -> MonitorResult<Vec<Event>> {
        let _guard = self.lock.lock();
        self.read_locked()
    }

    pub(crate) fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock()
    }

    /// Read without taking the lock; caller must hold `guard()`
    pub(crate) fn read_locked(&self) -> MonitorResult<Vec<Event>> {
        let text = match self
            .backend
            .read(Document::Events)
            .map_err(|e| MonitorError::io(Document::Events, e))?
        {
            Some(text) => text,
            None => return Ok(Vec::new()),
        };

        let mut events = Vec::new();
        for (line_num, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            match Event::from_json_line(line) {
                Ok(event) => events.push(event),
                Err(e) => {
                    warn!(line = line_num + 1, error = %e, "Skipping unparseable event");
                }
            }
        }

        Ok(events)
    }

    /// Archive the current log, then truncate it
    ///
    /// The archive never replaces an earlier one: a second clear within the
    /// same millisecond gets a `_1` suffix. If the archive cannot be written
    /// the log is left exactly as it was and `MonitorError::Backup` is
    /// returned.
    pub fn clear(&self, at: DateTime<Utc>) -> MonitorResult<ClearReport> {
        let _guard = self.lock.lock();

        let contents = self
            .backend
            .read(Document::Events)
            .map_err(|e| MonitorError::io(Document::Events, e))?
            .unwrap_or_default();
        let cleared = contents.lines().filter(|l| !l.trim().is_empty()).count();

        let name = format!(
            "events_backup_{}_{:03}.jsonl",
            format_stamp(at),
            at.timestamp_subsec_millis()
        );
        let archive = self
            .backend
            .archive(&name, &contents)
            .map_err(MonitorError::Backup)?;

        self.backend
            .replace(Document::Events, "")
            .map_err(|e| MonitorError::io(Document::Events, e))?;

        info!(cleared, archive = %archive.display(), "Cleared event log");
        Ok(ClearReport { archive, cleared })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBackend;
    use crate::types::Action;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn create_test_log() -> (EventLog, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let log = EventLog::new(backend.clone());
        (log, backend)
    }

    #[test]
    fn test_append_and_load_events() {
        let (log, _backend) = create_test_log();

        let e1 = Event::new(t0(), "anna", Action::Login, "User logged in");
        let e2 = Event::new(t0() + Duration::seconds(1), "anna", Action::FileAccess, "a.txt");
        log.append(&e1).unwrap();
        log.append(&e2).unwrap();

        assert_eq!(log.load_all().unwrap(), vec![e1, e2]);
    }

    #[test]
    fn test_empty_log() {
        let (log, backend) = create_test_log();
        assert!(log.load_all().unwrap().is_empty());

        backend.put_raw(Document::Events, "\n\n");
        assert!(log.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_bad_lines_are_skipped() {
        let (log, backend) = create_test_log();
        let good = Event::new(t0(), "bob", Action::Logout, "");
        backend.put_raw(
            Document::Events,
            format!("{{not json\n{}\n", good.to_json_line().unwrap()),
        );

        assert_eq!(log.load_all().unwrap(), vec![good]);
    }

    #[test]
    fn test_append_failure_is_reported() {
        let (log, backend) = create_test_log();
        backend.fail_writes(true);

        let err = log
            .append(&Event::new(t0(), "bob", Action::Login, ""))
            .unwrap_err();
        assert!(matches!(err, MonitorError::Io { document: Document::Events, .. }));
    }

    #[test]
    fn test_clear_archives_first() {
        let (log, backend) = create_test_log();
        log.append(&Event::new(t0(), "anna", Action::Login, "")).unwrap();
        log.append(&Event::new(t0(), "bob", Action::Login, "")).unwrap();
        let before = backend.raw(Document::Events).unwrap();

        let report = log.clear(t0()).unwrap();

        assert_eq!(report.cleared, 2);
        assert!(log.load_all().unwrap().is_empty());
        let archives = backend.archives();
        assert_eq!(archives.len(), 1);
        assert_eq!(archives[0].0, "events_backup_20240101_120000_000.jsonl");
        assert_eq!(archives[0].1, before);
    }

    #[test]
    fn test_clear_aborts_when_backup_fails() {
        let (log, backend) = create_test_log();
        let event = Event::new(t0(), "anna", Action::Login, "");
        log.append(&event).unwrap();
        let before = backend.raw(Document::Events).unwrap();

        backend.fail_archives(true);
        let err = log.clear(t0()).unwrap_err();

        assert!(matches!(err, MonitorError::Backup(_)));
        assert_eq!(backend.raw(Document::Events).unwrap(), before);
        assert_eq!(log.load_all().unwrap(), vec![event]);
    }

    #[test]
    fn test_repeated_clear_keeps_every_archive() {
        let (log, backend) = create_test_log();
        log.append(&Event::new(t0(), "anna", Action::Login, "precious")).unwrap();
        let first = log.clear(t0()).unwrap();

        log.append(&Event::new(t0(), "bob", Action::Login, "")).unwrap();
        let second = log.clear(t0()).unwrap();

        assert_ne!(first.archive, second.archive);
        let archives = backend.archives();
        assert_eq!(archives.len(), 2);
        assert!(archives[0].1.contains("precious"));
        assert_eq!(archives[1].0, "events_backup_20240101_120000_000_1.jsonl");
        assert!(archives[1].1.contains("bob"));
    }
}
