//! Activity Monitor Integration Tests
//!
//! End-to-end flows over the durable file backend:
//! - Producer writes and consumer reads through separate monitor handles
//! - Session reconstruction and dashboard stats
//! - Clear with archive, and clear aborted by a failing archive
//! - Scheduler delivering stats

use std::fs;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tempfile::TempDir;
use tokio::sync::mpsc;

use activity_monitor::store::Document;
use activity_monitor::types::{Action, EncryptionOperation, FileAccess};
use activity_monitor::utils::{Clock, ManualClock};
use activity_monitor::{ActivityMonitor, FileBackend, MonitorConfig, MonitorError, StoreConfig};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 1, 9, 0, 0).unwrap()
}

fn test_config(temp_dir: &TempDir) -> MonitorConfig {
    MonitorConfig {
        store: StoreConfig::new(temp_dir.path().join("data")),
        ..MonitorConfig::default()
    }
    .with_actor("admin")
}

fn open_monitor(config: MonitorConfig, clock: &ManualClock) -> ActivityMonitor {
    let backend = FileBackend::open(config.store.clone()).unwrap();
    ActivityMonitor::new(config, Arc::new(backend), Arc::new(clock.clone()))
}

#[test]
fn test_events_survive_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let clock = ManualClock::new(t0());

    let producer = open_monitor(test_config(&temp_dir), &clock);
    let e1 = producer.append_event("anna", Action::Login, "User logged in").unwrap();
    clock.advance(Duration::seconds(1));
    let e2 = producer
        .append_event("anna", Action::FileAccess, "Accessed file: plan.txt")
        .unwrap();
    drop(producer);

    let consumer = open_monitor(test_config(&temp_dir), &clock);
    assert_eq!(consumer.load_events(), vec![e1, e2]);

    let raw = fs::read_to_string(temp_dir.path().join("data").join("events.jsonl")).unwrap();
    assert_eq!(raw.lines().count(), 2);
}

#[test]
fn test_dashboard_scenario() {
    let temp_dir = TempDir::new().unwrap();
    let clock = ManualClock::new(t0());
    let monitor = open_monitor(test_config(&temp_dir), &clock);

    monitor.append_event("anna", Action::ClientSessionStart, "").unwrap();
    monitor.append_event("bob", Action::ClientSessionStart, "").unwrap();
    clock.advance(Duration::minutes(5));
    monitor.append_event("anna", Action::ClientLogout, "").unwrap();

    monitor
        .record_file_access(&FileAccess::new("/home/bob/report.pdf", "bob").with_size(2048))
        .unwrap();
    clock.advance(Duration::minutes(1));
    let record = monitor
        .record_file_access(&FileAccess::new("/home/bob/report.pdf", "carol"))
        .unwrap();
    assert_eq!(record.accessed_count, 2);
    assert_eq!(record.file_size, 2048);

    monitor
        .record_encryption_op(&EncryptionOperation::encryption(clock.now(), "bob", 11, 44))
        .unwrap();

    let stats = monitor.compute_stats();
    assert_eq!(stats.total_events, 3);
    assert_eq!(stats.active_sessions, 1);
    assert_eq!(stats.total_files, 1);
    assert_eq!(stats.encryption_ops, 1);
    assert_eq!(stats.total_users, 3);
    assert!(stats.warnings.is_empty());

    let sessions = monitor.sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].username, "bob");

    // an hour later every session has aged out of the window
    clock.advance(Duration::hours(1));
    assert_eq!(monitor.active_sessions(), 0);
}

#[test]
fn test_corrupt_table_degrades_dashboard() {
    let temp_dir = TempDir::new().unwrap();
    let clock = ManualClock::new(t0());
    let config = test_config(&temp_dir);
    let monitor = open_monitor(config.clone(), &clock);
    monitor.append_event("anna", Action::Login, "").unwrap();

    let table_path = config.store.document_path(Document::FileAccess);
    fs::write(&table_path, "{\"broken\": ").unwrap();

    let stats = monitor.compute_stats();
    assert_eq!(stats.total_events, 1);
    assert_eq!(stats.total_files, 0);
    assert!(stats.is_degraded());

    // writes refuse to overwrite what they cannot parse
    assert!(monitor
        .record_file_access(&FileAccess::new("a.txt", "anna"))
        .is_err());
    assert_eq!(fs::read_to_string(&table_path).unwrap(), "{\"broken\": ");
}

#[test]
fn test_filter_events() {
    let temp_dir = TempDir::new().unwrap();
    let clock = ManualClock::new(t0());
    let monitor = open_monitor(test_config(&temp_dir), &clock);

    monitor.append_event("anna", Action::Login, "").unwrap();
    monitor.append_event("Anna", Action::TextEncryption, "").unwrap();
    monitor.append_event("bob", Action::Login, "").unwrap();

    let users: Vec<_> = monitor
        .filter_events(Some("ann"), None)
        .into_iter()
        .map(|e| e.username)
        .collect();
    assert_eq!(users, vec!["anna", "Anna"]);

    assert_eq!(monitor.filter_events(Some("ann"), Some("LOGIN")).len(), 1);
    assert_eq!(monitor.filter_events(Some(""), None).len(), 3);
}

#[test]
fn test_clear_archives_then_truncates() {
    let temp_dir = TempDir::new().unwrap();
    let clock = ManualClock::new(t0());
    let config = test_config(&temp_dir);
    let monitor = open_monitor(config.clone(), &clock);

    monitor.append_event("anna", Action::Login, "").unwrap();
    monitor.append_event("bob", Action::Login, "").unwrap();
    let before = fs::read_to_string(config.store.document_path(Document::Events)).unwrap();

    let report = monitor.clear_events().unwrap();

    assert_eq!(report.cleared, 2);
    assert_eq!(fs::read_to_string(&report.archive).unwrap(), before);
    assert!(report.archive.starts_with(config.store.backups_dir()));

    let events = monitor.load_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, Action::AdminClearLogs);
}

#[test]
fn test_clear_twice_in_same_instant_keeps_both_archives() {
    let temp_dir = TempDir::new().unwrap();
    let clock = ManualClock::new(t0());
    let config = test_config(&temp_dir);
    let monitor = open_monitor(config.clone(), &clock);

    monitor.append_event("anna", Action::Login, "precious").unwrap();
    let first = monitor.clear_events().unwrap();
    let second = monitor.clear_events().unwrap();

    assert_ne!(first.archive, second.archive);
    assert!(fs::read_to_string(&first.archive).unwrap().contains("precious"));
    // the second archive holds the audit event written by the first clear
    assert!(fs::read_to_string(&second.archive)
        .unwrap()
        .contains("admin_clear_logs"));

    let on_disk = fs::read_dir(config.store.backups_dir()).unwrap().count();
    assert_eq!(on_disk, 2);
}

#[test]
fn test_clear_with_unwritable_backups_leaves_log() {
    let temp_dir = TempDir::new().unwrap();
    let clock = ManualClock::new(t0());
    let config = test_config(&temp_dir);
    let monitor = open_monitor(config.clone(), &clock);

    monitor.append_event("anna", Action::Login, "").unwrap();
    let before = fs::read(config.store.document_path(Document::Events)).unwrap();

    // a plain file where the backups directory should be
    fs::write(config.store.backups_dir(), "blocked").unwrap();

    let err = monitor.clear_events().unwrap_err();
    assert!(matches!(err, MonitorError::Backup(_)));
    assert_eq!(fs::read(config.store.document_path(Document::Events)).unwrap(), before);
    assert_eq!(monitor.load_events().len(), 1);
}

#[tokio::test]
async fn test_scheduler_delivers_stats() {
    let temp_dir = TempDir::new().unwrap();
    let clock = ManualClock::new(t0());
    let mut config = test_config(&temp_dir);
    config.refresh_interval = StdDuration::from_millis(20);

    let monitor = Arc::new(open_monitor(config, &clock));
    monitor.append_event("anna", Action::Login, "").unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let scheduler = monitor.scheduler(tx);

    scheduler.refresh_now();
    let stats = tokio::time::timeout(StdDuration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stats.total_events, 1);
    assert_eq!(stats.active_sessions, 1);

    scheduler.start();
    let ticked = tokio::time::timeout(StdDuration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ticked.total_events, 1);
    scheduler.stop();
}
