//! Durable backend on the local filesystem

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

use super::{Document, StorageBackend, StoreConfig};
use crate::utils::{atomic_create, atomic_write, cleanup_temp_files};

/// Temp files younger than this may still belong to a live writer
pub const STALE_TEMP_AGE: Duration = Duration::from_secs(60 * 60);

/// Stores each document as a file under the data directory
#[derive(Debug, Clone)]
pub struct FileBackend {
    config: StoreConfig,
}

impl FileBackend {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    /// Create the data directory and remove stale temp files left by a crash
    pub fn open(config: StoreConfig) -> io::Result<Self> {
        fs::create_dir_all(config.data_dir())?;
        for dir in [config.data_dir().to_path_buf(), config.backups_dir()] {
            let cleaned = cleanup_temp_files(&dir, STALE_TEMP_AGE)?;
            if cleaned > 0 {
                info!(cleaned, dir = %dir.display(), "Removed stale temp files");
            }
        }
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, document: Document) -> io::Result<Option<String>> {
        match fs::read_to_string(self.config.document_path(document)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn append_line(&self, document: Document, line: &str) -> io::Result<()> {
        let path = self.config.document_path(document);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;

        // single write so concurrent appenders never interleave inside a line
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        file.write_all(buf.as_bytes())?;

        // Sync to disk for durability
        file.sync_all()?;
        Ok(())
    }

    fn replace(&self, document: Document, contents: &str) -> io::Result<()> {
        let path = self.config.document_path(document);
        atomic_write(&path, contents)?;
        debug!(path = %path.display(), bytes = contents.len(), "Replaced document");
        Ok(())
    }

    fn archive(&self, name: &str, contents: &str) -> io::Result<PathBuf> {
        let path = atomic_create(self.config.backups_dir().join(name), contents)?;
        debug!(path = %path.display(), bytes = contents.len(), "Archived document");
        Ok(path)
    }

    fn describe(&self) -> String {
        self.config.data_dir().display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_backend() -> (FileBackend, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::open(StoreConfig::new(temp_dir.path().join("data"))).unwrap();
        (backend, temp_dir)
    }

    #[test]
    fn test_absent_document_reads_none() {
        let (backend, _temp_dir) = create_test_backend();
        assert!(backend.read(Document::Events).unwrap().is_none());
    }

    #[test]
    fn test_append_lines() {
        let (backend, _temp_dir) = create_test_backend();
        backend.append_line(Document::Events, "{\"a\":1}").unwrap();
        backend.append_line(Document::Events, "{\"a\":2}").unwrap();

        let text = backend.read(Document::Events).unwrap().unwrap();
        assert_eq!(text, "{\"a\":1}\n{\"a\":2}\n");
    }

    #[test]
    fn test_replace_and_archive() {
        let (backend, _temp_dir) = create_test_backend();
        backend.replace(Document::FileAccess, "{}").unwrap();
        assert_eq!(backend.read(Document::FileAccess).unwrap().unwrap(), "{}");

        let path = backend.archive("events_backup_x.jsonl", "old").unwrap();
        assert!(path.starts_with(backend.config().backups_dir()));
        assert_eq!(fs::read_to_string(path).unwrap(), "old");
    }

    #[test]
    fn test_archive_never_overwrites() {
        let (backend, _temp_dir) = create_test_backend();

        let first = backend.archive("events_backup_x.jsonl", "first").unwrap();
        let second = backend.archive("events_backup_x.jsonl", "second").unwrap();

        assert_ne!(first, second);
        assert_eq!(fs::read_to_string(&first).unwrap(), "first");
        assert_eq!(fs::read_to_string(&second).unwrap(), "second");
    }

    #[test]
    fn test_open_keeps_fresh_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().join("data");
        fs::create_dir_all(&data_dir).unwrap();
        let in_flight = data_dir.join(".file_access.json.Qx81zA.tmp");
        fs::write(&in_flight, "{").unwrap();

        FileBackend::open(StoreConfig::new(&data_dir)).unwrap();
        assert!(in_flight.exists());
    }

    #[test]
    fn test_concurrent_replace_from_two_backends() {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig::new(temp_dir.path().join("data"));
        let writers = [
            FileBackend::open(config.clone()).unwrap(),
            FileBackend::open(config.clone()).unwrap(),
        ];

        std::thread::scope(|scope| {
            for (id, backend) in writers.iter().enumerate() {
                scope.spawn(move || {
                    for round in 0..200 {
                        let doc = format!("[{{\"writer\":{},\"round\":{}}}]", id, round);
                        backend.replace(Document::EncryptionLedger, &doc).unwrap();
                    }
                });
            }
        });

        // last writer wins, and the survivor is a complete document
        let text = writers[0].read(Document::EncryptionLedger).unwrap().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0]["round"], 199);

        let leftovers = fs::read_dir(config.data_dir())
            .unwrap()
            .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }
}
