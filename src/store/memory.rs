//! In-memory backend with fault injection, for deterministic tests

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::{Document, StorageBackend};
use crate::utils::numbered_path;

/// Keeps every document in a map; can be told to fail specific operations
#[derive(Debug, Default)]
pub struct MemoryBackend {
    documents: Mutex<HashMap<Document, String>>,
    archives: Mutex<Vec<(String, String)>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_archives: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `read` fail with an I/O error
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every `append_line`/`replace` fail
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every `archive` fail
    pub fn fail_archives(&self, fail: bool) {
        self.fail_archives.store(fail, Ordering::SeqCst);
    }

    /// Raw document text, bypassing fault injection
    pub fn raw(&self, document: Document) -> Option<String> {
        self.documents.lock().get(&document).cloned()
    }

    /// Overwrite raw document text, e.g. to plant a corrupt document
    pub fn put_raw(&self, document: Document, contents: impl Into<String>) {
        self.documents.lock().insert(document, contents.into());
    }

    /// Archived (name, contents) pairs in write order
    pub fn archives(&self) -> Vec<(String, String)> {
        self.archives.lock().clone()
    }

    fn injected(op: &str) -> io::Error {
        io::Error::new(io::ErrorKind::Other, format!("injected {} failure", op))
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, document: Document) -> io::Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::injected("read"));
        }
        Ok(self.raw(document))
    }

    fn append_line(&self, document: Document, line: &str) -> io::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::injected("append"));
        }
        let mut documents = self.documents.lock();
        let text = documents.entry(document).or_default();
        text.push_str(line);
        text.push('\n');
        Ok(())
    }

    fn replace(&self, document: Document, contents: &str) -> io::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::injected("replace"));
        }
        self.put_raw(document, contents);
        Ok(())
    }

    fn archive(&self, name: &str, contents: &str) -> io::Result<PathBuf> {
        if self.fail_archives.load(Ordering::SeqCst) {
            return Err(Self::injected("archive"));
        }
        let base = PathBuf::from("memory").join("backups").join(name);
        let mut archives = self.archives.lock();

        // same naming rule as the file backend: never reuse a taken name
        let mut n = 0;
        loop {
            let path = numbered_path(&base, n)?;
            let candidate = path.file_name().unwrap_or_default().to_string_lossy().into_owned();
            if archives.iter().all(|(existing, _)| *existing != candidate) {
                archives.push((candidate, contents.to_string()));
                return Ok(path);
            }
            n += 1;
        }
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
