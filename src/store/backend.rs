//! Storage capability set shared by the durable and in-memory backends

use std::fmt;
use std::io;
use std::path::PathBuf;

/// The three persisted documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Document {
    Events,
    FileAccess,
    EncryptionLedger,
}

impl Document {
    pub const ALL: [Document; 3] = [
        Document::Events,
        Document::FileAccess,
        Document::EncryptionLedger,
    ];

    /// File name used by the durable backend
    pub fn file_name(&self) -> &'static str {
        match self {
            Document::Events => "events.jsonl",
            Document::FileAccess => "file_access.json",
            Document::EncryptionLedger => "encryption_ledger.json",
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Document::Events => write!(f, "event log"),
            Document::FileAccess => write!(f, "file-access table"),
            Document::EncryptionLedger => write!(f, "encryption ledger"),
        }
    }
}

/// Capability set {load, append/replace, archive} over raw document text.
///
/// Implementations must make `append_line` durable before returning and
/// `replace`/`archive` all-or-nothing: after a failed call the previous
/// contents are still intact.
pub trait StorageBackend: Send + Sync {
    /// Current contents, `Ok(None)` if the document was never written
    fn read(&self, document: Document) -> io::Result<Option<String>>;

    /// Append one line (a trailing newline is added)
    fn append_line(&self, document: Document, line: &str) -> io::Result<()>;

    /// Replace the whole document
    fn replace(&self, document: Document, contents: &str) -> io::Result<()>;

    /// Store `contents` under a backup name and return where it went
    fn archive(&self, name: &str, contents: &str) -> io::Result<PathBuf>;

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}
