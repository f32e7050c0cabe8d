//! Atomic file operations
//!
//! Whole documents (file-access table, cipher ledger, snapshots) are never
//! rewritten in place:
//!
//! 1. Write to a uniquely named sibling temp file (`.<name>.XXXXXX.tmp`)
//! 2. Call sync_all() to flush to disk
//! 3. Rename over the final path (atomic on the same filesystem)
//!
//! A reader therefore sees either the old document or the new one, never a
//! partial write. Each writer gets its own temp file, so two processes
//! replacing the same document race only on the final rename.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::{Builder, NamedTempFile};

const TEMP_SUFFIX: &str = ".tmp";

/// Highest `_N` suffix tried before giving up on a free name
const MAX_NAME_SUFFIX: usize = 999;

/// Result type for atomic operations
pub type AtomicResult<T> = Result<T, AtomicError>;

/// Errors that can occur during atomic operations
#[derive(Debug, thiserror::Error)]
pub enum AtomicError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("path has no file name: {0}")]
    NoFileName(String),
    #[error("no free file name left for {0}")]
    NamesExhausted(String),
}

impl From<AtomicError> for io::Error {
    fn from(e: AtomicError) -> Self {
        match e {
            AtomicError::Io(inner) => inner,
            AtomicError::NamesExhausted(path) => io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("no free file name left for {}", path),
            ),
            other => io::Error::new(io::ErrorKind::InvalidInput, other.to_string()),
        }
    }
}

/// Open a fresh temp file next to `path`, creating the parent directory
fn temp_file_for(path: &Path) -> AtomicResult<NamedTempFile> {
    let name = path
        .file_name()
        .ok_or_else(|| AtomicError::NoFileName(path.display().to_string()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut prefix = OsString::from(".");
    prefix.push(name);
    prefix.push(".");
    let temp = Builder::new()
        .prefix(&prefix)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)?;
    Ok(temp)
}

/// Write and flush a temp file for `path`; dropping it removes the file
fn write_temp<F>(path: &Path, write_fn: F) -> AtomicResult<NamedTempFile>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let mut temp = temp_file_for(path)?;
    write_fn(temp.as_file_mut())?;
    temp.as_file().sync_all()?;
    Ok(temp)
}

/// `path` for attempt 0, otherwise `<stem>_<n>.<ext>` next to it
pub fn numbered_path(path: &Path, n: usize) -> AtomicResult<PathBuf> {
    if n == 0 {
        return Ok(path.to_path_buf());
    }
    let stem = path
        .file_stem()
        .ok_or_else(|| AtomicError::NoFileName(path.display().to_string()))?;
    let mut name = OsString::from(stem);
    name.push(format!("_{}", n));
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    Ok(path.with_file_name(name))
}

/// Atomically write content to a file
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &str) -> AtomicResult<()> {
    atomic_write_with(path, |file| file.write_all(content.as_bytes()))
}

/// Atomically write content using a writer function
///
/// Avoids building large documents in memory first. On any failure the
/// temp file is removed and the destination is left untouched.
///
/// # Example
///
/// ```ignore
/// atomic_write_with("data/backup.json", |file| {
///     serde_json::to_writer_pretty(&mut *file, &doc)?;
///     Ok(())
/// })?;
/// ```
pub fn atomic_write_with<P, F>(path: P, write_fn: F) -> AtomicResult<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let path = path.as_ref();
    let temp = write_temp(path, write_fn)?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Atomically create a new file, never replacing an existing one
///
/// If `path` is taken, `<stem>_1.<ext>`, `<stem>_2.<ext>`, ... are tried
/// in turn. Returns the path actually written.
pub fn atomic_create<P: AsRef<Path>>(path: P, content: &str) -> AtomicResult<PathBuf> {
    atomic_create_with(path, |file| file.write_all(content.as_bytes()))
}

/// Writer-function form of [`atomic_create`]
pub fn atomic_create_with<P, F>(path: P, write_fn: F) -> AtomicResult<PathBuf>
where
    P: AsRef<Path>,
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let path = path.as_ref();
    let mut temp = write_temp(path, write_fn)?;

    for n in 0..=MAX_NAME_SUFFIX {
        let candidate = numbered_path(path, n)?;
        match temp.persist_noclobber(&candidate) {
            Ok(_) => return Ok(candidate),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => temp = e.file,
            Err(e) => return Err(e.error.into()),
        }
    }

    Err(AtomicError::NamesExhausted(path.display().to_string()))
}

/// Remove temp files in `dir` last modified at least `older_than` ago
///
/// Call this on startup to clean up temp files left behind by crashes.
/// Younger temp files may belong to a writer in another process and are
/// left alone.
pub fn cleanup_temp_files<P: AsRef<Path>>(dir: P, older_than: Duration) -> AtomicResult<usize> {
    let dir = dir.as_ref();
    let mut cleaned = 0;

    if !dir.is_dir() {
        return Ok(0);
    }

    let now = SystemTime::now();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        let is_temp = path
            .file_name()
            .map(|name| name.to_string_lossy().ends_with(TEMP_SUFFIX))
            .unwrap_or(false);
        if !is_temp || !path.is_file() {
            continue;
        }

        let age = now
            .duration_since(entry.metadata()?.modified()?)
            .unwrap_or_default();
        if age >= older_than {
            fs::remove_file(&path)?;
            cleaned += 1;
        }
    }

    Ok(cleaned)
}
