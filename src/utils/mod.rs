//! Utility functions and helpers
//!
//! Timestamp formatting/parsing, clocks, and atomic file writes.

pub mod atomic;
pub mod time;

pub use atomic::{
    atomic_create, atomic_create_with, atomic_write, atomic_write_with, cleanup_temp_files,
    numbered_path, AtomicError, AtomicResult,
};
pub use time::{
    format_stamp, format_timestamp, get_current_user, parse_timestamp, Clock, ManualClock,
    SystemClock,
};
