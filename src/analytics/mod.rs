//! Derived read-models over the stores
//!
//! Nothing here touches storage. Every function takes loaded data and a
//! reference instant, so results are recomputed from scratch on each call.

mod filter;
mod session;
mod stats;

pub use filter::{filter_events, LogFilter};
pub use session::{active_sessions, reconstruct, Session, DEFAULT_SESSION_WINDOW_SECS};
pub use stats::{
    activity_timeline, cipher_breakdown, distinct_users, recent_activity, summarize,
    user_activity_summary, DEFAULT_RECENT_LIMIT,
};
