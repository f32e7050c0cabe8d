//! Session reconstruction
//!
//! Sessions are never stored. They are rebuilt from the audit log on every
//! request: within the window, the latest login-class event per user opens
//! a session and a logout-class event by the same user closes it.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ActionCategory, Event};

/// Default look-back window
pub const DEFAULT_SESSION_WINDOW_SECS: i64 = 60 * 60;

/// A session inferred from an unmatched login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
    pub started_at: DateTime<Utc>,
}

/// Rebuild the open sessions in `[now - window, now]`, sorted by username
pub fn reconstruct(events: &[Event], now: DateTime<Utc>, window: Duration) -> Vec<Session> {
    let since = now - window;

    let mut in_window: Vec<(DateTime<Utc>, &Event)> = events
        .iter()
        .filter_map(|event| event.occurred_at().map(|at| (at, event)))
        .filter(|(at, _)| *at >= since && *at <= now)
        .collect();
    // stable: events with equal timestamps keep log order
    in_window.sort_by_key(|(at, _)| *at);

    let mut open: HashMap<&str, DateTime<Utc>> = HashMap::new();
    for (at, event) in in_window {
        match event.category() {
            ActionCategory::Login => {
                open.insert(event.username.as_str(), at);
            }
            ActionCategory::Logout => {
                open.remove(event.username.as_str());
            }
            _ => {}
        }
    }

    let mut sessions: Vec<Session> = open
        .into_iter()
        .map(|(username, started_at)| Session {
            username: username.to_string(),
            started_at,
        })
        .collect();
    sessions.sort_by(|a, b| a.username.cmp(&b.username));
    sessions
}

/// Number of users with an open session in the window
pub fn active_sessions(events: &[Event], now: DateTime<Utc>, window: Duration) -> usize {
    reconstruct(events, now, window).len()
}
