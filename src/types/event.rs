//! Audit events
//!
//! Events are immutable records of user and system actions. Storage order
//! is insertion order; display order is newest first by timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::action::{Action, ActionCategory};
use crate::utils::{format_timestamp, parse_timestamp};

/// An immutable entry in the audit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// ISO-8601 UTC timestamp; kept as text so a malformed value in an
    /// old log never makes the whole log unreadable
    pub timestamp: String,

    /// User (or `system`) that performed the action
    pub username: String,

    pub action: Action,

    /// Free-form description
    #[serde(default)]
    pub details: String,
}

impl Event {
    /// Create a new event at the given instant
    pub fn new(
        at: DateTime<Utc>,
        username: impl Into<String>,
        action: impl Into<Action>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: format_timestamp(at),
            username: username.into(),
            action: action.into(),
            details: details.into(),
        }
    }

    /// Create an event with a raw, possibly non-canonical timestamp
    pub fn with_raw_timestamp(
        timestamp: impl Into<String>,
        username: impl Into<String>,
        action: impl Into<Action>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            username: username.into(),
            action: action.into(),
            details: details.into(),
        }
    }

    /// Parsed timestamp, `None` when unparseable
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    pub fn category(&self) -> ActionCategory {
        self.action.category()
    }

    /// Serialize event to JSON string (for JSONL)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize event from JSON string
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Sort events for display: newest first, by timestamp string
pub fn sort_newest_first(events: &mut [Event]) {
    events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_event_serialization() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 8, 30, 0).unwrap();
        let event = Event::new(at, "anna", Action::FileAccess, "Accessed file: notes.txt");

        let json = event.to_json_line().unwrap();
        assert!(json.contains("\"timestamp\":\"2024-01-01T08:30:00.000000Z\""));
        assert!(json.contains("\"action\":\"file_access\""));

        let parsed = Event::from_json_line(&json).unwrap();
        assert_eq!(parsed, event);
        assert_eq!(parsed.occurred_at(), Some(at));
    }

    #[test]
    fn test_missing_details_defaults_empty() {
        let parsed = Event::from_json_line(
            r#"{"timestamp":"2024-01-01T00:00:00","username":"bob","action":"login"}"#,
        )
        .unwrap();
        assert_eq!(parsed.details, "");
        assert_eq!(parsed.action, Action::Login);
    }

    #[test]
    fn test_bad_timestamp_is_kept_but_unparsed() {
        let event = Event::with_raw_timestamp("not-a-time", "bob", "login", "");
        assert!(event.occurred_at().is_none());
    }

    #[test]
    fn test_sort_newest_first() {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut events = vec![
            Event::new(base, "a", Action::Login, ""),
            Event::new(base + chrono::Duration::hours(2), "b", Action::Login, ""),
            Event::new(base + chrono::Duration::hours(1), "c", Action::Login, ""),
        ];
        sort_newest_first(&mut events);
        let users: Vec<_> = events.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(users, vec!["b", "c", "a"]);
    }
}
