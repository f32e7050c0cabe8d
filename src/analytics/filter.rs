//! Log filtering for the audit viewer

use crate::types::Event;

/// Case-insensitive substring filter over username and action
///
/// An absent or blank field matches everything. Matching never reorders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    user: Option<String>,
    action: Option<String>,
}

impl LogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, needle: impl Into<String>) -> Self {
        self.user = normalize(needle.into());
        self
    }

    pub fn action(mut self, needle: impl Into<String>) -> Self {
        self.action = normalize(needle.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.action.is_none()
    }

    pub fn matches(&self, event: &Event) -> bool {
        contains(self.user.as_deref(), &event.username)
            && contains(self.action.as_deref(), event.action.as_str())
    }

    /// Matching events in their original order
    pub fn apply<'a, I>(&self, events: I) -> Vec<Event>
    where
        I: IntoIterator<Item = &'a Event>,
    {
        events
            .into_iter()
            .filter(|event| self.matches(event))
            .cloned()
            .collect()
    }
}

/// Filter with optional substrings
pub fn filter_events(events: &[Event], user: Option<&str>, action: Option<&str>) -> Vec<Event> {
    let mut filter = LogFilter::new();
    if let Some(user) = user {
        filter = filter.user(user);
    }
    if let Some(action) = action {
        filter = filter.action(action);
    }
    filter.apply(events)
}

// stored lowercased, blank means no filter
fn normalize(needle: String) -> Option<String> {
    let trimmed = needle.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

fn contains(needle: Option<&str>, haystack: &str) -> bool {
    match needle {
        Some(needle) => haystack.to_lowercase().contains(needle),
        None => true,
    }
}
