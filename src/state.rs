use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::story::Story;

/// Snapshot of what the page shows. Never mutated in place; every
/// transition returns a new value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryState {
    pub fetching: bool,
    pub offline: bool,
    pub stories: Vec<Story>,
    pub last_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for StoryState {
    fn default() -> Self {
        Self {
            fetching: true,
            offline: false,
            stories: Vec::new(),
            last_error: None,
            updated_at: None,
        }
    }
}

impl StoryState {
    /// A network fetch delivered a normalized list.
    pub fn fetch_succeeded(&self, stories: Vec<Story>) -> Self {
        Self {
            fetching: false,
            offline: false,
            stories,
            last_error: None,
            updated_at: Some(Utc::now()),
        }
    }

    /// No connectivity; showing the cached list instead.
    pub fn offline_replayed(&self, stories: Vec<Story>) -> Self {
        Self {
            fetching: false,
            offline: true,
            stories,
            last_error: None,
            updated_at: self.updated_at,
        }
    }

    /// A fetch failed. With a cached list we fall back to it in offline
    /// mode, otherwise the current list stays.
    pub fn fetch_failed(&self, error: String, cached: Option<Vec<Story>>) -> Self {
        match cached {
            Some(stories) => Self {
                fetching: false,
                offline: true,
                stories,
                last_error: Some(error),
                updated_at: self.updated_at,
            },
            None => Self {
                fetching: false,
                last_error: Some(error),
                ..self.clone()
            },
        }
    }

    /// Connectivity dropped. The list is kept; only the flag changes.
    pub fn went_offline(&self) -> Self {
        Self {
            offline: true,
            ..self.clone()
        }
    }
}
