use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Story identifier as sent by the feed, either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoryId {
    Number(i64),
    Text(String),
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoryId::Number(n) => write!(f, "{}", n),
            StoryId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for StoryId {
    fn from(n: i64) -> Self {
        StoryId::Number(n)
    }
}

impl From<&str> for StoryId {
    fn from(s: &str) -> Self {
        StoryId::Text(s.to_string())
    }
}

/// A single news item. Display fields are kept as-is and written back
/// verbatim when the list is cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    pub id: StoryId,
    pub position: i64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Story {
    pub fn new(id: impl Into<StoryId>, position: i64) -> Self {
        Self {
            id: id.into(),
            position,
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// String display field, if present and non-empty.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Body of the upstream story endpoint. Records are decoded one by one so a
/// single bad entry does not cost the whole feed.
#[derive(Debug, Deserialize)]
pub struct StoryFeed {
    stories: Vec<Value>,
}

impl StoryFeed {
    pub fn len(&self) -> usize {
        self.stories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }

    /// Decodes every record, skipping (and logging) the ones without a usable
    /// `id` or `position`.
    pub fn into_stories(self) -> Vec<Story> {
        self.stories
            .into_iter()
            .enumerate()
            .filter_map(|(index, raw)| match serde_json::from_value(raw) {
                Ok(story) => Some(story),
                Err(e) => {
                    warn!("Skipping story record #{}: {}", index, e);
                    None
                }
            })
            .collect()
    }
}

/// Drops records whose id was already seen (first one wins), then sorts
/// ascending by position. The sort is stable so equal positions keep feed order.
pub fn normalize(stories: Vec<Story>) -> Vec<Story> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Story> = stories
        .into_iter()
        .filter(|story| seen.insert(story.id.clone()))
        .collect();
    unique.sort_by_key(|story| story.position);
    unique
}
