//! Person-owned records: events, annotations, developments.
//!
//! Events describe what already happened, annotations describe plans, and
//! developments tag a person's professional direction.

use crate::model::person::PersonId;
use crate::model::Source;
use serde::{Deserialize, Serialize};

pub type EventId = i64;
pub type AnnotationId = i64;
pub type DevelopmentId = i64;

pub const DEFAULT_DEVELOPMENT_TYPE: &str = "resource";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub person_id: PersonId,
    /// Free granularity (`YYYY-MM-DD`, `YYYY-MM`, ...); compared verbatim.
    pub date: String,
    pub location: Option<String>,
    pub description: String,
    pub source: Source,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    pub date: String,
    #[serde(default)]
    pub location: Option<String>,
    pub description: String,
}

impl EventDraft {
    pub fn new(date: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            location: None,
            description: description.into(),
        }
    }
}

impl From<&Event> for EventDraft {
    fn from(event: &Event) -> Self {
        Self {
            date: event.date.clone(),
            location: event.location.clone(),
            description: event.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub person_id: PersonId,
    /// Date or month granularity.
    pub time: String,
    pub location: Option<String>,
    pub description: String,
    pub source: Source,
    pub confirmed_by_user: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationDraft {
    pub time: String,
    #[serde(default)]
    pub location: Option<String>,
    pub description: String,
}

impl AnnotationDraft {
    pub fn new(time: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            location: None,
            description: description.into(),
        }
    }

    /// Exact-match identity used for deduplication.
    pub fn dedup_key(&self) -> (&str, &str) {
        (self.time.as_str(), self.description.as_str())
    }
}

impl Annotation {
    pub fn dedup_key(&self) -> (&str, &str) {
        (self.time.as_str(), self.description.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Development {
    pub id: DevelopmentId,
    pub person_id: PersonId,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub source: Source,
    pub confirmed_by_user: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevelopmentDraft {
    pub content: String,
    #[serde(rename = "type", default = "default_development_type")]
    pub kind: String,
}

impl DevelopmentDraft {
    pub fn new(content: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            kind: kind.into(),
        }
    }

    pub fn dedup_key(&self) -> (&str, &str) {
        (self.content.as_str(), self.kind.as_str())
    }
}

impl Development {
    pub fn dedup_key(&self) -> (&str, &str) {
        (self.content.as_str(), self.kind.as_str())
    }
}

fn default_development_type() -> String {
    DEFAULT_DEVELOPMENT_TYPE.to_string()
}
