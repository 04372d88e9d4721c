//! Person domain model.
//!
//! # Responsibility
//! - Define the person record and its free-form profile map.
//! - Define the explicit optional-field update shape.
//!
//! # Invariants
//! - `name` is trimmed, non-blank, and unique across all persons.
//! - Unknown profile keys survive a load/store round trip unchanged.

use crate::model::null_as_default;
use crate::model::record::{
    Annotation, AnnotationDraft, Development, DevelopmentDraft, Event, EventDraft,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub type PersonId = i64;

/// Free-form profile stored as one JSON document per person.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub job: Option<String>,
    /// `MM-DD` or `YYYY-MM-DD`; not validated.
    #[serde(default)]
    pub birthday: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: Vec<String>,
    /// Keys written by other clients; preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Profile {
    pub fn with_fields(job: Option<String>, birthday: Option<String>) -> Self {
        Self {
            job,
            birthday,
            ..Self::default()
        }
    }
}

/// Persisted person row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub avatar: Option<String>,
    pub profile: Profile,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds; `None` until the first update.
    pub updated_at: Option<i64>,
}

/// Insert shape for a person.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPerson {
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub profile: Profile,
}

impl NewPerson {
    /// Placeholder person created when a relation names someone unknown.
    pub fn stub(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Person with every owned collection, in storage order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonDetail {
    #[serde(flatten)]
    pub person: Person,
    pub events: Vec<Event>,
    pub annotations: Vec<Annotation>,
    pub developments: Vec<Development>,
}

/// Partial update; every `None` field is left unchanged.
///
/// Present collections replace the stored collection wholesale.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PersonUpdate {
    #[serde(default)]
    pub name: Option<String>,
    /// Blank string clears the avatar.
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub profile: Option<Profile>,
    #[serde(default)]
    pub events: Option<Vec<EventDraft>>,
    #[serde(default)]
    pub annotations: Option<Vec<AnnotationDraft>>,
    #[serde(default)]
    pub developments: Option<Vec<DevelopmentDraft>>,
}

impl PersonUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.avatar.is_none()
            && self.profile.is_none()
            && self.events.is_none()
            && self.annotations.is_none()
            && self.developments.is_none()
    }
}
