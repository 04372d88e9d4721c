//! Candidate records produced by free-text extraction.
//!
//! A payload is never persisted as-is: a human confirms it, and the
//! reconciler folds it into an existing person when one is targeted.

use crate::model::null_as_default;
use crate::model::record::{AnnotationDraft, DevelopmentDraft, EventDraft};
use crate::model::relation::ExtractedRelation;
use crate::model::validation::{require_text, ValidationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedProfile {
    pub name: String,
    #[serde(default)]
    pub job: Option<String>,
    #[serde(default)]
    pub birthday: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub events: Vec<EventDraft>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionPayload {
    pub profile: ExtractedProfile,
    #[serde(default, deserialize_with = "null_as_default")]
    pub annotations: Vec<AnnotationDraft>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub developments: Vec<DevelopmentDraft>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub relations: Vec<ExtractedRelation>,
}

impl ExtractionPayload {
    /// Rejects payloads that cannot be reconciled or persisted.
    ///
    /// Returns the trimmed person name on success.
    pub fn validate(&self) -> Result<String, ValidationError> {
        let name = require_text("profile.name", &self.profile.name)?;
        for event in &self.profile.events {
            require_text("event.date", &event.date)?;
            require_text("event.description", &event.description)?;
        }
        for annotation in &self.annotations {
            require_text("annotation.time", &annotation.time)?;
            require_text("annotation.description", &annotation.description)?;
        }
        for development in &self.developments {
            require_text("development.content", &development.content)?;
        }
        for relation in &self.relations {
            require_text("relation.name", &relation.name)?;
            require_text("relation.relation_type", &relation.relation_type)?;
        }
        Ok(name)
    }
}
