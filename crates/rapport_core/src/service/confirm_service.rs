//! Confirm and compare flows for extracted payloads.
//!
//! # Responsibility
//! - Preview how a payload would merge into a stored person (`compare`).
//! - Persist a confirmed payload as a new person or merged into an existing
//!   one (`confirm`).
//!
//! # Invariants
//! - Reconciliation runs before the write transaction opens; the result is
//!   applied in one IMMEDIATE transaction or not at all.
//! - Relations never produce a second fact for an already related pair.

use crate::model::extraction::{ExtractedProfile, ExtractionPayload};
use crate::model::{non_blank, null_as_default, Source};
use crate::model::person::{NewPerson, PersonId, Profile};
use crate::model::record::{AnnotationDraft, DevelopmentDraft};
use crate::model::relation::ExtractedRelation;
use crate::model::validation::require_text;
use crate::reconcile::{DetailPreference, EventMatcher, ReconcileResult, Reconciler};
use crate::repo::person_repo::{PersonRepository, SqlitePersonRepository};
use crate::repo::record_repo::{RecordRepository, SqliteRecordRepository};
use crate::repo::relation_repo::{PairOutcome, RelationRepository, SqliteRelationRepository};
use crate::service::person_service::load_person_detail;
use crate::service::{ServiceError, ServiceResult};
use log::info;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Resolution value that keeps the stored profile field.
pub const KEEP_EXISTING: &str = "keep_existing";

/// Human-confirmed payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub original_text: String,
    pub is_new_person: bool,
    #[serde(default)]
    pub person_id: Option<PersonId>,
    pub profile: ExtractedProfile,
    #[serde(default, deserialize_with = "null_as_default")]
    pub annotations: Vec<AnnotationDraft>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub developments: Vec<DevelopmentDraft>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub relations: Vec<ExtractedRelation>,
    /// Field name to resolution, e.g. `{"job": "keep_existing"}`.
    #[serde(default)]
    pub conflict_resolutions: Option<BTreeMap<String, Value>>,
}

impl ConfirmRequest {
    pub fn payload(&self) -> ExtractionPayload {
        ExtractionPayload {
            profile: self.profile.clone(),
            annotations: self.annotations.clone(),
            developments: self.developments.clone(),
            relations: self.relations.clone(),
        }
    }

    fn keeps_existing(&self, field: &str) -> bool {
        self.conflict_resolutions
            .as_ref()
            .and_then(|resolutions| resolutions.get(field))
            .and_then(Value::as_str)
            == Some(KEEP_EXISTING)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfirmResponse {
    pub success: bool,
    pub person_id: PersonId,
    pub message: String,
    /// Applied merge; absent when a new person was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ReconcileResult>,
}

pub struct ConfirmService<'a> {
    conn: &'a Connection,
    reconciler: Reconciler<'a>,
}

impl<'a> ConfirmService<'a> {
    /// Uses the built-in vocabulary and default match threshold.
    pub fn new(conn: &'a Connection, preference: &'a dyn DetailPreference) -> Self {
        Self::with_reconciler(conn, Reconciler::new(EventMatcher::default(), preference))
    }

    pub fn with_reconciler(conn: &'a Connection, reconciler: Reconciler<'a>) -> Self {
        Self { conn, reconciler }
    }

    /// Read-only preview of merging `extracted` into person `person_id`.
    pub fn compare(
        &self,
        person_id: PersonId,
        extracted: &ExtractionPayload,
    ) -> ServiceResult<ReconcileResult> {
        extracted.validate()?;
        let detail = load_person_detail(self.conn, person_id)?;
        Ok(self.reconciler.reconcile(&detail, extracted))
    }

    pub fn confirm(&self, request: &ConfirmRequest) -> ServiceResult<ConfirmResponse> {
        let payload = request.payload();
        let name = payload.validate()?;
        if request.is_new_person {
            self.confirm_new_person(&name, &payload)
        } else {
            let person_id = request.person_id.ok_or_else(|| {
                ServiceError::InvalidInput(
                    "person_id is required when updating an existing person".to_string(),
                )
            })?;
            self.confirm_existing_person(person_id, request, &payload)
        }
    }

    fn confirm_new_person(
        &self,
        name: &str,
        payload: &ExtractionPayload,
    ) -> ServiceResult<ConfirmResponse> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let (person_id, relations_created) = {
            let persons = SqlitePersonRepository::new(&tx);
            let records = SqliteRecordRepository::new(&tx);
            if persons.find_person_by_name(name)?.is_some() {
                return Err(ServiceError::Conflict(format!(
                    "person already exists: {name}"
                )));
            }

            let mut profile = Profile::with_fields(
                non_blank(payload.profile.job.as_deref()).map(str::to_string),
                non_blank(payload.profile.birthday.as_deref()).map(str::to_string),
            );
            profile.notes = unique_notes(&payload.profile.notes);
            let person_id = persons.create_person(&NewPerson {
                name: name.to_string(),
                avatar: None,
                profile,
            })?;

            for event in &payload.profile.events {
                records.insert_event(person_id, event, Source::User)?;
            }
            let mut seen_annotations = HashSet::new();
            for annotation in &payload.annotations {
                if seen_annotations.insert(annotation.dedup_key()) {
                    records.insert_annotation(person_id, annotation, Source::User)?;
                }
            }
            let mut seen_developments = HashSet::new();
            for development in &payload.developments {
                if seen_developments.insert(development.dedup_key()) {
                    records.insert_development(person_id, development, Source::User)?;
                }
            }
            let created = apply_relations(&tx, person_id, name, &payload.relations)?;
            (person_id, created)
        };
        tx.commit()?;

        info!(
            "event=confirm module=service status=ok mode=create person_id={} events={} relations_created={}",
            person_id,
            payload.profile.events.len(),
            relations_created
        );
        Ok(ConfirmResponse {
            success: true,
            person_id,
            message: "person created".to_string(),
            result: None,
        })
    }

    fn confirm_existing_person(
        &self,
        person_id: PersonId,
        request: &ConfirmRequest,
        payload: &ExtractionPayload,
    ) -> ServiceResult<ConfirmResponse> {
        let detail = load_person_detail(self.conn, person_id)?;
        let mut result = self.reconciler.reconcile(&detail, payload);
        if request.keeps_existing("job") {
            result.profile.job = None;
        }
        if request.keeps_existing("birthday") {
            result.profile.birthday = None;
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let relations_created = {
            let persons = SqlitePersonRepository::new(&tx);
            let records = SqliteRecordRepository::new(&tx);
            let mut person = persons
                .get_person(person_id)?
                .ok_or(ServiceError::NotFound {
                    entity: "person",
                    id: person_id,
                })?;

            if !result.profile.is_empty() || !result.new_notes.is_empty() {
                if let Some(job) = result.profile.job.as_ref() {
                    person.profile.job = Some(job.clone());
                }
                if let Some(birthday) = result.profile.birthday.as_ref() {
                    person.profile.birthday = Some(birthday.clone());
                }
                for note in &result.new_notes {
                    if !person.profile.notes.contains(note) {
                        person.profile.notes.push(note.clone());
                    }
                }
                persons.update_person(&person)?;
            }

            for replacement in &result.event_replacements {
                records.delete_event(person_id, replacement.old_event_id)?;
                records.insert_event(person_id, &replacement.new_event, Source::User)?;
            }
            for event in &result.new_events {
                records.insert_event(person_id, event, Source::User)?;
            }
            for annotation in &result.new_annotations {
                records.insert_annotation(person_id, annotation, Source::User)?;
            }
            for development in &result.new_developments {
                records.insert_development(person_id, development, Source::User)?;
            }
            apply_relations(&tx, person_id, &person.name, &result.relations)?
        };
        tx.commit()?;

        info!(
            "event=confirm module=service status=ok mode=merge person_id={} new_events={} replacements={} relations_created={}",
            person_id,
            result.new_events.len(),
            result.event_replacements.len(),
            relations_created
        );
        Ok(ConfirmResponse {
            success: true,
            person_id,
            message: "person updated".to_string(),
            result: Some(result),
        })
    }
}

/// Links `person_id` to each named person, creating stubs for unknown names.
///
/// Returns how many new pairs were written.
fn apply_relations(
    conn: &Connection,
    person_id: PersonId,
    person_name: &str,
    relations: &[ExtractedRelation],
) -> ServiceResult<usize> {
    let persons = SqlitePersonRepository::new(conn);
    let pairs = SqliteRelationRepository::new(conn);
    let mut created = 0;

    for relation in relations {
        let other_name = require_text("relation.name", &relation.name)?;
        if other_name == person_name {
            continue;
        }
        let other_id = match persons.find_person_by_name(&other_name)? {
            Some(other) => other.id,
            None => persons.create_person(&NewPerson::stub(other_name))?,
        };
        if other_id == person_id {
            continue;
        }
        if pairs.create_pair(person_id, other_id, &relation.relation_type)?
            == PairOutcome::Created
        {
            created += 1;
        }
    }
    Ok(created)
}

fn unique_notes(notes: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for note in notes.iter().filter_map(|note| non_blank(Some(note))) {
        if !unique.iter().any(|existing| existing == note) {
            unique.push(note.to_string());
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::{unique_notes, ConfirmRequest};
    use serde_json::json;

    #[test]
    fn unique_notes_trims_and_keeps_first_seen_order() {
        let notes = vec![
            " 喜欢咖啡".to_string(),
            "".to_string(),
            "养猫".to_string(),
            "喜欢咖啡".to_string(),
        ];
        assert_eq!(unique_notes(&notes), vec!["喜欢咖啡", "养猫"]);
    }

    #[test]
    fn keep_existing_resolution_is_read_per_field() {
        let request: ConfirmRequest = serde_json::from_value(json!({
            "is_new_person": false,
            "person_id": 1,
            "profile": {"name": "张三"},
            "conflict_resolutions": {"job": "keep_existing", "birthday": "use_new"}
        }))
        .unwrap();
        assert!(request.keeps_existing("job"));
        assert!(!request.keeps_existing("birthday"));
        assert!(request.annotations.is_empty());
    }
}
