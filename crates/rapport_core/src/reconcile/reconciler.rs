//! Folds an extraction payload into a stored person.
//!
//! # Invariants
//! - Pure computation over its inputs: nothing is written here.
//! - Each stored event is replaced at most once per pass.
//! - Reconciling the same payload twice against the applied result yields
//!   no additions the second time.

use crate::model::extraction::ExtractionPayload;
use crate::model::non_blank;
use crate::model::person::PersonDetail;
use crate::model::record::{AnnotationDraft, DevelopmentDraft, Event, EventDraft, EventId};
use crate::model::relation::ExtractedRelation;
use crate::reconcile::matcher::EventMatcher;
use crate::reconcile::resolver::{Choice, DetailPreference};
use log::info;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;

/// Profile fields to overwrite; `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdates {
    pub job: Option<String>,
    pub birthday: Option<String>,
}

impl ProfileUpdates {
    pub fn is_empty(&self) -> bool {
        self.job.is_none() && self.birthday.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventReplacement {
    pub old_event_id: EventId,
    pub new_event: EventDraft,
}

/// A stored value that the payload would change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conflict {
    pub field: String,
    pub existing: Value,
    pub new: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Candidate event dropped because the stored one was kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedEvent {
    pub existing_event_id: EventId,
    pub candidate: EventDraft,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileResult {
    pub profile: ProfileUpdates,
    pub new_notes: Vec<String>,
    pub new_events: Vec<EventDraft>,
    pub event_replacements: Vec<EventReplacement>,
    pub new_annotations: Vec<AnnotationDraft>,
    pub new_developments: Vec<DevelopmentDraft>,
    pub relations: Vec<ExtractedRelation>,
    pub conflicts: Vec<Conflict>,
    pub rejected_events: Vec<RejectedEvent>,
}

impl ReconcileResult {
    /// True when applying the result would not change storage.
    pub fn has_no_changes(&self) -> bool {
        self.profile.is_empty()
            && self.new_notes.is_empty()
            && self.new_events.is_empty()
            && self.event_replacements.is_empty()
            && self.new_annotations.is_empty()
            && self.new_developments.is_empty()
            && self.relations.is_empty()
    }
}

const IDENTICAL_DESCRIPTION_REASON: &str = "identical description";

pub struct Reconciler<'p> {
    matcher: EventMatcher,
    preference: &'p dyn DetailPreference,
}

impl<'p> Reconciler<'p> {
    pub fn new(matcher: EventMatcher, preference: &'p dyn DetailPreference) -> Self {
        Self {
            matcher,
            preference,
        }
    }

    pub fn reconcile(&self, existing: &PersonDetail, extracted: &ExtractionPayload) -> ReconcileResult {
        let mut result = ReconcileResult {
            relations: extracted.relations.clone(),
            ..ReconcileResult::default()
        };

        self.reconcile_profile(existing, extracted, &mut result);
        self.reconcile_events(&existing.events, &extracted.profile.events, &mut result);

        let mut seen_annotations: HashSet<(&str, &str)> = existing
            .annotations
            .iter()
            .map(|annotation| annotation.dedup_key())
            .collect();
        for annotation in &extracted.annotations {
            if seen_annotations.insert(annotation.dedup_key()) {
                result.new_annotations.push(annotation.clone());
            }
        }

        let mut seen_developments: HashSet<(&str, &str)> = existing
            .developments
            .iter()
            .map(|development| development.dedup_key())
            .collect();
        for development in &extracted.developments {
            if seen_developments.insert(development.dedup_key()) {
                result.new_developments.push(development.clone());
            }
        }

        info!(
            "event=reconcile module=reconcile status=ok person_id={} new_events={} replacements={} rejected={} conflicts={} new_annotations={} new_developments={}",
            existing.person.id,
            result.new_events.len(),
            result.event_replacements.len(),
            result.rejected_events.len(),
            result.conflicts.len(),
            result.new_annotations.len(),
            result.new_developments.len()
        );
        result
    }

    fn reconcile_profile(
        &self,
        existing: &PersonDetail,
        extracted: &ExtractionPayload,
        result: &mut ReconcileResult,
    ) {
        let stored = &existing.person.profile;
        let incoming = &extracted.profile;

        if let Some((job, conflict)) =
            profile_field_change("job", stored.job.as_deref(), incoming.job.as_deref())
        {
            result.profile.job = Some(job);
            result.conflicts.extend(conflict);
        }
        if let Some((birthday, conflict)) = profile_field_change(
            "birthday",
            stored.birthday.as_deref(),
            incoming.birthday.as_deref(),
        ) {
            result.profile.birthday = Some(birthday);
            result.conflicts.extend(conflict);
        }

        let mut seen: HashSet<&str> = stored.notes.iter().map(String::as_str).collect();
        for note in &incoming.notes {
            let Some(note) = non_blank(Some(note)) else {
                continue;
            };
            if seen.insert(note) {
                result.new_notes.push(note.to_string());
            }
        }
    }

    fn reconcile_events(
        &self,
        stored: &[Event],
        candidates: &[EventDraft],
        result: &mut ReconcileResult,
    ) {
        let mut working: Vec<Event> = stored.to_vec();

        for candidate in candidates {
            let Some(matched) = self.matcher.find_duplicate(&working, candidate) else {
                result.new_events.push(candidate.clone());
                continue;
            };
            let matched = matched.clone();

            if matched.description == candidate.description {
                result.rejected_events.push(RejectedEvent {
                    existing_event_id: matched.id,
                    candidate: candidate.clone(),
                    reason: IDENTICAL_DESCRIPTION_REASON.to_string(),
                });
                continue;
            }

            let picked = self
                .preference
                .pick_more_detailed(&matched.description, &candidate.description);
            match picked.choice {
                Choice::Desc2 => {
                    result.conflicts.push(Conflict {
                        field: "event".to_string(),
                        existing: json!(EventDraft::from(&matched)),
                        new: json!(candidate),
                        reason: Some(picked.reason),
                    });
                    result.event_replacements.push(EventReplacement {
                        old_event_id: matched.id,
                        new_event: candidate.clone(),
                    });
                    working.retain(|event| event.id != matched.id);
                }
                Choice::Desc1 => result.rejected_events.push(RejectedEvent {
                    existing_event_id: matched.id,
                    candidate: candidate.clone(),
                    reason: picked.reason,
                }),
            }
        }
    }
}

/// New value for a profile field plus the conflict to report, if any.
///
/// Values compare byte-for-byte; only a missing or empty incoming value is
/// ignored.
fn profile_field_change(
    field: &str,
    stored: Option<&str>,
    incoming: Option<&str>,
) -> Option<(String, Option<Conflict>)> {
    let incoming = incoming.filter(|value| !value.is_empty())?;
    match stored {
        Some(current) if current == incoming => None,
        Some(current) => Some((
            incoming.to_string(),
            Some(Conflict {
                field: field.to_string(),
                existing: json!(current),
                new: json!(incoming),
                reason: None,
            }),
        )),
        None => Some((incoming.to_string(), None)),
    }
}

#[cfg(test)]
mod tests {
    use super::profile_field_change;

    #[test]
    fn missing_empty_or_equal_values_change_nothing() {
        assert!(profile_field_change("job", Some("teacher"), None).is_none());
        assert!(profile_field_change("job", Some("teacher"), Some("")).is_none());
        assert!(profile_field_change("job", Some("teacher"), Some("teacher")).is_none());
    }

    #[test]
    fn padded_value_is_a_different_value() {
        let (value, conflict) =
            profile_field_change("job", Some("teacher"), Some(" teacher ")).unwrap();
        assert_eq!(value, " teacher ");
        let conflict = conflict.unwrap();
        assert_eq!(conflict.existing, "teacher");
        assert_eq!(conflict.new, " teacher ");
    }

    #[test]
    fn filling_an_empty_field_is_not_a_conflict() {
        let (value, conflict) = profile_field_change("birthday", None, Some("05-20")).unwrap();
        assert_eq!(value, "05-20");
        assert!(conflict.is_none());
    }

    #[test]
    fn changing_a_stored_field_reports_a_conflict() {
        let (value, conflict) =
            profile_field_change("job", Some("teacher"), Some("engineer")).unwrap();
        assert_eq!(value, "engineer");
        let conflict = conflict.unwrap();
        assert_eq!(conflict.field, "job");
        assert_eq!(conflict.existing, "teacher");
        assert_eq!(conflict.new, "engineer");
    }
}
