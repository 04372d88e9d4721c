//! Person use-case service.
//!
//! # Responsibility
//! - Read persons together with their owned records.
//! - Apply partial updates, deletes, and relation edits.
//!
//! # Invariants
//! - Multi-row writes run inside one IMMEDIATE transaction.
//! - Collections present in an update replace the stored ones wholesale.

use crate::model::circle::Circle;
use crate::model::non_blank;
use crate::model::person::{Person, PersonDetail, PersonId, PersonUpdate};
use crate::model::record::{AnnotationId, DevelopmentId, EventId};
use crate::model::relation::{Relation, RelationDraft};
use crate::model::validation::{require_text, ValidationError};
use crate::model::Source;
use crate::repo::circle_repo::{CircleRepository, SqliteCircleRepository};
use crate::repo::person_repo::{PersonRepository, SqlitePersonRepository};
use crate::repo::record_repo::{RecordRepository, SqliteRecordRepository};
use crate::repo::relation_repo::{PairOutcome, RelationRepository, SqliteRelationRepository};
use crate::service::{ServiceError, ServiceResult};
use log::info;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;

/// Answer to "is this name already taken?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameCheck {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person: Option<NameMatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameMatch {
    pub id: PersonId,
    pub name: String,
    pub job: Option<String>,
    pub birthday: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelationOutcome {
    /// False when the pair was already related and nothing was written.
    pub created: bool,
}

pub struct PersonService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> PersonService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn list_person_details(&self) -> ServiceResult<Vec<PersonDetail>> {
        let persons = SqlitePersonRepository::new(self.conn).list_persons()?;
        persons
            .into_iter()
            .map(|person| attach_records(self.conn, person))
            .collect()
    }

    pub fn get_person_detail(&self, id: PersonId) -> ServiceResult<PersonDetail> {
        load_person_detail(self.conn, id)
    }

    pub fn check_name(&self, name: &str) -> ServiceResult<NameCheck> {
        let name = require_text("name", name)?;
        let found = SqlitePersonRepository::new(self.conn).find_person_by_name(&name)?;
        Ok(NameCheck {
            exists: found.is_some(),
            person: found.map(|person| NameMatch {
                id: person.id,
                name: person.name,
                job: person.profile.job,
                birthday: person.profile.birthday,
            }),
        })
    }

    pub fn update_person(&self, id: PersonId, update: &PersonUpdate) -> ServiceResult<PersonDetail> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        {
            let persons = SqlitePersonRepository::new(&tx);
            let records = SqliteRecordRepository::new(&tx);
            let mut person = persons
                .get_person(id)?
                .ok_or(ServiceError::NotFound {
                    entity: "person",
                    id,
                })?;

            if let Some(name) = update.name.as_deref() {
                let name = require_text("name", name)?;
                if name != person.name {
                    if persons.find_person_by_name(&name)?.is_some() {
                        return Err(ServiceError::Conflict(format!(
                            "person already exists: {name}"
                        )));
                    }
                    person.name = name;
                }
            }
            if let Some(avatar) = update.avatar.as_deref() {
                person.avatar = non_blank(Some(avatar)).map(str::to_string);
            }
            if let Some(profile) = update.profile.as_ref() {
                person.profile = profile.clone();
            }
            persons.update_person(&person)?;

            if let Some(events) = update.events.as_ref() {
                records.clear_events(id)?;
                for event in events {
                    records.insert_event(id, event, Source::User)?;
                }
            }
            if let Some(annotations) = update.annotations.as_ref() {
                records.clear_annotations(id)?;
                for annotation in annotations {
                    records.insert_annotation(id, annotation, Source::User)?;
                }
            }
            if let Some(developments) = update.developments.as_ref() {
                records.clear_developments(id)?;
                for development in developments {
                    records.insert_development(id, development, Source::User)?;
                }
            }
        }
        tx.commit()?;

        info!(
            "event=person_update module=service status=ok person_id={} replaced_events={} replaced_annotations={} replaced_developments={}",
            id,
            update.events.is_some(),
            update.annotations.is_some(),
            update.developments.is_some()
        );
        load_person_detail(self.conn, id)
    }

    pub fn delete_person(&self, id: PersonId) -> ServiceResult<()> {
        SqlitePersonRepository::new(self.conn).delete_person(id)?;
        info!("event=person_delete module=service status=ok person_id={id}");
        Ok(())
    }

    pub fn delete_event(&self, person_id: PersonId, event_id: EventId) -> ServiceResult<()> {
        self.require_person(person_id)?;
        SqliteRecordRepository::new(self.conn).delete_event(person_id, event_id)?;
        Ok(())
    }

    pub fn delete_annotation(
        &self,
        person_id: PersonId,
        annotation_id: AnnotationId,
    ) -> ServiceResult<()> {
        self.require_person(person_id)?;
        SqliteRecordRepository::new(self.conn).delete_annotation(person_id, annotation_id)?;
        Ok(())
    }

    pub fn delete_development(
        &self,
        person_id: PersonId,
        development_id: DevelopmentId,
    ) -> ServiceResult<()> {
        self.require_person(person_id)?;
        SqliteRecordRepository::new(self.conn).delete_development(person_id, development_id)?;
        Ok(())
    }

    /// Outgoing relation rows of one person.
    pub fn list_relations(&self, person_id: PersonId) -> ServiceResult<Vec<Relation>> {
        self.require_person(person_id)?;
        Ok(SqliteRelationRepository::new(self.conn).list_for_person(person_id)?)
    }

    /// Creates the symmetric pair unless the two are already related.
    pub fn create_relation(
        &self,
        person_id: PersonId,
        draft: &RelationDraft,
    ) -> ServiceResult<RelationOutcome> {
        if person_id == draft.to_person_id {
            return Err(ValidationError::SelfRelation.into());
        }
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let outcome = {
            let persons = SqlitePersonRepository::new(&tx);
            for id in [person_id, draft.to_person_id] {
                if persons.get_person(id)?.is_none() {
                    return Err(ServiceError::NotFound {
                        entity: "person",
                        id,
                    });
                }
            }
            SqliteRelationRepository::new(&tx).create_pair(
                person_id,
                draft.to_person_id,
                &draft.relation_type,
            )?
        };
        tx.commit()?;

        let created = outcome == PairOutcome::Created;
        info!(
            "event=relation_create module=service status=ok person_id={} other_id={} created={}",
            person_id, draft.to_person_id, created
        );
        Ok(RelationOutcome { created })
    }

    /// Removes both directions of the pair.
    pub fn delete_relation(&self, person_id: PersonId, other_id: PersonId) -> ServiceResult<()> {
        self.require_person(person_id)?;
        let removed = SqliteRelationRepository::new(self.conn).delete_pair(person_id, other_id)?;
        if removed == 0 {
            return Err(ServiceError::NotFound {
                entity: "relation",
                id: other_id,
            });
        }
        Ok(())
    }

    pub fn circles_for_person(&self, person_id: PersonId) -> ServiceResult<Vec<Circle>> {
        self.require_person(person_id)?;
        Ok(SqliteCircleRepository::new(self.conn).circles_for_person(person_id)?)
    }

    fn require_person(&self, id: PersonId) -> ServiceResult<Person> {
        SqlitePersonRepository::new(self.conn)
            .get_person(id)?
            .ok_or(ServiceError::NotFound {
                entity: "person",
                id,
            })
    }
}

/// Loads one person with every owned collection.
pub(crate) fn load_person_detail(conn: &Connection, id: PersonId) -> ServiceResult<PersonDetail> {
    let person = SqlitePersonRepository::new(conn)
        .get_person(id)?
        .ok_or(ServiceError::NotFound {
            entity: "person",
            id,
        })?;
    attach_records(conn, person)
}

fn attach_records(conn: &Connection, person: Person) -> ServiceResult<PersonDetail> {
    let records = SqliteRecordRepository::new(conn);
    Ok(PersonDetail {
        events: records.list_events(person.id)?,
        annotations: records.list_annotations(person.id)?,
        developments: records.list_developments(person.id)?,
        person,
    })
}
