//! Repository for person-owned records (events, annotations, developments).
//!
//! # Invariants
//! - Every list is returned in storage (insertion) order; the event matcher
//!   depends on this for its first-match rule.
//! - Deletes are scoped by owner so one person's id cannot remove another
//!   person's record.

use crate::model::person::PersonId;
use crate::model::record::{
    Annotation, AnnotationDraft, AnnotationId, Development, DevelopmentDraft, DevelopmentId,
    Event, EventDraft, EventId,
};
use crate::model::validation::require_text;
use crate::model::{non_blank, Source};
use crate::repo::{bool_to_int, parse_flag, parse_source, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

/// Repository interface for person-owned records.
pub trait RecordRepository {
    fn insert_event(
        &self,
        person_id: PersonId,
        draft: &EventDraft,
        source: Source,
    ) -> RepoResult<EventId>;
    fn list_events(&self, person_id: PersonId) -> RepoResult<Vec<Event>>;
    fn delete_event(&self, person_id: PersonId, event_id: EventId) -> RepoResult<()>;
    fn clear_events(&self, person_id: PersonId) -> RepoResult<usize>;

    fn insert_annotation(
        &self,
        person_id: PersonId,
        draft: &AnnotationDraft,
        source: Source,
    ) -> RepoResult<AnnotationId>;
    fn list_annotations(&self, person_id: PersonId) -> RepoResult<Vec<Annotation>>;
    fn delete_annotation(&self, person_id: PersonId, annotation_id: AnnotationId)
        -> RepoResult<()>;
    fn clear_annotations(&self, person_id: PersonId) -> RepoResult<usize>;

    fn insert_development(
        &self,
        person_id: PersonId,
        draft: &DevelopmentDraft,
        source: Source,
    ) -> RepoResult<DevelopmentId>;
    fn list_developments(&self, person_id: PersonId) -> RepoResult<Vec<Development>>;
    fn delete_development(
        &self,
        person_id: PersonId,
        development_id: DevelopmentId,
    ) -> RepoResult<()>;
    fn clear_developments(&self, person_id: PersonId) -> RepoResult<usize>;
}

/// SQLite-backed record repository.
pub struct SqliteRecordRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRecordRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn delete_owned(
        &self,
        table: &'static str,
        entity: &'static str,
        person_id: PersonId,
        id: i64,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {table} WHERE id = ?1 AND person_id = ?2;"),
            params![id, person_id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity, id });
        }
        Ok(())
    }

    fn clear_owned(&self, table: &'static str, person_id: PersonId) -> RepoResult<usize> {
        let removed = self.conn.execute(
            &format!("DELETE FROM {table} WHERE person_id = ?1;"),
            [person_id],
        )?;
        Ok(removed)
    }
}

impl RecordRepository for SqliteRecordRepository<'_> {
    fn insert_event(
        &self,
        person_id: PersonId,
        draft: &EventDraft,
        source: Source,
    ) -> RepoResult<EventId> {
        let date = require_text("event.date", &draft.date)?;
        let description = require_text("event.description", &draft.description)?;
        self.conn.execute(
            "INSERT INTO events (person_id, date, location, description, source)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                person_id,
                date,
                non_blank(draft.location.as_deref()),
                description,
                source.as_str(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_events(&self, person_id: PersonId) -> RepoResult<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, person_id, date, location, description, source, created_at
             FROM events
             WHERE person_id = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([person_id])?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(parse_event_row(row)?);
        }
        Ok(events)
    }

    fn delete_event(&self, person_id: PersonId, event_id: EventId) -> RepoResult<()> {
        self.delete_owned("events", "event", person_id, event_id)
    }

    fn clear_events(&self, person_id: PersonId) -> RepoResult<usize> {
        self.clear_owned("events", person_id)
    }

    fn insert_annotation(
        &self,
        person_id: PersonId,
        draft: &AnnotationDraft,
        source: Source,
    ) -> RepoResult<AnnotationId> {
        let time = require_text("annotation.time", &draft.time)?;
        let description = require_text("annotation.description", &draft.description)?;
        self.conn.execute(
            "INSERT INTO annotations (person_id, time, location, description, source, confirmed_by_user)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                person_id,
                time,
                non_blank(draft.location.as_deref()),
                description,
                source.as_str(),
                bool_to_int(true),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_annotations(&self, person_id: PersonId) -> RepoResult<Vec<Annotation>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, person_id, time, location, description, source, confirmed_by_user, created_at
             FROM annotations
             WHERE person_id = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([person_id])?;
        let mut annotations = Vec::new();
        while let Some(row) = rows.next()? {
            annotations.push(parse_annotation_row(row)?);
        }
        Ok(annotations)
    }

    fn delete_annotation(
        &self,
        person_id: PersonId,
        annotation_id: AnnotationId,
    ) -> RepoResult<()> {
        self.delete_owned("annotations", "annotation", person_id, annotation_id)
    }

    fn clear_annotations(&self, person_id: PersonId) -> RepoResult<usize> {
        self.clear_owned("annotations", person_id)
    }

    fn insert_development(
        &self,
        person_id: PersonId,
        draft: &DevelopmentDraft,
        source: Source,
    ) -> RepoResult<DevelopmentId> {
        let content = require_text("development.content", &draft.content)?;
        let kind = require_text("development.type", &draft.kind)?;
        self.conn.execute(
            "INSERT INTO developments (person_id, content, type, source, confirmed_by_user)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![person_id, content, kind, source.as_str(), bool_to_int(true)],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_developments(&self, person_id: PersonId) -> RepoResult<Vec<Development>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, person_id, content, type, source, confirmed_by_user, created_at
             FROM developments
             WHERE person_id = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([person_id])?;
        let mut developments = Vec::new();
        while let Some(row) = rows.next()? {
            developments.push(parse_development_row(row)?);
        }
        Ok(developments)
    }

    fn delete_development(
        &self,
        person_id: PersonId,
        development_id: DevelopmentId,
    ) -> RepoResult<()> {
        self.delete_owned("developments", "development", person_id, development_id)
    }

    fn clear_developments(&self, person_id: PersonId) -> RepoResult<usize> {
        self.clear_owned("developments", person_id)
    }
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<Event> {
    let source: String = row.get("source")?;
    Ok(Event {
        id: row.get("id")?,
        person_id: row.get("person_id")?,
        date: row.get("date")?,
        location: row.get("location")?,
        description: row.get("description")?,
        source: parse_source(&source, "events.source")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_annotation_row(row: &Row<'_>) -> RepoResult<Annotation> {
    let source: String = row.get("source")?;
    Ok(Annotation {
        id: row.get("id")?,
        person_id: row.get("person_id")?,
        time: row.get("time")?,
        location: row.get("location")?,
        description: row.get("description")?,
        source: parse_source(&source, "annotations.source")?,
        confirmed_by_user: parse_flag(
            row.get("confirmed_by_user")?,
            "annotations.confirmed_by_user",
        )?,
        created_at: row.get("created_at")?,
    })
}

fn parse_development_row(row: &Row<'_>) -> RepoResult<Development> {
    let source: String = row.get("source")?;
    Ok(Development {
        id: row.get("id")?,
        person_id: row.get("person_id")?,
        content: row.get("content")?,
        kind: row.get("type")?,
        source: parse_source(&source, "developments.source")?,
        confirmed_by_user: parse_flag(
            row.get("confirmed_by_user")?,
            "developments.confirmed_by_user",
        )?,
        created_at: row.get("created_at")?,
    })
}
