//! Relation repository: symmetric pairs over directed rows.
//!
//! # Invariants
//! - `create_pair` writes both directions or neither (caller owns the
//!   transaction when combining with other writes).
//! - An unordered pair never gets a second relation fact.

use crate::model::person::PersonId;
use crate::model::relation::Relation;
use crate::model::validation::{require_text, ValidationError};
use crate::repo::{bool_to_int, parse_flag, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const RELATION_SELECT_SQL: &str = "SELECT
    id,
    from_person_id,
    to_person_id,
    relation_type,
    confirmed_by_user,
    created_at
FROM relations";

/// Outcome of a pair insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairOutcome {
    Created,
    /// The unordered pair already had a relation; nothing was written.
    AlreadyRelated,
}

/// Repository interface for relations.
pub trait RelationRepository {
    /// Returns any stored row connecting the two persons, in either direction.
    fn relation_between(&self, a: PersonId, b: PersonId) -> RepoResult<Option<Relation>>;
    /// Inserts A->B and B->A unless the unordered pair is already related.
    fn create_pair(
        &self,
        a: PersonId,
        b: PersonId,
        relation_type: &str,
    ) -> RepoResult<PairOutcome>;
    fn list_relations(&self) -> RepoResult<Vec<Relation>>;
    /// Outgoing rows of one person.
    fn list_for_person(&self, person_id: PersonId) -> RepoResult<Vec<Relation>>;
    /// Removes both directions; returns removed row count.
    fn delete_pair(&self, a: PersonId, b: PersonId) -> RepoResult<usize>;
}

/// SQLite-backed relation repository.
pub struct SqliteRelationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRelationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RelationRepository for SqliteRelationRepository<'_> {
    fn relation_between(&self, a: PersonId, b: PersonId) -> RepoResult<Option<Relation>> {
        self.conn
            .query_row(
                &format!(
                    "{RELATION_SELECT_SQL}
                     WHERE (from_person_id = ?1 AND to_person_id = ?2)
                        OR (from_person_id = ?2 AND to_person_id = ?1)
                     ORDER BY id ASC
                     LIMIT 1;"
                ),
                params![a, b],
                |row| Ok(parse_relation_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn create_pair(
        &self,
        a: PersonId,
        b: PersonId,
        relation_type: &str,
    ) -> RepoResult<PairOutcome> {
        if a == b {
            return Err(ValidationError::SelfRelation.into());
        }
        let relation_type = require_text("relation_type", relation_type)?;
        if self.relation_between(a, b)?.is_some() {
            return Ok(PairOutcome::AlreadyRelated);
        }

        let mut stmt = self.conn.prepare(
            "INSERT INTO relations (from_person_id, to_person_id, relation_type, confirmed_by_user)
             VALUES (?1, ?2, ?3, ?4);",
        )?;
        stmt.execute(params![a, b, relation_type.as_str(), bool_to_int(true)])?;
        stmt.execute(params![b, a, relation_type.as_str(), bool_to_int(true)])?;
        Ok(PairOutcome::Created)
    }

    fn list_relations(&self) -> RepoResult<Vec<Relation>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{RELATION_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut relations = Vec::new();
        while let Some(row) = rows.next()? {
            relations.push(parse_relation_row(row)?);
        }
        Ok(relations)
    }

    fn list_for_person(&self, person_id: PersonId) -> RepoResult<Vec<Relation>> {
        let mut stmt = self.conn.prepare(&format!(
            "{RELATION_SELECT_SQL} WHERE from_person_id = ?1 ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query([person_id])?;
        let mut relations = Vec::new();
        while let Some(row) = rows.next()? {
            relations.push(parse_relation_row(row)?);
        }
        Ok(relations)
    }

    fn delete_pair(&self, a: PersonId, b: PersonId) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM relations
             WHERE (from_person_id = ?1 AND to_person_id = ?2)
                OR (from_person_id = ?2 AND to_person_id = ?1);",
            params![a, b],
        )?;
        Ok(removed)
    }
}

fn parse_relation_row(row: &Row<'_>) -> RepoResult<Relation> {
    Ok(Relation {
        id: row.get("id")?,
        from_person_id: row.get("from_person_id")?,
        to_person_id: row.get("to_person_id")?,
        relation_type: row.get("relation_type")?,
        confirmed_by_user: parse_flag(
            row.get("confirmed_by_user")?,
            "relations.confirmed_by_user",
        )?,
        created_at: row.get("created_at")?,
    })
}
