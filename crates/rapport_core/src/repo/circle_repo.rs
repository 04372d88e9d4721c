//! Circle and membership repository.
//!
//! # Invariants
//! - Circle names are unique; memberships are unique per person/circle.
//! - Deleting a circle cascades to its memberships.

use crate::model::circle::{Circle, CircleDraft, CircleId, CircleMember, Membership};
use crate::model::person::PersonId;
use crate::model::validation::{normalize_color, require_text};
use crate::repo::{bool_to_int, map_unique_violation, parse_flag, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Repository interface for circles.
pub trait CircleRepository {
    fn create_circle(&self, draft: &CircleDraft) -> RepoResult<CircleId>;
    fn get_circle(&self, id: CircleId) -> RepoResult<Option<Circle>>;
    fn list_circles(&self) -> RepoResult<Vec<Circle>>;
    fn delete_circle(&self, id: CircleId) -> RepoResult<()>;
    fn add_member(&self, circle_id: CircleId, person_id: PersonId) -> RepoResult<Membership>;
    fn remove_member(&self, circle_id: CircleId, person_id: PersonId) -> RepoResult<()>;
    fn list_members(&self, circle_id: CircleId) -> RepoResult<Vec<CircleMember>>;
    fn list_memberships(&self) -> RepoResult<Vec<Membership>>;
    fn circles_for_person(&self, person_id: PersonId) -> RepoResult<Vec<Circle>>;
}

/// SQLite-backed circle repository.
pub struct SqliteCircleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCircleRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CircleRepository for SqliteCircleRepository<'_> {
    fn create_circle(&self, draft: &CircleDraft) -> RepoResult<CircleId> {
        let name = require_text("circle.name", &draft.name)?;
        let color = normalize_color(&draft.color)?;
        self.conn
            .execute(
                "INSERT INTO circles (name, color) VALUES (?1, ?2);",
                params![name.as_str(), color],
            )
            .map_err(|err| map_unique_violation(err, "circle", &name))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_circle(&self, id: CircleId) -> RepoResult<Option<Circle>> {
        let circle = self
            .conn
            .query_row(
                "SELECT id, name, color, created_at FROM circles WHERE id = ?1;",
                [id],
                parse_circle_row,
            )
            .optional()?;
        Ok(circle)
    }

    fn list_circles(&self) -> RepoResult<Vec<Circle>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, color, created_at FROM circles ORDER BY id ASC;")?;
        let circles = stmt
            .query_map([], parse_circle_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(circles)
    }

    fn delete_circle(&self, id: CircleId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM circles WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "circle",
                id,
            });
        }
        Ok(())
    }

    fn add_member(&self, circle_id: CircleId, person_id: PersonId) -> RepoResult<Membership> {
        self.conn
            .execute(
                "INSERT INTO person_circles (person_id, circle_id, assigned_by_user)
                 VALUES (?1, ?2, ?3);",
                params![person_id, circle_id, bool_to_int(true)],
            )
            .map_err(|err| {
                map_unique_violation(err, "membership", &format!("{person_id}@{circle_id}"))
            })?;
        Ok(Membership {
            id: self.conn.last_insert_rowid(),
            person_id,
            circle_id,
            assigned_by_user: true,
        })
    }

    fn remove_member(&self, circle_id: CircleId, person_id: PersonId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM person_circles WHERE circle_id = ?1 AND person_id = ?2;",
            params![circle_id, person_id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "membership",
                id: person_id,
            });
        }
        Ok(())
    }

    fn list_members(&self, circle_id: CircleId) -> RepoResult<Vec<CircleMember>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id, p.name, p.avatar
             FROM person_circles pc
             INNER JOIN persons p ON p.id = pc.person_id
             WHERE pc.circle_id = ?1
             ORDER BY pc.id ASC;",
        )?;
        let members = stmt
            .query_map([circle_id], |row| {
                Ok(CircleMember {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    avatar: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(members)
    }

    fn list_memberships(&self) -> RepoResult<Vec<Membership>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, person_id, circle_id, assigned_by_user
             FROM person_circles
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut memberships = Vec::new();
        while let Some(row) = rows.next()? {
            memberships.push(Membership {
                id: row.get("id")?,
                person_id: row.get("person_id")?,
                circle_id: row.get("circle_id")?,
                assigned_by_user: parse_flag(
                    row.get("assigned_by_user")?,
                    "person_circles.assigned_by_user",
                )?,
            });
        }
        Ok(memberships)
    }

    fn circles_for_person(&self, person_id: PersonId) -> RepoResult<Vec<Circle>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.name, c.color, c.created_at
             FROM person_circles pc
             INNER JOIN circles c ON c.id = pc.circle_id
             WHERE pc.person_id = ?1
             ORDER BY c.id ASC;",
        )?;
        let circles = stmt
            .query_map([person_id], parse_circle_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(circles)
    }
}

fn parse_circle_row(row: &Row<'_>) -> rusqlite::Result<Circle> {
    Ok(Circle {
        id: row.get("id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        created_at: row.get("created_at")?,
    })
}
