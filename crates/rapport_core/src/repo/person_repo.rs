//! Person repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over `persons`, including the JSON profile column.
//! - Enforce name uniqueness at write time.
//!
//! # Invariants
//! - Names are trimmed and non-blank before any write.
//! - Deleting a person cascades to owned rows through foreign keys.
//! - Read paths reject unparseable profile JSON instead of masking it.

use crate::model::person::{NewPerson, Person, PersonId, Profile};
use crate::model::non_blank;
use crate::model::validation::require_text;
use crate::repo::{map_unique_violation, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const PERSON_SELECT_SQL: &str = "SELECT
    id,
    name,
    avatar,
    profile_json,
    created_at,
    updated_at
FROM persons";

/// Repository interface for person rows.
pub trait PersonRepository {
    fn create_person(&self, person: &NewPerson) -> RepoResult<PersonId>;
    fn get_person(&self, id: PersonId) -> RepoResult<Option<Person>>;
    fn find_person_by_name(&self, name: &str) -> RepoResult<Option<Person>>;
    fn list_persons(&self) -> RepoResult<Vec<Person>>;
    /// Writes name, avatar and profile; bumps `updated_at`.
    fn update_person(&self, person: &Person) -> RepoResult<()>;
    fn delete_person(&self, id: PersonId) -> RepoResult<()>;
}

/// SQLite-backed person repository.
pub struct SqlitePersonRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePersonRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl PersonRepository for SqlitePersonRepository<'_> {
    fn create_person(&self, person: &NewPerson) -> RepoResult<PersonId> {
        let name = require_text("name", &person.name)?;
        let profile_json = encode_profile(&person.profile)?;

        self.conn
            .execute(
                "INSERT INTO persons (name, avatar, profile_json) VALUES (?1, ?2, ?3);",
                params![name.as_str(), non_blank(person.avatar.as_deref()), profile_json],
            )
            .map_err(|err| map_unique_violation(err, "person", &name))?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_person(&self, id: PersonId) -> RepoResult<Option<Person>> {
        self.conn
            .query_row(
                &format!("{PERSON_SELECT_SQL} WHERE id = ?1;"),
                [id],
                |row| Ok(parse_person_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn find_person_by_name(&self, name: &str) -> RepoResult<Option<Person>> {
        self.conn
            .query_row(
                &format!("{PERSON_SELECT_SQL} WHERE name = ?1;"),
                [name.trim()],
                |row| Ok(parse_person_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_persons(&self) -> RepoResult<Vec<Person>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PERSON_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut persons = Vec::new();
        while let Some(row) = rows.next()? {
            persons.push(parse_person_row(row)?);
        }
        Ok(persons)
    }

    fn update_person(&self, person: &Person) -> RepoResult<()> {
        let name = require_text("name", &person.name)?;
        let profile_json = encode_profile(&person.profile)?;

        let changed = self
            .conn
            .execute(
                "UPDATE persons
                 SET
                    name = ?1,
                    avatar = ?2,
                    profile_json = ?3,
                    updated_at = (CAST(strftime('%s', 'now') AS INTEGER) * 1000)
                 WHERE id = ?4;",
                params![
                    name.as_str(),
                    non_blank(person.avatar.as_deref()),
                    profile_json,
                    person.id,
                ],
            )
            .map_err(|err| map_unique_violation(err, "person", &name))?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "person",
                id: person.id,
            });
        }
        Ok(())
    }

    fn delete_person(&self, id: PersonId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM persons WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "person",
                id,
            });
        }
        Ok(())
    }
}

fn parse_person_row(row: &Row<'_>) -> RepoResult<Person> {
    let id: PersonId = row.get("id")?;
    let profile_json: String = row.get("profile_json")?;
    let profile = serde_json::from_str::<Profile>(&profile_json).map_err(|err| {
        RepoError::InvalidData(format!("invalid profile_json for person {id}: {err}"))
    })?;

    Ok(Person {
        id,
        name: row.get("name")?,
        avatar: row.get("avatar")?,
        profile,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn encode_profile(profile: &Profile) -> RepoResult<String> {
    serde_json::to_string(profile)
        .map_err(|err| RepoError::InvalidData(format!("profile cannot be encoded: {err}")))
}
