//! Schema migrations for the Rapport tables.
//!
//! # Invariants
//! - `version` values are strictly increasing; the last one is the schema
//!   version this build writes.
//! - Pending migrations commit together or not at all.
//! - After migrating, every table in [`RAPPORT_TABLES`] exists.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "persons",
        sql: include_str!("0001_persons.sql"),
    },
    Migration {
        version: 2,
        name: "relations_circles",
        sql: include_str!("0002_relations_circles.sql"),
    },
    Migration {
        version: 3,
        name: "graph_layout",
        sql: include_str!("0003_graph_layout.sql"),
    },
];

/// Tables the repositories rely on.
pub const RAPPORT_TABLES: &[&str] = &[
    "persons",
    "events",
    "annotations",
    "developments",
    "relations",
    "circles",
    "person_circles",
    "graph_layout",
];

pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Version recorded in `PRAGMA user_version`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?)
}

/// Migrates to [`latest_version`] and checks the resulting table set.
///
/// Returns how many migrations ran.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let from = schema_version(conn)?;
    let latest = latest_version();
    if from > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|migration| migration.version > from)
        .collect();
    if !pending.is_empty() {
        let tx = conn.transaction()?;
        for migration in &pending {
            tx.execute_batch(migration.sql)
                .and_then(|()| {
                    tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))
                })
                .map_err(|source| DbError::Migration {
                    version: migration.version,
                    name: migration.name,
                    source,
                })?;
        }
        tx.commit()?;
        info!(
            "event=db_migrate module=db status=ok from_version={} to_version={} applied={}",
            from,
            latest,
            pending.len()
        );
    }

    verify_tables(conn)?;
    Ok(pending.len())
}

fn verify_tables(conn: &Connection) -> DbResult<()> {
    let mut stmt = conn.prepare(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
    )?;
    for table in RAPPORT_TABLES {
        let exists: bool = stmt.query_row([table], |row| row.get(0))?;
        if !exists {
            return Err(DbError::MissingTable(*table));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, latest_version, schema_version, MIGRATIONS};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn versions_are_strictly_increasing() {
        assert!(MIGRATIONS
            .windows(2)
            .all(|pair| pair[0].version < pair[1].version));
        assert_eq!(latest_version(), 3);
    }

    #[test]
    fn second_run_applies_nothing() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(apply_migrations(&mut conn).unwrap(), MIGRATIONS.len());
        assert_eq!(apply_migrations(&mut conn).unwrap(), 0);
        assert_eq!(schema_version(&conn).unwrap(), latest_version());
    }

    #[test]
    fn dropped_table_is_reported_by_name() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        conn.execute_batch("DROP TABLE graph_layout;").unwrap();

        let err = apply_migrations(&mut conn).unwrap_err();
        assert!(matches!(err, DbError::MissingTable("graph_layout")));
    }

    #[test]
    fn failing_script_names_its_version_and_rolls_back() {
        let mut conn = Connection::open_in_memory().unwrap();
        // Occupies a table name the first script creates.
        conn.execute_batch("CREATE TABLE persons (id INTEGER PRIMARY KEY);")
            .unwrap();

        let err = apply_migrations(&mut conn).unwrap_err();
        match err {
            DbError::Migration { version, name, .. } => {
                assert_eq!(version, 1);
                assert_eq!(name, "persons");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(schema_version(&conn).unwrap(), 0);
    }
}
