//! Connection bootstrap for the relationship store.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`; person deletes cascade
//!   through it.
//! - Returned connections are at the latest schema version.
//! - Open/configure failures carry the database location.

use super::migrations::apply_migrations;
use super::{DbError, DbLocation, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens (creating when missing) a database file and migrates it.
///
/// One connection per request scope; do not share it across threads.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let path = path.as_ref();
    open_at(DbLocation::File(path.to_path_buf()), || Connection::open(path))
}

/// Used by tests.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_at(DbLocation::Memory, Connection::open_in_memory)
}

fn open_at<F>(location: DbLocation, opener: F) -> DbResult<Connection>
where
    F: FnOnce() -> rusqlite::Result<Connection>,
{
    let started_at = Instant::now();
    let kind = match location {
        DbLocation::File(_) => "file",
        DbLocation::Memory => "memory",
    };

    let result = opener()
        .and_then(|conn| configure(&conn, &location).map(|()| conn))
        .map_err(|source| DbError::Open {
            location: location.clone(),
            source,
        })
        .and_then(|mut conn| apply_migrations(&mut conn).map(|applied| (conn, applied)));

    match result {
        Ok((conn, applied)) => {
            info!(
                "event=db_open module=db status=ok mode={} migrations_applied={} duration_ms={}",
                kind,
                applied,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error={}",
                kind,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn configure(conn: &Connection, location: &DbLocation) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    if let DbLocation::File(_) = location {
        // journal_mode answers with the resulting mode.
        let _: String = conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
    }
    conn.busy_timeout(BUSY_TIMEOUT)
}
