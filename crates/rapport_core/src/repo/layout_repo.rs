//! Graph layout blob storage.
//!
//! The blob is opaque: it is stored and returned without inspection.

use crate::model::graph::GraphLayout;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

pub trait LayoutRepository {
    fn load_layout(&self, key: &str) -> RepoResult<Option<GraphLayout>>;
    /// Inserts or replaces the blob stored under `key`.
    fn save_layout(&self, key: &str, layout_json: &Value) -> RepoResult<()>;
}

pub struct SqliteLayoutRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLayoutRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl LayoutRepository for SqliteLayoutRepository<'_> {
    fn load_layout(&self, key: &str) -> RepoResult<Option<GraphLayout>> {
        let row = self
            .conn
            .query_row(
                "SELECT layout_json, updated_at FROM graph_layout WHERE user_id = ?1;",
                [key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        let Some((raw, updated_at)) = row else {
            return Ok(None);
        };
        let layout_json = serde_json::from_str(&raw).map_err(|err| {
            RepoError::InvalidData(format!("invalid layout_json for `{key}`: {err}"))
        })?;
        Ok(Some(GraphLayout {
            layout_json,
            updated_at: Some(updated_at),
        }))
    }

    fn save_layout(&self, key: &str, layout_json: &Value) -> RepoResult<()> {
        let raw = serde_json::to_string(layout_json)
            .map_err(|err| RepoError::InvalidData(format!("layout cannot be encoded: {err}")))?;
        self.conn.execute(
            "INSERT INTO graph_layout (user_id, layout_json)
             VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET
                layout_json = excluded.layout_json,
                updated_at = (CAST(strftime('%s', 'now') AS INTEGER) * 1000);",
            params![key, raw],
        )?;
        Ok(())
    }
}
