//! SQLite storage backend for Trellis

use super::traits::{GraphStore, GraphTransaction, OpenStore, StorageError, StorageResult};
use crate::graph::{ElementId, GraphElement};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed graph store
///
/// Every element lives in a single `elements` table as a JSON document, next
/// to the few columns that queries filter on (owner, kind, share level and
/// last-center date). Thread-safe via internal mutex on the connection; a
/// transaction holds the lock until it commits or rolls back.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS elements (
                id TEXT PRIMARY KEY,
                owner TEXT NOT NULL,
                kind TEXT NOT NULL,
                share_level TEXT NOT NULL,
                last_center_date TEXT,
                element_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_elements_owner
                ON elements(owner, kind);
            CREATE INDEX IF NOT EXISTS idx_elements_center
                ON elements(last_center_date);

            -- Enable WAL mode for concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Deserialize a stored element and check it against its row id
    fn row_to_element(id: &str, element_json: &str) -> StorageResult<GraphElement> {
        let element: GraphElement = serde_json::from_str(element_json)?;
        if element.id().as_str() != id {
            return Err(StorageError::Corrupt {
                id: id.to_string(),
                reason: format!("document carries id {}", element.id()),
            });
        }
        Ok(element)
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }
}

impl GraphStore for SqliteStore {
    fn begin(&self) -> StorageResult<Box<dyn GraphTransaction + '_>> {
        let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(Box::new(SqliteTransaction { conn, open: true }))
    }
}

/// An open `BEGIN IMMEDIATE` transaction; rolled back on drop unless committed
struct SqliteTransaction<'a> {
    conn: MutexGuard<'a, Connection>,
    open: bool,
}

impl SqliteTransaction<'_> {
    fn select(&self, sql: &str, param: Option<&str>) -> StorageResult<Vec<GraphElement>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(param), |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;
        rows.map(|row| -> StorageResult<GraphElement> {
            let (id, json): (String, String) = row?;
            SqliteStore::row_to_element(&id, &json)
        })
        .collect()
    }

    fn finish(&mut self, statement: &str) -> StorageResult<()> {
        self.conn.execute_batch(statement)?;
        self.open = false;
        Ok(())
    }
}

impl GraphTransaction for SqliteTransaction<'_> {
    fn get(&self, id: &ElementId) -> StorageResult<Option<GraphElement>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT element_json FROM elements WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|json| SqliteStore::row_to_element(id.as_str(), &json))
            .transpose()
    }

    fn put(&mut self, element: GraphElement) -> StorageResult<()> {
        let data = element.data();
        let last_center_date = data.last_center_date.map(|date| date.to_rfc3339());
        self.conn.execute(
            "INSERT INTO elements (id, owner, kind, share_level, last_center_date, element_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                share_level = excluded.share_level,
                last_center_date = excluded.last_center_date,
                element_json = excluded.element_json",
            params![
                element.id().as_str(),
                data.owner(),
                element.kind().as_str(),
                data.share_level.as_str(),
                last_center_date,
                serde_json::to_string(&element)?,
            ],
        )?;
        Ok(())
    }

    fn delete(&mut self, id: &ElementId) -> StorageResult<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM elements WHERE id = ?1", params![id.as_str()])?;
        Ok(deleted > 0)
    }

    fn elements_of_owner(&self, owner: &str) -> StorageResult<Vec<GraphElement>> {
        self.select(
            "SELECT id, element_json FROM elements WHERE owner = ?1 ORDER BY id",
            Some(owner),
        )
    }

    fn centered_elements(&self) -> StorageResult<Vec<GraphElement>> {
        self.select(
            "SELECT id, element_json FROM elements
             WHERE last_center_date IS NOT NULL
             ORDER BY last_center_date DESC",
            None,
        )
    }

    fn count(&self) -> StorageResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM elements", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn commit(mut self: Box<Self>) -> StorageResult<()> {
        self.finish("COMMIT")
    }

    fn rollback(mut self: Box<Self>) -> StorageResult<()> {
        self.finish("ROLLBACK")
    }
}

impl Drop for SqliteTransaction<'_> {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!(error = %e, "rollback of abandoned transaction failed");
            }
        }
    }
}
