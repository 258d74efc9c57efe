//! SQLite-backed category store.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use super::{CategoryStore, StoreError};
use crate::domain::{CategoryId, CategoryRecord, NewCategory, TextFormat};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS question_categories (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT    NOT NULL,
    context_id  INTEGER NOT NULL,
    info        TEXT    NOT NULL DEFAULT '',
    info_format INTEGER NOT NULL DEFAULT 0,
    stamp       TEXT    NOT NULL,
    parent      INTEGER REFERENCES question_categories(id),
    sort_order  INTEGER NOT NULL DEFAULT 999,
    UNIQUE (context_id, stamp)
);
CREATE INDEX IF NOT EXISTS idx_question_categories_parent
    ON question_categories (context_id, parent);
";

const COLUMNS: &str = "id, name, info, info_format, parent, context_id, sort_order, stamp";

/// Category store over a single SQLite connection
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        debug!("Opening category database at {}", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Total number of stored categories
    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM question_categories", [], |row| {
                row.get(0)
            })?;
        Ok(count as usize)
    }

    /// Distinct context ids that hold at least one category
    pub fn contexts(&self) -> Result<Vec<i64>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT context_id FROM question_categories ORDER BY context_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    fn query_records(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<CategoryRecord>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let records = stmt
            .query_map(params, record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<CategoryRecord> {
    let info_format: i64 = row.get(3)?;
    let parent: Option<i64> = row.get(4)?;

    Ok(CategoryRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        info: row.get(2)?,
        info_format: TextFormat::from_code(info_format).unwrap_or_default(),
        // Older data stores 0 for "no parent"
        parent: parent.filter(|p| *p != 0),
        context_id: row.get(5)?,
        sort_order: row.get(6)?,
        stamp: row.get(7)?,
    })
}

impl CategoryStore for SqliteStore {
    fn get(&self, id: CategoryId) -> Result<CategoryRecord, StoreError> {
        let sql = format!("SELECT {} FROM question_categories WHERE id = ?1", COLUMNS);
        self.conn
            .query_row(&sql, params![id], record_from_row)
            .optional()?
            .ok_or(StoreError::CategoryNotFound(id))
    }

    fn find_child(
        &self,
        context_id: i64,
        parent: Option<CategoryId>,
        name: &str,
    ) -> Result<Option<CategoryRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM question_categories
             WHERE context_id = ?1 AND name = ?2 AND COALESCE(parent, 0) = ?3
             ORDER BY id LIMIT 1",
            COLUMNS
        );
        let record = self
            .conn
            .query_row(
                &sql,
                params![context_id, name, parent.unwrap_or(0)],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn find_by_name(&self, name: &str) -> Result<Vec<CategoryRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM question_categories WHERE name = ?1 ORDER BY id",
            COLUMNS
        );
        self.query_records(&sql, params![name])
    }

    fn children(&self, parent: CategoryId) -> Result<Vec<CategoryRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM question_categories WHERE parent = ?1 ORDER BY sort_order, id",
            COLUMNS
        );
        self.query_records(&sql, params![parent])
    }

    fn list_context(&self, context_id: i64) -> Result<Vec<CategoryRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM question_categories WHERE context_id = ?1 ORDER BY id",
            COLUMNS
        );
        self.query_records(&sql, params![context_id])
    }

    fn insert(&mut self, category: NewCategory) -> Result<CategoryRecord, StoreError> {
        self.conn.execute(
            "INSERT INTO question_categories
                (name, context_id, info, info_format, stamp, parent, sort_order)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                category.name,
                category.context_id,
                category.info,
                category.info_format.code(),
                category.stamp,
                category.parent,
                category.sort_order,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!(id, name = %category.name, "Inserted category");

        Ok(CategoryRecord {
            id,
            name: category.name,
            info: category.info,
            info_format: category.info_format,
            parent: category.parent,
            context_id: category.context_id,
            sort_order: category.sort_order,
            stamp: category.stamp,
        })
    }

    fn begin(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}
