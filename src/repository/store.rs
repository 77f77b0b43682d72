//! Generic SQLite-backed relational store.
//!
//! Tables are created from declared field-type maps, and access happens
//! through generic `insert`/`update`/`search` calls taking equality
//! conditions, ordering, and a limit. Typed repositories convert rows into
//! their models.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use thiserror::Error;

use super::schema;

/// Errors from the relational store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("database lock poisoned")]
    Poisoned,
}

/// Column type in a declared table schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Auto-incrementing integer primary key.
    Id,
    /// Text primary key.
    TextId,
    Integer,
    Real,
    Text,
    /// Stored as INTEGER 0/1.
    Boolean,
    /// Stored as RFC 3339 text.
    Timestamp,
}

impl FieldType {
    fn sql(&self) -> &'static str {
        match self {
            Self::Id => "INTEGER PRIMARY KEY AUTOINCREMENT",
            Self::TextId => "TEXT PRIMARY KEY",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Text => "TEXT",
            Self::Boolean => "INTEGER NOT NULL DEFAULT 0",
            Self::Timestamp => "TEXT NOT NULL",
        }
    }
}

/// Declared schema for one entity table.
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: &'static str,
    pub fields: &'static [(&'static str, FieldType)],
    /// Non-unique indexes, each a list of columns.
    pub indexes: &'static [&'static [&'static str]],
}

impl TableSchema {
    fn create_sql(&self) -> String {
        let columns: Vec<String> = self
            .fields
            .iter()
            .map(|(name, ty)| format!("{} {}", name, ty.sql()))
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.name,
            columns.join(", ")
        )
    }

    fn index_sql(&self) -> Vec<String> {
        self.indexes
            .iter()
            .map(|cols| {
                format!(
                    "CREATE INDEX IF NOT EXISTS idx_{}_{} ON {} ({})",
                    self.name,
                    cols.join("_"),
                    self.name,
                    cols.join(", ")
                )
            })
            .collect()
    }
}

/// Sort direction for `search`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A result row: column name -> SQLite value.
pub type Row = HashMap<String, Value>;

/// Shared handle to the SQLite database.
///
/// Cheap to clone; all clones serialize access through one connection.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database at the given path and apply the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Create all declared tables and indexes.
    fn migrate(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        for table in schema::tables() {
            conn.execute(&table.create_sql(), [])?;
            for sql in table.index_sql() {
                conn.execute(&sql, [])?;
            }
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Run a closure against the raw connection.
    ///
    /// Used by repositories for compound statements the generic surface does
    /// not cover (transactions, upserts).
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    ) -> Result<T, StoreError> {
        let conn = self.lock()?;
        f(&conn).map_err(Into::into)
    }

    /// Insert a row, returning its rowid.
    pub fn insert(&self, table: &str, values: &[(&str, Value)]) -> Result<i64, StoreError> {
        let columns: Vec<&str> = values.iter().map(|(c, _)| *c).collect();
        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        );
        let conn = self.lock()?;
        conn.execute(
            &sql,
            params_from_iter(values.iter().map(|(_, v)| v.clone())),
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Update matching rows, returning the number of rows changed.
    pub fn update(
        &self,
        table: &str,
        values: &[(&str, Value)],
        conditions: &[(&str, Value)],
    ) -> Result<usize, StoreError> {
        let assignments: Vec<String> = values
            .iter()
            .enumerate()
            .map(|(i, (col, _))| format!("{} = ?{}", col, i + 1))
            .collect();
        let mut sql = format!("UPDATE {} SET {}", table, assignments.join(", "));
        if !conditions.is_empty() {
            let offset = values.len();
            let clauses: Vec<String> = conditions
                .iter()
                .enumerate()
                .map(|(i, (col, _))| format!("{} = ?{}", col, offset + i + 1))
                .collect();
            sql.push_str(&format!(" WHERE {}", clauses.join(" AND ")));
        }
        let params: Vec<Value> = values
            .iter()
            .chain(conditions.iter())
            .map(|(_, v)| v.clone())
            .collect();
        let conn = self.lock()?;
        Ok(conn.execute(&sql, params_from_iter(params))?)
    }

    /// Search a table with equality conditions, ordering, and a limit.
    pub fn search(
        &self,
        table: &str,
        conditions: &[(&str, Value)],
        order_by: &[(&str, Order)],
        limit: Option<usize>,
    ) -> Result<Vec<Row>, StoreError> {
        let mut sql = format!("SELECT * FROM {table}");
        if !conditions.is_empty() {
            let clauses: Vec<String> = conditions
                .iter()
                .enumerate()
                .map(|(i, (col, _))| format!("{} = ?{}", col, i + 1))
                .collect();
            sql.push_str(&format!(" WHERE {}", clauses.join(" AND ")));
        }
        if !order_by.is_empty() {
            let orders: Vec<String> = order_by
                .iter()
                .map(|(col, order)| format!("{} {}", col, order.sql()))
                .collect();
            sql.push_str(&format!(" ORDER BY {}", orders.join(", ")));
        }
        if let Some(n) = limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }

        let params: Vec<Value> = conditions.iter().map(|(_, v)| v.clone()).collect();
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        let rows = stmt.query_map(params_from_iter(params), |row| {
            let mut map = Row::new();
            for (i, name) in columns.iter().enumerate() {
                map.insert(name.clone(), row.get::<_, Value>(i)?);
            }
            Ok(map)
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

/// Read a text column, empty string when missing or NULL.
pub(crate) fn row_text(row: &Row, key: &str) -> String {
    match row.get(key) {
        Some(Value::Text(s)) => s.clone(),
        _ => String::new(),
    }
}

/// Read a nullable text column.
pub(crate) fn row_text_opt(row: &Row, key: &str) -> Option<String> {
    match row.get(key) {
        Some(Value::Text(s)) => Some(s.clone()),
        _ => None,
    }
}

/// Read an integer column, 0 when missing or NULL.
pub(crate) fn row_i64(row: &Row, key: &str) -> i64 {
    match row.get(key) {
        Some(Value::Integer(n)) => *n,
        _ => 0,
    }
}

/// Read a boolean column stored as INTEGER 0/1.
pub(crate) fn row_bool(row: &Row, key: &str) -> bool {
    row_i64(row, key) != 0
}
