//! Database layer for hospice-ops.

mod assignments;
mod config;
mod invoices;
mod schema;

pub use assignments::*;
pub use invoices::*;
pub use schema::*;

use rusqlite::{params, Connection};
use std::path::Path;
use thiserror::Error;

use crate::engine::store::StoreError;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

pub type DbResult<T> = Result<T, DbError>;

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Json(e) => StoreError::Serde(e),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Record an applied mutation token. Callers that need the token and the
    /// aggregate write to land together must invoke this inside an open
    /// transaction on this connection.
    pub(crate) fn record_token(&self, token: &str, aggregate_id: &str) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO mutation_tokens (token, aggregate_id) VALUES (?1, ?2)",
            params![token, aggregate_id],
        )?;
        Ok(())
    }

    /// Whether a mutation token has already been applied.
    pub fn token_applied(&self, token: &str) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM mutation_tokens WHERE token = ?",
            [token],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
