//! Database layer for pharmalytics.
//!
//! One SQLite database holds the reference data (drugs, interactions,
//! dosage rows, alternatives) and the append-only audit tables.

mod analyses;
mod checks;
mod drugs;
mod interactions;
mod reference;
mod schema;

pub use checks::*;
pub use schema::*;

use rusqlite::{Connection, ErrorCode};
use std::path::Path;
use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(err, msg)
                if err.code == ErrorCode::ConstraintViolation =>
            {
                DbError::Constraint(msg.clone().unwrap_or_else(|| e.to_string()))
            }
            _ => DbError::Sqlite(e),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

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

    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Case fold used for stored names and lookup needles alike.
///
/// SQLite's `lower()` only folds ASCII, so matching runs against columns
/// folded here rather than in SQL.
pub(crate) fn fold_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Folded needle for substring matching; `None` when blank.
pub(crate) fn name_needle(name: &str) -> Option<String> {
    let folded = fold_name(name);
    if folded.is_empty() {
        None
    } else {
        Some(folded)
    }
}
