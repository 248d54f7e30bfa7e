//! Database layer for the blood bank.

mod schema;
mod reference;
mod members;
mod units;
mod requests;
mod donations;
mod events;

pub use schema::*;
#[allow(unused_imports)]
pub use reference::*;
#[allow(unused_imports)]
pub use members::*;
#[allow(unused_imports)]
pub use units::*;
#[allow(unused_imports)]
pub use requests::*;
#[allow(unused_imports)]
pub use donations::*;
#[allow(unused_imports)]
pub use events::*;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl DbError {
    /// Whether the underlying SQLite error is a UNIQUE / PRIMARY KEY violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.extended_code,
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            ),
            _ => false,
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

/// Narrow a row count to the `u32` used by summary records.
pub(crate) fn count_to_u32<T>(count: T, what: &str) -> DbResult<u32>
where
    T: TryInto<u32> + Copy + std::fmt::Display,
{
    count
        .try_into()
        .map_err(|_| DbError::Constraint(format!("{} count {} does not fit in u32", what, count)))
}

const SAVEPOINT: &str = "unit_of_work";

/// Open savepoint; rolled back on drop unless released.
struct UnitOfWork<'c> {
    conn: &'c Connection,
    released: bool,
}

impl<'c> UnitOfWork<'c> {
    fn begin(conn: &'c Connection) -> DbResult<Self> {
        conn.execute_batch(&format!("SAVEPOINT {}", SAVEPOINT))?;
        Ok(Self {
            conn,
            released: false,
        })
    }

    fn release(mut self) -> DbResult<()> {
        self.conn.execute_batch(&format!("RELEASE {}", SAVEPOINT))?;
        self.released = true;
        Ok(())
    }
}

impl Drop for UnitOfWork<'_> {
    fn drop(&mut self) {
        if !self.released {
            // Runs on error returns and on unwinding; nothing to report a failure to
            let _ = self.conn.execute_batch(&format!(
                "ROLLBACK TO {0}; RELEASE {0}",
                SAVEPOINT
            ));
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

    /// Run `f` as one unit of work.
    ///
    /// Uses a SQLite savepoint so calls nest: an inner failure rolls back only
    /// its own writes, an outer failure rolls back everything. A panic in `f`
    /// also rolls back.
    pub fn atomically<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Database) -> Result<T, E>,
        E: From<DbError>,
    {
        let unit_of_work = UnitOfWork::begin(&self.conn)?;
        let value = f(self)?;
        unit_of_work.release()?;
        Ok(value)
    }
}
