#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Database access used by the graders.
//!
//! Graders only ever talk to the database through [`QueryExecutor`], so the
//! engine can run against any transactional backend that supports savepoints.
//! [`SqliteExecutor`] is the backend shipped with the crate.

use std::time::Duration;

/// Scoped savepoint and transaction handles.
pub mod guard;
/// Snapshot of an executed query.
pub mod result;
/// SQLite-backed executor.
pub mod sqlite;

pub use guard::{Savepoint, Transaction};
pub use result::QueryResult;
pub use sqlite::SqliteExecutor;

/// Errors raised while talking to the database.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DbError {
    /// The database rejected the SQL (syntax or semantic error). Recoverable
    /// for the current test.
    #[error("{0}")]
    Query(String),
    /// The transport to the database failed; the connection must be
    /// re-established before it is used again.
    #[error("connection error: {0}")]
    Connection(String),
    /// A statement ran longer than the configured limit.
    #[error("query exceeded the time limit of {0:?}")]
    Timeout(Duration),
}

impl DbError {
    /// Returns true if the connection needs to be re-established.
    pub fn needs_reconnect(&self) -> bool {
        matches!(self, DbError::Connection(_))
    }
}

/// Executes SQL against a transactional relational database.
///
/// Implementations must run `teardown` even when the primary statement
/// fails, and report transport failures as [`DbError::Connection`].
pub trait QueryExecutor {
    /// Runs `setup` (if any), then the single statement `sql`, then
    /// `teardown` (if any), returning the result of `sql`.
    fn execute(
        &mut self,
        sql: &str,
        setup: Option<&str>,
        teardown: Option<&str>,
    ) -> Result<QueryResult, DbError>;

    /// Runs a script of zero or more statements, discarding any results.
    fn execute_batch(&mut self, sql: &str) -> Result<(), DbError>;

    /// Creates a named savepoint.
    fn savepoint(&mut self, name: &str) -> Result<(), DbError>;

    /// Rolls back to the named savepoint, or the whole transaction when
    /// `name` is `None`.
    fn rollback(&mut self, name: Option<&str>) -> Result<(), DbError>;

    /// Releases the named savepoint, keeping its changes.
    fn release(&mut self, name: &str) -> Result<(), DbError>;

    /// Opens an explicit transaction.
    fn start_transaction(&mut self) -> Result<(), DbError>;

    /// Drops the current connection and opens a fresh one.
    fn reconnect(&mut self) -> Result<(), DbError>;

    /// Returns every row of `table`.
    fn snapshot(&mut self, table: &str) -> Result<QueryResult, DbError> {
        self.execute(&format!("SELECT * FROM {table}"), None, None)
    }
}
