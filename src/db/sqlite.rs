#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use rusqlite::{Connection, ErrorCode, types::ValueRef};

use super::{DbError, QueryExecutor, QueryResult};
use crate::{sql, types::Value};

/// Number of SQLite VM instructions between timeout checks.
const PROGRESS_INTERVAL: i32 = 1_000;

/// Where the executor's database lives.
#[derive(Debug, Clone)]
enum Location {
    /// A private in-memory database.
    Memory,
    /// A database file on disk.
    File(PathBuf),
}

/// A [`QueryExecutor`] backed by SQLite.
///
/// An optional initialisation script (schema and seed data) is run when the
/// connection is opened and replayed after every [`reconnect`]. For in-memory
/// databases this means a reconnect restores the initial state, not the state
/// at the time of the failure.
///
/// [`reconnect`]: QueryExecutor::reconnect
pub struct SqliteExecutor {
    /// The live connection.
    conn:     Connection,
    /// Where to reconnect to.
    location: Location,
    /// Script replayed on every fresh connection.
    init:     Option<String>,
    /// Per-statement time limit.
    timeout:  Option<Duration>,
}

impl SqliteExecutor {
    /// Opens a private in-memory database.
    pub fn memory() -> Result<Self, DbError> {
        Self::connect(Location::Memory)
    }

    /// Opens (or creates) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        Self::connect(Location::File(path.as_ref().to_path_buf()))
    }

    /// Opens a connection without running any script.
    fn connect(location: Location) -> Result<Self, DbError> {
        let conn = open_connection(&location)?;
        Ok(Self {
            conn,
            location,
            init: None,
            timeout: None,
        })
    }

    /// Runs `script` now and again after every reconnect.
    pub fn with_init_script(mut self, script: impl Into<String>) -> Result<Self, DbError> {
        let script = script.into();
        self.execute_batch(&script)?;
        self.init = Some(script);
        Ok(self)
    }

    /// Sets the per-statement time limit.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Installs a progress handler that interrupts statements running past
    /// the time limit.
    fn arm_timeout(&self) {
        if let Some(limit) = self.timeout {
            let deadline = Instant::now() + limit;
            self.conn
                .progress_handler(PROGRESS_INTERVAL, Some(move || Instant::now() > deadline));
        }
    }

    /// Removes the progress handler.
    fn disarm_timeout(&self) {
        if self.timeout.is_some() {
            self.conn
                .progress_handler(PROGRESS_INTERVAL, None::<fn() -> bool>);
        }
    }

    /// Maps a SQLite error onto the executor's error taxonomy.
    fn classify(&self, err: rusqlite::Error) -> DbError {
        let code = match &err {
            rusqlite::Error::SqliteFailure(e, _) => Some(e.code),
            _ => None,
        };

        match code {
            Some(ErrorCode::OperationInterrupted) => match self.timeout {
                Some(limit) => DbError::Timeout(limit),
                None => DbError::Query(err.to_string()),
            },
            Some(
                ErrorCode::CannotOpen
                | ErrorCode::NotADatabase
                | ErrorCode::SystemIoFailure
                | ErrorCode::DatabaseCorrupt,
            ) => DbError::Connection(err.to_string()),
            _ => DbError::Query(err.to_string()),
        }
    }

    /// Runs one statement and collects its rows.
    fn run_statement(&mut self, statement: &str) -> Result<QueryResult, DbError> {
        tracing::debug!("Executing `{}`", statement);
        let statement = sql::strip_terminator(statement);
        if sql::strip_terminator(&sql::strip_comments(statement)).is_empty() {
            return Err(DbError::Query("no SQL statement was submitted".to_string()));
        }

        self.arm_timeout();
        let result = query_rows(&self.conn, statement);
        self.disarm_timeout();
        result.map_err(|e| self.classify(e))
    }

    /// Runs a script under the time limit.
    fn run_batch(&mut self, script: &str) -> Result<(), DbError> {
        self.arm_timeout();
        let result = self.conn.execute_batch(script);
        self.disarm_timeout();
        result.map_err(|e| self.classify(e))
    }
}

/// Opens a raw connection at `location`.
fn open_connection(location: &Location) -> Result<Connection, DbError> {
    let conn = match location {
        Location::Memory => Connection::open_in_memory(),
        Location::File(path) => Connection::open(path),
    };
    conn.map_err(|e| DbError::Connection(e.to_string()))
}

/// Prepares `statement`, steps it to completion and snapshots the rows.
fn query_rows(conn: &Connection, statement: &str) -> rusqlite::Result<QueryResult> {
    let mut stmt = conn.prepare(statement)?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();
    let width = columns.len();

    let mut rows = stmt.query([])?;
    let mut collected = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(Value::from(row.get_ref(idx)?));
        }
        collected.push(values);
    }

    Ok(QueryResult::new(columns, collected))
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

impl QueryExecutor for SqliteExecutor {
    fn execute(
        &mut self,
        sql: &str,
        setup: Option<&str>,
        teardown: Option<&str>,
    ) -> Result<QueryResult, DbError> {
        let result = match setup {
            Some(setup) => self
                .run_batch(setup)
                .and_then(|_| self.run_statement(sql)),
            None => self.run_statement(sql),
        };

        if let Some(teardown) = teardown
            && let Err(e) = self.run_batch(teardown)
        {
            if result.is_ok() {
                return Err(e);
            }
            tracing::warn!("Teardown failed after an earlier error: {}", e);
        }

        result
    }

    fn execute_batch(&mut self, sql: &str) -> Result<(), DbError> {
        tracing::debug!("Executing script ({} bytes)", sql.len());
        self.run_batch(sql)
    }

    fn savepoint(&mut self, name: &str) -> Result<(), DbError> {
        self.run_batch(&format!("SAVEPOINT {name}"))
    }

    fn rollback(&mut self, name: Option<&str>) -> Result<(), DbError> {
        match name {
            Some(name) => self.run_batch(&format!("ROLLBACK TO SAVEPOINT {name}")),
            None => self.run_batch("ROLLBACK"),
        }
    }

    fn release(&mut self, name: &str) -> Result<(), DbError> {
        self.run_batch(&format!("RELEASE SAVEPOINT {name}"))
    }

    fn start_transaction(&mut self) -> Result<(), DbError> {
        self.run_batch("BEGIN")
    }

    fn reconnect(&mut self) -> Result<(), DbError> {
        tracing::info!("Reconnecting to {:?}", self.location);
        self.conn = open_connection(&self.location)?;
        if let Some(script) = self.init.clone() {
            self.run_batch(&script)?;
        }
        Ok(())
    }
}
