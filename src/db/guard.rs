#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Scoped savepoint and transaction handles.
//!
//! Both guards undo their changes when dropped without being finished, so
//! every exit path out of a grader (early return, `?`, panic) leaves the
//! database in the state it had before the guard was opened.

use std::ops::{Deref, DerefMut};

use super::{DbError, QueryExecutor};

/// A named savepoint that is rolled back and released when dropped.
pub struct Savepoint<'a, E: QueryExecutor + ?Sized> {
    /// The executor the savepoint was opened on.
    db:       &'a mut E,
    /// Savepoint name.
    name:     String,
    /// Set once the savepoint has been released or rolled back explicitly.
    finished: bool,
}

impl<'a, E: QueryExecutor + ?Sized> Savepoint<'a, E> {
    /// Opens a savepoint called `name`.
    pub fn open(db: &'a mut E, name: impl Into<String>) -> Result<Self, DbError> {
        let name = name.into();
        db.savepoint(&name)?;
        Ok(Self {
            db,
            name,
            finished: false,
        })
    }

    /// Discards every change made since the savepoint was opened and
    /// releases it.
    pub fn discard(mut self) -> Result<(), DbError> {
        self.finished = true;
        self.db.rollback(Some(&self.name))?;
        self.db.release(&self.name)
    }
}

impl<E: QueryExecutor + ?Sized> Deref for Savepoint<'_, E> {
    type Target = E;

    fn deref(&self) -> &Self::Target {
        self.db
    }
}

impl<E: QueryExecutor + ?Sized> DerefMut for Savepoint<'_, E> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.db
    }
}

impl<E: QueryExecutor + ?Sized> Drop for Savepoint<'_, E> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self
            .db
            .rollback(Some(&self.name))
            .and_then(|_| self.db.release(&self.name))
        {
            tracing::warn!("Could not clean up savepoint `{}`: {}", self.name, e);
        }
    }
}

/// An explicit transaction that is rolled back unless finished otherwise.
pub struct Transaction<'a, E: QueryExecutor + ?Sized> {
    /// The executor the transaction was opened on.
    db:       &'a mut E,
    /// Set once the transaction has been rolled back explicitly.
    finished: bool,
}

impl<'a, E: QueryExecutor + ?Sized> Transaction<'a, E> {
    /// Starts a transaction.
    pub fn begin(db: &'a mut E) -> Result<Self, DbError> {
        db.start_transaction()?;
        Ok(Self {
            db,
            finished: false,
        })
    }

    /// Rolls the whole transaction back.
    pub fn rollback(mut self) -> Result<(), DbError> {
        self.finished = true;
        self.db.rollback(None)
    }
}

impl<E: QueryExecutor + ?Sized> Deref for Transaction<'_, E> {
    type Target = E;

    fn deref(&self) -> &Self::Target {
        self.db
    }
}

impl<E: QueryExecutor + ?Sized> DerefMut for Transaction<'_, E> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.db
    }
}

impl<E: QueryExecutor + ?Sized> Drop for Transaction<'_, E> {
    fn drop(&mut self) {
        if !self.finished
            && let Err(e) = self.db.rollback(None)
        {
            tracing::warn!("Could not roll back transaction: {}", e);
        }
    }
}
