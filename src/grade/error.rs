#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use super::deductions::DeductionCode;
use crate::db::DbError;

/// Errors that can come out of a grader.
///
/// [`GradeError::Db`] is contained at the per-test boundary. The other
/// variants mean the grading run itself is broken and abort it.
#[derive(thiserror::Error, Debug)]
pub enum GradeError {
    /// The database rejected a statement or the connection failed.
    #[error(transparent)]
    Db(#[from] DbError),
    /// A rollback did not restore the state it was supposed to.
    #[error("Internal consistency check failed: {0}")]
    Inconsistent(String),
    /// A grader attached a code the deduction table does not define.
    #[error("Deduction code {0} is not defined in the deduction table")]
    UnknownDeduction(DeductionCode),
}

impl GradeError {
    /// Returns true if the error can be charged to the current test.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, GradeError::Db(_))
    }
}
