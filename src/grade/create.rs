#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use super::{error::GradeError, results::TestOutcome};
use crate::{response::Response, spec::CreateTest};

/// CREATE statements are only shown for manual inspection; the test always
/// passes.
pub fn grade(_test: &CreateTest, _response: &Response) -> Result<TestOutcome, GradeError> {
    Ok(TestOutcome::pass())
}
