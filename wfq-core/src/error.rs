//! Error types for trace parsing and schedule execution.

use std::io;

/// A failure to interpret one line of the arrival trace.
///
/// Parsing is fatal on error: the scheduler does not skip or retry a malformed line,
/// it stops and reports the offending line back to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The line did not split into 6 or 7 whitespace-separated tokens.
    #[error("line {line}: expected 6 or 7 fields, got {found}: {raw:?}")]
    MalformedLine {
        line: u64,
        found: usize,
        raw: String,
    },
    /// A token that should have parsed as an integer or real number didn't.
    #[error("line {line}: field {field:?} is not a valid number: {raw:?}")]
    InvalidField {
        line: u64,
        field: &'static str,
        raw: String,
    },
    /// An address or port token exceeded the 31-character limit.
    #[error("line {line}: field {field:?} exceeds 31 characters: {raw:?}")]
    FieldTooLong {
        line: u64,
        field: &'static str,
        raw: String,
    },
    /// An explicit weight was zero or negative.
    #[error("line {line}: weight must be positive, got {weight}: {raw:?}")]
    NonPositiveWeight {
        line: u64,
        weight: f64,
        raw: String,
    },
}

/// Top-level failure of a full scheduling run.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}
