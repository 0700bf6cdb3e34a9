//! Record parsing errors

use thiserror::Error;

/// Errors that can occur while decoding a sensor record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed record: expected 7 comma-separated fields in '{0}'")]
    MalformedRecord(String),

    #[error("Record too long: {len} bytes (max {max})")]
    RecordTooLong { len: usize, max: usize },

    #[error("Invalid number for {field}: '{value}'")]
    InvalidNumber { field: &'static str, value: String },
}
