use chrono::NaiveDate;
use thiserror::Error;

/// A document that cannot be parsed as a whole. Single-field misses never end up here.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("document for {date} has no visible text")]
    EmptyDocument { date: NaiveDate },
    #[error("invalid selector {0}")]
    Selector(String),
    #[error("invalid pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Failure of one batch call to the calculation engine. Every variant voids the whole batch.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("reference engine unavailable: {0}")]
    Unavailable(String),
    #[error("reference engine timed out after {0}s")]
    Timeout(u64),
    #[error("reference engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("reference engine output is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown sinograph `{value}` in {field}")]
    UnknownSinograph { field: &'static str, value: String },
    #[error("invalid reference value in {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("reference engine returned {got} records for {expected} dates")]
    LengthMismatch { expected: usize, got: usize },
    #[error("reference engine io failure: {0}")]
    Io(#[from] std::io::Error),
}
