use chrono::NaiveDate;
use thiserror::Error;

/// Rejections raised while constructing shared value types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The idempotency key was empty or whitespace only.
    #[error("Idempotency key must not be empty")]
    EmptyIdempotencyKey,

    /// The date range ends before it starts.
    #[error("Invalid date range: start {start} is after end {end}")]
    InvertedDateRange { start: NaiveDate, end: NaiveDate },
}
