//! Shared value types for the room booking services.
//!
//! Both the booking orchestrator and the resource owner speak in terms of
//! these types; the idempotency key is the token correlating a booking
//! attempt with its reservation lock across the service boundary.

pub mod error;
pub mod range;
pub mod types;

pub use error::ValidationError;
pub use range::DateRange;
pub use types::{
    BookingId, CORRELATION_ID_HEADER, CorrelationId, IdempotencyKey, LockId, RequesterId,
    ResourceId,
};
