//! Booking saga for the orchestrator service.
//!
//! A booking books exactly one resource through two remote steps on the
//! resource owner:
//! 1. Hold the resource for the requested dates
//! 2. Confirm the hold
//!
//! If either step fails (rejection, transport failure or timeout) the saga
//! sends a best-effort release and cancels the booking. Both sides key every
//! effect on the caller's idempotency key, so retries never double-book.

pub mod attempt;
pub mod coordinator;
pub mod error;
pub mod policy;
pub mod services;
pub mod steps;
pub mod store;

pub use attempt::{BookingAttempt, BookingStatus, CreateBooking};
pub use coordinator::BookingSaga;
pub use error::{BookingStoreError, RemoteCallError, SagaError};
pub use policy::CallPolicy;
pub use services::{HttpResourceOwnerClient, InMemoryResourceOwner, RecordedCall, ResourceOwnerClient};
pub use store::{BookingStore, InMemoryBookingStore, InsertOutcome, PostgresBookingStore};
