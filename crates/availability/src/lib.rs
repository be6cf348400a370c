//! Availability for the resource owner.
//!
//! [`ReservationLockManager`] enforces the hold/confirm/release state machine
//! and the date-overlap rule over a [`lock_store::LockStore`]. Every
//! operation is idempotent by idempotency key.

pub mod error;
pub mod manager;

pub use error::{LockError, LockErrorKind};
pub use manager::ReservationLockManager;
