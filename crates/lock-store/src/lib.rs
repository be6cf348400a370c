//! Reservation lock persistence for the resource owner.
//!
//! A reservation lock is an exclusive claim on one resource for an inclusive
//! date range, keyed by the booking's idempotency key. Locks are never
//! deleted; released locks stay as an audit trail.

pub mod error;
pub mod lock;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{LockStoreError, Result};
pub use lock::{LockStatus, ReservationLock, ResourceUsage};
pub use memory::InMemoryLockStore;
pub use postgres::PostgresLockStore;
pub use store::{HoldOutcome, LockStore};
