use thiserror::Error;

/// Errors raised by lock store implementations.
#[derive(Debug, Error)]
pub enum LockStoreError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A persisted row could not be mapped back to a lock.
    #[error("Corrupt lock row: {0}")]
    CorruptRow(String),
}

/// Result type for lock store operations.
pub type Result<T> = std::result::Result<T, LockStoreError>;
