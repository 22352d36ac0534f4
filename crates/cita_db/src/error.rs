//! Error types for the booking store

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

/// Errors that can occur when working with the database client
#[derive(Debug, Error)]
pub enum DbError {
    /// Error with the database configuration
    #[error("Database configuration error: {0}")]
    ConfigError(String),

    /// Error with database pool creation
    #[error("Database pool error: {0}")]
    PoolError(String),

    /// Error with database query
    #[error("Database query error: {0}")]
    QueryError(String),

    /// Error with database transaction
    #[error("Database transaction error: {0}")]
    TransactionError(String),

    /// A stored row could not be turned back into a booking
    #[error("Corrupt booking row: {0}")]
    CorruptRow(String),

    /// Other errors
    #[error("Other database error: {0}")]
    Other(String),
}

/// Outcomes of booking store operations other than success.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A confirmed booking already holds this slot.
    #[error("Slot {date} {start_time} is already booked")]
    SlotConflict {
        date: NaiveDate,
        start_time: NaiveTime,
    },

    /// No booking with this id, or it is already cancelled where a live one is required.
    #[error("Booking {0} not found")]
    NotFound(String),

    /// The booking is already linked to a different provider event.
    #[error("Booking {id} is synced to {recorded}, refusing to relink to {attempted}")]
    SyncIdentityMismatch {
        id: String,
        recorded: String,
        attempted: String,
    },

    /// The storage backend failed; nothing was applied.
    #[error("Storage failure: {0}")]
    Backend(#[from] DbError),
}
