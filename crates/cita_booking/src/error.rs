// --- File: crates/cita_booking/src/error.rs ---
use chrono::{NaiveDate, NaiveTime};
use cita_common::error::CitaError;
use cita_db::StoreError;
use thiserror::Error;
use tracing::error;

/// Input that cannot be turned into a business-local instant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),
}

/// Failures of the booking protocol and the availability queries.
#[derive(Error, Debug)]
pub enum BookingError {
    /// Unparseable date or time, or client details failing validation.
    #[error("{0}")]
    MalformedInput(String),

    /// A well-formed time that is not one of the slots offered on that date.
    #[error("{0}")]
    SlotNotOffered(String),

    #[error("The {start_time} slot on {date} is already booked")]
    SlotConflict {
        date: NaiveDate,
        start_time: NaiveTime,
    },

    /// Business hours in the configuration cannot be used.
    #[error("Invalid schedule configuration: {0}")]
    InvalidSchedule(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<NormalizeError> for BookingError {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::MalformedInput(message) => BookingError::MalformedInput(message),
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::SlotConflict { date, start_time } => {
                BookingError::SlotConflict { date, start_time }
            }
            other => BookingError::Store(other),
        }
    }
}

impl From<BookingError> for CitaError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::MalformedInput(message) | BookingError::SlotNotOffered(message) => {
                CitaError::ValidationError(message)
            }
            BookingError::SlotConflict { .. } => CitaError::ConflictError(format!(
                "{}. Please pick another time.",
                err
            )),
            BookingError::InvalidSchedule(message) => CitaError::ConfigError(message),
            BookingError::Store(store_err) => {
                error!("Booking store invariant or backend failure: {}", store_err);
                CitaError::InternalError(store_err.to_string())
            }
        }
    }
}
