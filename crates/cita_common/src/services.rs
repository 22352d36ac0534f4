// --- File: crates/cita_common/src/services.rs ---
//! Service abstractions for the external calendar.
//!
//! The booking engine never talks to a calendar provider directly. It receives an
//! explicitly constructed `Arc<dyn CalendarSyncClient>` so tests and deployments
//! without calendar credentials can plug in another implementation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

use crate::models::{Booking, CalendarOccupancy};

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Failures reported by a calendar provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Network, auth or timeout failure. Worth retrying later.
    #[error("Calendar provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// The provider refused the request as malformed.
    #[error("Calendar provider rejected the request: {0}")]
    ProviderRejected(String),
}

/// A reminder the provider should fire before the appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    /// `email` or `popup`.
    pub method: String,
    pub minutes_before: i32,
}

/// Everything the provider needs to create the event for one booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEventRequest {
    pub booking_id: String,
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// IANA name sent alongside the instants, e.g. `America/Puerto_Rico`.
    pub time_zone: String,
    pub reminders: Vec<Reminder>,
}

impl CalendarEventRequest {
    /// Builds the event for `booking`, which occupies `[start, end)`.
    pub fn for_booking(
        booking: &Booking,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        time_zone: &str,
        reminders: Vec<Reminder>,
    ) -> Self {
        let notes = if booking.notes.trim().is_empty() {
            "No additional notes"
        } else {
            booking.notes.trim()
        };
        let description = format!(
            "Client: {}\nEmail: {}\nPhone: {}\nService: {}\nNotes: {}\nBooking ID: {}",
            booking.client_name,
            booking.email,
            booking.phone,
            booking.service.label(),
            notes,
            booking.id
        );

        Self {
            booking_id: booking.id.clone(),
            title: format!("{} - {}", booking.service.label(), booking.client_name),
            description,
            start,
            end,
            time_zone: time_zone.to_string(),
            reminders,
        }
    }
}

/// Capability interface to the external calendar.
///
/// None of these calls are transactional with the local booking store.
pub trait CalendarSyncClient: Send + Sync {
    /// Creates the event and returns the provider's event id.
    fn create_event(&self, event: CalendarEventRequest) -> BoxFuture<'_, String, SyncError>;

    /// Lists busy intervals in `[start, end)`.
    fn list_occupancy(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<CalendarOccupancy>, SyncError>;

    /// Looks up an event previously created for `booking_id`.
    fn find_event_for_booking(&self, booking_id: &str)
        -> BoxFuture<'_, Option<String>, SyncError>;

    /// Marks the provider event as cancelled.
    fn cancel_event(&self, event_id: &str) -> BoxFuture<'_, (), SyncError>;
}

/// Stand-in used when no calendar provider is configured.
///
/// Reads see an empty calendar; writes fail as unavailable so bookings stay
/// queued for the reconciliation sweep until a provider is configured.
#[derive(Debug, Default, Clone)]
pub struct DisabledCalendarSync;

impl CalendarSyncClient for DisabledCalendarSync {
    fn create_event(&self, _event: CalendarEventRequest) -> BoxFuture<'_, String, SyncError> {
        Box::pin(async {
            Err(SyncError::ProviderUnavailable(
                "calendar sync is disabled".to_string(),
            ))
        })
    }

    fn list_occupancy(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<CalendarOccupancy>, SyncError> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn find_event_for_booking(
        &self,
        _booking_id: &str,
    ) -> BoxFuture<'_, Option<String>, SyncError> {
        Box::pin(async { Ok(None) })
    }

    fn cancel_event(&self, _event_id: &str) -> BoxFuture<'_, (), SyncError> {
        Box::pin(async {
            Err(SyncError::ProviderUnavailable(
                "calendar sync is disabled".to_string(),
            ))
        })
    }
}
