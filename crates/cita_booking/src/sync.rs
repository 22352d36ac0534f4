// --- File: crates/cita_booking/src/sync.rs ---
//! Pushes confirmed bookings to the external calendar and takes cancelled ones
//! back out of it.
//!
//! Shared by the coordinator (first attempt, right after the reservation or the
//! cancellation) and by the reconciliation sweep (every later attempt). Provider
//! failures never escape from here: they are recorded on the booking and logged.

use crate::hours::BusinessHours;
use chrono::{DateTime, Utc};
use cita_common::models::{Booking, CalendarOccupancy, SyncState};
use cita_common::services::{CalendarEventRequest, CalendarSyncClient, Reminder, SyncError};
use cita_config::SyncConfig;
use cita_db::BookingStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How events are created: timeout, time zone label and reminders.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPolicy {
    pub timeout: Duration,
    pub time_zone: String,
    pub reminders: Vec<Reminder>,
}

impl EventPolicy {
    pub fn from_config(config: &SyncConfig, time_zone: &str) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            time_zone: time_zone.to_string(),
            reminders: vec![
                Reminder {
                    method: "email".to_string(),
                    minutes_before: config.email_reminder_minutes,
                },
                Reminder {
                    method: "popup".to_string(),
                    minutes_before: config.popup_reminder_minutes,
                },
            ],
        }
    }
}

#[derive(Clone)]
pub struct EventSync {
    store: Arc<dyn BookingStore>,
    calendar: Arc<dyn CalendarSyncClient>,
    hours: Arc<BusinessHours>,
    policy: EventPolicy,
}

impl EventSync {
    pub fn new(
        store: Arc<dyn BookingStore>,
        calendar: Arc<dyn CalendarSyncClient>,
        hours: Arc<BusinessHours>,
        policy: EventPolicy,
    ) -> Self {
        Self {
            store,
            calendar,
            hours,
            policy,
        }
    }

    pub fn store(&self) -> &Arc<dyn BookingStore> {
        &self.store
    }

    pub fn hours(&self) -> &BusinessHours {
        &self.hours
    }

    /// Runs a provider call under the sync timeout; running out of time counts
    /// as the provider being unavailable.
    async fn bounded<T>(
        &self,
        what: &str,
        call: impl Future<Output = Result<T, SyncError>>,
    ) -> Result<T, SyncError> {
        match tokio::time::timeout(self.policy.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::ProviderUnavailable(format!(
                "{} timed out after {:?}",
                what, self.policy.timeout
            ))),
        }
    }

    pub async fn list_occupancy(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<CalendarOccupancy>, SyncError> {
        self.bounded("listing calendar events", self.calendar.list_occupancy(start, end))
            .await
    }

    /// Cancels the provider event of a cancelled booking and records the outcome.
    ///
    /// A booking with no linked event is looked up by id first, since a create
    /// that timed out may still have reached the provider.
    pub async fn release(&self, booking: Booking) -> Booking {
        let event_id = match booking.provider_event_id.clone() {
            Some(event_id) => Ok(Some(event_id)),
            None => {
                self.bounded(
                    "looking up calendar event",
                    self.calendar.find_event_for_booking(&booking.id),
                )
                .await
            }
        };

        let released = match event_id {
            Ok(Some(event_id)) => self
                .bounded("cancelling calendar event", self.calendar.cancel_event(&event_id))
                .await
                .map(|()| Some(event_id)),
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };

        let stored = match released {
            Ok(Some(event_id)) => {
                info!("Calendar event {} of booking {} cancelled", event_id, booking.id);
                self.store.mark_released(&booking.id).await
            }
            Ok(None) => {
                debug!("Booking {} has no calendar event to cancel", booking.id);
                self.store.mark_released(&booking.id).await
            }
            Err(e) => {
                warn!("Could not cancel calendar event of booking {}: {}", booking.id, e);
                self.store.mark_release_failed(&booking.id).await
            }
        };

        match stored {
            Ok(updated) => updated,
            Err(e) => {
                error!("Could not record release of booking {}: {}", booking.id, e);
                booking
            }
        }
    }

    fn event_for(&self, booking: &Booking) -> Result<CalendarEventRequest, SyncError> {
        let (start, end) = self
            .hours
            .slot_bounds(&booking.slot())
            .map_err(|e| SyncError::ProviderRejected(e.to_string()))?;
        Ok(CalendarEventRequest::for_booking(
            booking,
            start,
            end,
            &self.policy.time_zone,
            self.policy.reminders.clone(),
        ))
    }

    /// Creates the provider event for a booking that has none yet and records
    /// the outcome. Returns the booking as stored afterwards.
    pub async fn push(&self, booking: Booking) -> Booking {
        let created = match self.event_for(&booking) {
            Ok(event) => self.bounded("creating calendar event", self.calendar.create_event(event)).await,
            Err(e) => Err(e),
        };
        self.record(booking, created).await
    }

    /// Links an event left behind by an earlier attempt, or creates one.
    pub async fn reconcile(&self, booking: Booking) -> Booking {
        let found = self
            .bounded(
                "looking up calendar event",
                self.calendar.find_event_for_booking(&booking.id),
            )
            .await;

        match found {
            Ok(Some(event_id)) => {
                info!(
                    "Booking {} already has calendar event {}, linking it",
                    booking.id, event_id
                );
                self.record(booking, Ok(event_id)).await
            }
            Ok(None) => self.push(booking).await,
            Err(e) => self.record(booking, Err(e)).await,
        }
    }

    async fn record(&self, booking: Booking, created: Result<String, SyncError>) -> Booking {
        match created {
            Ok(event_id) => match self.store.mark_synced(&booking.id, &event_id).await {
                Ok(synced) if synced.sync_state == SyncState::ReleasePending => {
                    info!(
                        "Booking {} was cancelled while its event {} was created",
                        synced.id, event_id
                    );
                    self.release(synced).await
                }
                Ok(synced) => {
                    debug!("Booking {} synced as {}", synced.id, event_id);
                    synced
                }
                Err(e) => {
                    error!("Could not record sync of booking {}: {}", booking.id, e);
                    booking
                }
            },
            Err(e) => {
                warn!("Calendar sync failed for booking {}: {}", booking.id, e);
                match self.store.mark_sync_failed(&booking.id).await {
                    Ok(failed) => failed,
                    Err(store_err) => {
                        error!(
                            "Could not record failed sync of booking {}: {}",
                            booking.id, store_err
                        );
                        booking
                    }
                }
            }
        }
    }
}
