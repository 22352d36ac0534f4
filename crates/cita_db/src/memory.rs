//! In-memory booking store
//!
//! Used when no database is configured and in tests. All state lives behind one
//! mutex, so `append` checks and inserts inside a single critical section.

use crate::error::{DbError, StoreError};
use crate::store::BookingStore;
use chrono::{NaiveDate, Utc};
use cita_common::models::{Booking, BookingStatus, NewBooking, SyncState};
use cita_common::services::BoxFuture;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct InMemoryBookingStore {
    bookings: Mutex<HashMap<String, Booking>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Booking>>, StoreError> {
        self.bookings
            .lock()
            .map_err(|_| StoreError::Backend(DbError::Other("booking map poisoned".to_string())))
    }

    fn append_now(&self, new: NewBooking) -> Result<Booking, StoreError> {
        let mut bookings = self.lock()?;

        let taken = bookings.values().any(|b| {
            b.is_confirmed() && b.date == new.date && b.start_time == new.start_time
        });
        if taken {
            debug!("Slot {} {} already booked", new.date, new.start_time);
            return Err(StoreError::SlotConflict {
                date: new.date,
                start_time: new.start_time,
            });
        }

        let booking = Booking::from_new(Booking::generate_id(), new, Utc::now());
        bookings.insert(booking.id.clone(), booking.clone());
        info!("Booking {} stored for {}", booking.id, booking.slot());
        Ok(booking)
    }

    fn get_now(&self, id: &str) -> Result<Option<Booking>, StoreError> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn mark_synced_now(&self, id: &str, provider_event_id: &str) -> Result<Booking, StoreError> {
        let mut bookings = self.lock()?;
        let booking = bookings
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        match booking.provider_event_id.as_deref() {
            Some(recorded) if recorded == provider_event_id => {}
            Some(recorded) => {
                return Err(StoreError::SyncIdentityMismatch {
                    id: id.to_string(),
                    recorded: recorded.to_string(),
                    attempted: provider_event_id.to_string(),
                })
            }
            None => {
                booking.provider_event_id = Some(provider_event_id.to_string());
                booking.sync_state = if booking.is_confirmed() {
                    SyncState::Synced
                } else {
                    SyncState::ReleasePending
                };
                booking.last_sync_attempt_at = Some(Utc::now());
            }
        }
        Ok(booking.clone())
    }

    fn mark_sync_failed_now(&self, id: &str) -> Result<Booking, StoreError> {
        let mut bookings = self.lock()?;
        let booking = bookings
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if booking.is_confirmed() && booking.sync_state != SyncState::Synced {
            booking.sync_state = SyncState::SyncFailed;
            booking.sync_attempts += 1;
            booking.last_sync_attempt_at = Some(Utc::now());
        }
        Ok(booking.clone())
    }

    fn cancel_now(&self, id: &str) -> Result<Booking, StoreError> {
        let mut bookings = self.lock()?;
        match bookings.get_mut(id) {
            Some(booking) if booking.is_confirmed() => {
                booking.status = BookingStatus::Cancelled;
                booking.sync_state = SyncState::ReleasePending;
                booking.sync_attempts = 0;
                booking.last_sync_attempt_at = Some(Utc::now());
                info!("Booking {} cancelled", id);
                Ok(booking.clone())
            }
            _ => Err(StoreError::NotFound(id.to_string())),
        }
    }

    fn cancelled_mut<'a>(
        bookings: &'a mut HashMap<String, Booking>,
        id: &str,
    ) -> Result<&'a mut Booking, StoreError> {
        match bookings.get_mut(id) {
            Some(booking) if booking.status == BookingStatus::Cancelled => Ok(booking),
            _ => Err(StoreError::NotFound(id.to_string())),
        }
    }

    fn mark_released_now(&self, id: &str) -> Result<Booking, StoreError> {
        let mut bookings = self.lock()?;
        let booking = Self::cancelled_mut(&mut bookings, id)?;
        booking.sync_state = SyncState::Released;
        booking.last_sync_attempt_at = Some(Utc::now());
        Ok(booking.clone())
    }

    fn mark_release_failed_now(&self, id: &str) -> Result<Booking, StoreError> {
        let mut bookings = self.lock()?;
        let booking = Self::cancelled_mut(&mut bookings, id)?;
        booking.sync_state = SyncState::ReleasePending;
        booking.sync_attempts += 1;
        booking.last_sync_attempt_at = Some(Utc::now());
        Ok(booking.clone())
    }

    fn list_by_date_now(&self, date: NaiveDate) -> Result<Vec<Booking>, StoreError> {
        let mut day: Vec<Booking> = self
            .lock()?
            .values()
            .filter(|b| b.is_confirmed() && b.date == date)
            .cloned()
            .collect();
        day.sort_by_key(|b| b.start_time);
        Ok(day)
    }

    fn list_unsynced_now(&self) -> Result<Vec<Booking>, StoreError> {
        let mut unsynced: Vec<Booking> = self
            .lock()?
            .values()
            .filter(|b| b.is_confirmed() && b.sync_state != SyncState::Synced)
            .cloned()
            .collect();
        unsynced.sort_by_key(|b| b.created_at);
        Ok(unsynced)
    }

    fn list_pending_release_now(&self) -> Result<Vec<Booking>, StoreError> {
        let mut pending: Vec<Booking> = self
            .lock()?
            .values()
            .filter(|b| {
                b.status == BookingStatus::Cancelled && b.sync_state == SyncState::ReleasePending
            })
            .cloned()
            .collect();
        pending.sort_by_key(|b| b.created_at);
        Ok(pending)
    }
}

impl BookingStore for InMemoryBookingStore {
    fn append(&self, booking: NewBooking) -> BoxFuture<'_, Booking, StoreError> {
        let result = self.append_now(booking);
        Box::pin(async move { result })
    }

    fn get(&self, id: &str) -> BoxFuture<'_, Option<Booking>, StoreError> {
        let result = self.get_now(id);
        Box::pin(async move { result })
    }

    fn mark_synced(&self, id: &str, provider_event_id: &str) -> BoxFuture<'_, Booking, StoreError> {
        let result = self.mark_synced_now(id, provider_event_id);
        Box::pin(async move { result })
    }

    fn mark_sync_failed(&self, id: &str) -> BoxFuture<'_, Booking, StoreError> {
        let result = self.mark_sync_failed_now(id);
        Box::pin(async move { result })
    }

    fn cancel(&self, id: &str) -> BoxFuture<'_, Booking, StoreError> {
        let result = self.cancel_now(id);
        Box::pin(async move { result })
    }

    fn mark_released(&self, id: &str) -> BoxFuture<'_, Booking, StoreError> {
        let result = self.mark_released_now(id);
        Box::pin(async move { result })
    }

    fn mark_release_failed(&self, id: &str) -> BoxFuture<'_, Booking, StoreError> {
        let result = self.mark_release_failed_now(id);
        Box::pin(async move { result })
    }

    fn list_by_date(&self, date: NaiveDate) -> BoxFuture<'_, Vec<Booking>, StoreError> {
        let result = self.list_by_date_now(date);
        Box::pin(async move { result })
    }

    fn list_unsynced(&self) -> BoxFuture<'_, Vec<Booking>, StoreError> {
        let result = self.list_unsynced_now();
        Box::pin(async move { result })
    }

    fn list_pending_release(&self) -> BoxFuture<'_, Vec<Booking>, StoreError> {
        let result = self.list_pending_release_now();
        Box::pin(async move { result })
    }
}
