// --- File: crates/cita_booking/src/coordinator.rs ---
//! The booking protocol.
//!
//! `Normalizing -> ConflictChecking -> Reserving -> Syncing -> {Confirmed, SyncPendingRetry}`
//!
//! The advisory conflict check in `ConflictChecking` may suspend on the calendar
//! read and is racy by nature; [`BookingStore::append`] is the real decision.
//! Once the reservation is stored the booking is confirmed whatever the calendar
//! says: sync failures are recorded and left to the reconciliation sweep.

use crate::availability::AvailabilityIndex;
use crate::error::BookingError;
use crate::hours::BusinessHours;
use crate::planner::SlotPlanner;
use crate::request::CreateBookingRequest;
use crate::sync::{EventPolicy, EventSync};
use chrono::{DateTime, NaiveDate, Utc};
use cita_common::models::{Booking, CalendarOccupancy, SyncState, TimeSlot};
use cita_common::services::CalendarSyncClient;
use cita_config::AppConfig;
use cita_db::BookingStore;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Where a create-booking attempt is, or where it ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingPhase {
    Normalizing,
    ConflictChecking,
    Reserving,
    Syncing,
    Confirmed,
    SyncPendingRetry,
}

impl fmt::Display for BookingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookingPhase::Normalizing => "normalizing",
            BookingPhase::ConflictChecking => "conflict_checking",
            BookingPhase::Reserving => "reserving",
            BookingPhase::Syncing => "syncing",
            BookingPhase::Confirmed => "confirmed",
            BookingPhase::SyncPendingRetry => "sync_pending_retry",
        };
        f.write_str(name)
    }
}

/// A stored booking and the terminal phase of its creation.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingOutcome {
    pub booking: Booking,
    pub phase: BookingPhase,
}

impl BookingOutcome {
    pub fn pending_sync(&self) -> bool {
        self.phase == BookingPhase::SyncPendingRetry
    }
}

/// Offerable slots of one day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub slots: Vec<TimeSlot>,
    /// False when the external calendar could not be read and only local
    /// bookings were taken into account.
    pub calendar_checked: bool,
}

pub struct BookingCoordinator {
    sync: EventSync,
    max_range_days: u32,
}

impl BookingCoordinator {
    pub fn new(
        store: Arc<dyn BookingStore>,
        calendar: Arc<dyn CalendarSyncClient>,
        hours: Arc<BusinessHours>,
        policy: EventPolicy,
        max_range_days: u32,
    ) -> Self {
        Self {
            sync: EventSync::new(store, calendar, hours, policy),
            max_range_days,
        }
    }

    /// Wires the coordinator from the `schedule`, `sync` and `gcal` sections.
    pub fn from_config(
        store: Arc<dyn BookingStore>,
        calendar: Arc<dyn CalendarSyncClient>,
        config: &AppConfig,
    ) -> Result<Self, BookingError> {
        let hours = BusinessHours::from_config(&config.schedule)?;
        let event_time_zone = config
            .gcal
            .as_ref()
            .and_then(|g| g.time_zone.clone())
            .unwrap_or_else(|| config.schedule.time_zone.clone());
        let policy = EventPolicy::from_config(&config.sync, &event_time_zone);
        Ok(Self::new(
            store,
            calendar,
            Arc::new(hours),
            policy,
            config.schedule.max_range_days,
        ))
    }

    pub fn hours(&self) -> &BusinessHours {
        self.sync.hours()
    }

    /// The calendar sync used by this coordinator, for the reconciliation sweep.
    pub fn event_sync(&self) -> EventSync {
        self.sync.clone()
    }

    fn store(&self) -> &Arc<dyn BookingStore> {
        self.sync.store()
    }

    /// Runs the full create protocol for one request.
    pub async fn create_booking(
        &self,
        request: &CreateBookingRequest,
        now: DateTime<Utc>,
    ) -> Result<BookingOutcome, BookingError> {
        debug!(phase = %BookingPhase::Normalizing, "Booking {} {}", request.date, request.time);
        let validated = request.validate()?;
        let starts_at = self
            .hours()
            .normalizer()
            .to_instant(validated.date, validated.start_time)?;
        let slot = TimeSlot::new(validated.date, validated.start_time);
        debug!("Requested slot {} starts at {}", slot, starts_at);
        let planner = SlotPlanner::new(self.hours());
        if !planner.is_offered(&slot, now) {
            info!("Rejected request for {}: not an offered slot", slot);
            return Err(BookingError::SlotNotOffered(format!(
                "{} is not an available appointment time",
                slot
            )));
        }

        debug!(phase = %BookingPhase::ConflictChecking, "Checking {}", slot);
        let external = self
            .external_occupancy(slot.date, slot.date)
            .await?
            .unwrap_or_default();
        if self.occupied_on(slot.date, &external).await?.contains(&slot) {
            info!("Slot {} is taken", slot);
            return Err(BookingError::SlotConflict {
                date: slot.date,
                start_time: slot.start,
            });
        }

        debug!(phase = %BookingPhase::Reserving, "Reserving {}", slot);
        let booking = self.store().append(validated.booking).await.map_err(|e| {
            let err = BookingError::from(e);
            if matches!(err, BookingError::SlotConflict { .. }) {
                info!("Slot {} was taken by a concurrent request", slot);
            }
            err
        })?;

        debug!(phase = %BookingPhase::Syncing, "Syncing booking {}", booking.id);
        // Detached so a dropped request cannot stop the sync halfway.
        let sync = self.sync.clone();
        let reserved = booking.clone();
        let booking = match tokio::spawn(async move { sync.push(reserved).await }).await {
            Ok(updated) => updated,
            Err(e) => {
                error!("Sync task for booking {} failed: {}", booking.id, e);
                booking
            }
        };

        let phase = if booking.sync_state == SyncState::Synced {
            BookingPhase::Confirmed
        } else {
            BookingPhase::SyncPendingRetry
        };
        info!(phase = %phase, "Booking {} confirmed for {}", booking.id, slot);
        Ok(BookingOutcome { booking, phase })
    }

    /// Offerable slots of `date` as of `now`.
    pub async fn availability(
        &self,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<DayAvailability, BookingError> {
        let mut days = self.availability_range(date, date, now).await?;
        Ok(days.pop().unwrap_or(DayAvailability {
            date,
            slots: Vec::new(),
            calendar_checked: true,
        }))
    }

    /// Offerable slots of every day in `[start, end]`, one entry per day.
    pub async fn availability_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<DayAvailability>, BookingError> {
        if end < start {
            return Err(BookingError::MalformedInput(
                "end_date must not be before start_date".to_string(),
            ));
        }
        let span = (end - start).num_days() + 1;
        if span > i64::from(self.max_range_days) {
            return Err(BookingError::MalformedInput(format!(
                "date range spans {} days, at most {} allowed",
                span, self.max_range_days
            )));
        }

        let external = self.external_occupancy(start, end).await?;
        let calendar_checked = external.is_some();
        let external = external.unwrap_or_default();

        let planner = SlotPlanner::new(self.hours());
        let mut days = Vec::new();
        for date in start.iter_days().take_while(|d| *d <= end) {
            let occupied = self.occupied_on(date, &external).await?;
            days.push(DayAvailability {
                date,
                slots: planner.available_slots(date, &occupied, now),
                calendar_checked,
            });
        }
        Ok(days)
    }

    /// Confirmed bookings of `date`, by start time.
    pub async fn list_bookings(&self, date: NaiveDate) -> Result<Vec<Booking>, BookingError> {
        Ok(self.store().list_by_date(date).await?)
    }

    /// Cancels locally, then takes the booking's event out of the calendar.
    ///
    /// The local cancellation is what frees the slot for local bookings. A
    /// calendar that cannot be reached leaves the booking `release_pending`
    /// for the sweep, and the result still reports the cancellation.
    pub async fn cancel_booking(&self, id: &str) -> Result<Booking, BookingError> {
        let cancelled = self.store().cancel(id).await?;
        info!("Booking {} cancelled, {} is free again", id, cancelled.slot());

        // Detached for the same reason as the create sync.
        let sync = self.sync.clone();
        let pending = cancelled.clone();
        match tokio::spawn(async move { sync.release(pending).await }).await {
            Ok(released) => Ok(released),
            Err(e) => {
                warn!("Calendar release task for {} failed: {}", id, e);
                Ok(cancelled)
            }
        }
    }

    async fn occupied_on(
        &self,
        date: NaiveDate,
        external: &[CalendarOccupancy],
    ) -> Result<BTreeSet<TimeSlot>, BookingError> {
        let local = self.store().list_by_date(date).await?;
        Ok(AvailabilityIndex::new(self.hours()).occupied_slots(date, &local, external))
    }

    /// External busy intervals over the business hours of the range, or `None`
    /// when the calendar could not be read.
    async fn external_occupancy(
        &self,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<Option<Vec<CalendarOccupancy>>, BookingError> {
        let (window_start, window_end) = self.hours().window(first, last)?;
        match self.sync.list_occupancy(window_start, window_end).await {
            Ok(events) => Ok(Some(events)),
            Err(e) => {
                warn!(
                    "Calendar unavailable for {} to {}, using local bookings only: {}",
                    first, last, e
                );
                Ok(None)
            }
        }
    }
}
