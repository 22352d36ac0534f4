//! The booking store contract
//!
//! `append` is the single place where the no-double-booking rule is enforced:
//! implementations must check and insert atomically, so that of two concurrent
//! appends for the same slot exactly one fails with [`StoreError::SlotConflict`].
//! Every other mutation can only release occupancy, never add it.
//!
//! A cancelled booking keeps tracking its provider event: it is
//! `release_pending` until the event is known to be gone, then `released`.

use crate::error::StoreError;
use chrono::NaiveDate;
use cita_common::models::{Booking, NewBooking};
use cita_common::services::BoxFuture;

/// Durable owner of all bookings.
pub trait BookingStore: Send + Sync {
    /// Stores a new confirmed booking and returns it with its assigned id.
    ///
    /// Fails with `SlotConflict` if a confirmed booking already holds the slot.
    fn append(&self, booking: NewBooking) -> BoxFuture<'_, Booking, StoreError>;

    /// Fetches a booking by id, whatever its status.
    fn get(&self, id: &str) -> BoxFuture<'_, Option<Booking>, StoreError>;

    /// Links the booking to its provider event.
    ///
    /// Idempotent for the same event id; fails with `SyncIdentityMismatch` when a
    /// different event id is already recorded. Linking a booking that was
    /// cancelled meanwhile leaves it `release_pending`.
    fn mark_synced(&self, id: &str, provider_event_id: &str) -> BoxFuture<'_, Booking, StoreError>;

    /// Records a failed sync attempt. The reservation itself is untouched, a
    /// booking that is already synced stays synced and a cancelled one is left
    /// alone.
    fn mark_sync_failed(&self, id: &str) -> BoxFuture<'_, Booking, StoreError>;

    /// Flips a confirmed booking to cancelled and `release_pending`, restarting
    /// the attempt count for the remote release.
    ///
    /// Fails with `NotFound` if there is no such booking or it is already cancelled.
    fn cancel(&self, id: &str) -> BoxFuture<'_, Booking, StoreError>;

    /// Records that the cancelled booking holds nothing in the external calendar.
    ///
    /// Fails with `NotFound` unless the booking is cancelled.
    fn mark_released(&self, id: &str) -> BoxFuture<'_, Booking, StoreError>;

    /// Records a failed attempt to cancel the provider event of a cancelled
    /// booking; it stays `release_pending`.
    ///
    /// Fails with `NotFound` unless the booking is cancelled.
    fn mark_release_failed(&self, id: &str) -> BoxFuture<'_, Booking, StoreError>;

    /// Confirmed bookings on `date`, ordered by start time.
    fn list_by_date(&self, date: NaiveDate) -> BoxFuture<'_, Vec<Booking>, StoreError>;

    /// Confirmed bookings that are not synced yet, oldest first.
    fn list_unsynced(&self) -> BoxFuture<'_, Vec<Booking>, StoreError>;

    /// Cancelled bookings whose provider event may still be live, oldest first.
    fn list_pending_release(&self) -> BoxFuture<'_, Vec<Booking>, StoreError>;
}
