// --- File: crates/cita_booking/src/availability.rs ---
//! Merges the two sources of occupancy into one set of taken slots.
//!
//! Local bookings are always grid-aligned and block exactly their own slot.
//! External intervals are arbitrary: one blocks every grid slot it intersects,
//! however briefly, using half-open `[start, end)` comparison.

use crate::hours::BusinessHours;
use chrono::NaiveDate;
use cita_common::models::{Booking, CalendarOccupancy, TimeSlot};
use std::collections::BTreeSet;
use tracing::warn;

pub struct AvailabilityIndex<'a> {
    hours: &'a BusinessHours,
}

impl<'a> AvailabilityIndex<'a> {
    pub fn new(hours: &'a BusinessHours) -> Self {
        Self { hours }
    }

    /// Slots of `date` that are taken by a confirmed local booking or overlapped
    /// by an external event.
    pub fn occupied_slots(
        &self,
        date: NaiveDate,
        local: &[Booking],
        external: &[CalendarOccupancy],
    ) -> BTreeSet<TimeSlot> {
        let mut occupied: BTreeSet<TimeSlot> = local
            .iter()
            .filter(|b| b.is_confirmed() && b.date == date)
            .map(Booking::slot)
            .collect();

        for slot in self.hours.grid(date) {
            let (start, end) = match self.hours.slot_bounds(&slot) {
                Ok(bounds) => bounds,
                Err(e) => {
                    // treat an unrepresentable slot as taken
                    warn!("Slot {} has no instant: {}", slot, e);
                    occupied.insert(slot);
                    continue;
                }
            };
            if external.iter().any(|event| event.overlaps(start, end)) {
                occupied.insert(slot);
            }
        }

        occupied
    }
}
