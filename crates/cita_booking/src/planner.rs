// --- File: crates/cita_booking/src/planner.rs ---
use crate::hours::BusinessHours;
use chrono::{DateTime, NaiveDate, Utc};
use cita_common::models::TimeSlot;
use std::collections::BTreeSet;

/// Produces the offerable slots of a day.
///
/// Never reads the clock: "now" is always supplied by the caller.
pub struct SlotPlanner<'a> {
    hours: &'a BusinessHours,
}

impl<'a> SlotPlanner<'a> {
    pub fn new(hours: &'a BusinessHours) -> Self {
        Self { hours }
    }

    /// Grid slots of `date` that are not occupied and not over yet, ascending.
    ///
    /// A slot that has started but not ended is still offered.
    pub fn available_slots(
        &self,
        date: NaiveDate,
        occupied: &BTreeSet<TimeSlot>,
        now: DateTime<Utc>,
    ) -> Vec<TimeSlot> {
        self.hours
            .grid(date)
            .into_iter()
            .filter(|slot| !occupied.contains(slot))
            .filter(|slot| !self.is_over(slot, now))
            .collect()
    }

    /// Whether a client may request `slot` at `now`, ignoring occupancy.
    pub fn is_offered(&self, slot: &TimeSlot, now: DateTime<Utc>) -> bool {
        self.hours.is_on_grid(slot) && !self.is_over(slot, now)
    }

    fn is_over(&self, slot: &TimeSlot, now: DateTime<Utc>) -> bool {
        match self.hours.slot_bounds(slot) {
            Ok((_, end)) => end <= now,
            Err(_) => true,
        }
    }
}
