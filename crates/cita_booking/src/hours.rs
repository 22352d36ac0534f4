// --- File: crates/cita_booking/src/hours.rs ---
//! Business hours and the daily slot grid derived from them.

use crate::error::{BookingError, NormalizeError};
use crate::normalizer::TimeNormalizer;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use cita_common::models::{slot_duration, TimeSlot};
use cita_config::ScheduleConfig;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct BusinessHours {
    normalizer: TimeNormalizer,
    open: NaiveTime,
    close: NaiveTime,
    working_days: Vec<Weekday>,
}

impl BusinessHours {
    /// Validates the schedule section of the configuration.
    pub fn from_config(config: &ScheduleConfig) -> Result<Self, BookingError> {
        let tz: Tz = config.time_zone.parse().map_err(|_| {
            BookingError::InvalidSchedule(format!("unknown time zone '{}'", config.time_zone))
        })?;
        let open = parse_clock(&config.work_start_time, "work_start_time")?;
        let close = parse_clock(&config.work_end_time, "work_end_time")?;

        let working_days = config
            .working_days
            .iter()
            .map(|day| {
                day.parse::<Weekday>().map_err(|_| {
                    BookingError::InvalidSchedule(format!("unknown working day '{}'", day))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(TimeNormalizer::new(tz), open, close, working_days)
    }

    pub fn new(
        normalizer: TimeNormalizer,
        open: NaiveTime,
        close: NaiveTime,
        working_days: Vec<Weekday>,
    ) -> Result<Self, BookingError> {
        if close <= open {
            return Err(BookingError::InvalidSchedule(format!(
                "business hours end at {} before they start at {}",
                close, open
            )));
        }
        debug!(
            "Business hours {}-{} on {:?} in {}",
            open,
            close,
            working_days,
            normalizer.time_zone().name()
        );
        Ok(Self {
            normalizer,
            open,
            close,
            working_days,
        })
    }

    pub fn normalizer(&self) -> &TimeNormalizer {
        &self.normalizer
    }

    pub fn time_zone(&self) -> Tz {
        self.normalizer.time_zone()
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.working_days.contains(&date.weekday())
    }

    /// Every slot offered on `date` before anything is booked, ascending.
    pub fn grid(&self, date: NaiveDate) -> Vec<TimeSlot> {
        if !self.is_working_day(date) {
            return Vec::new();
        }

        let mut slots = Vec::new();
        let mut start = self.open;
        loop {
            let (end, wrapped) = start.overflowing_add_signed(slot_duration());
            if wrapped != 0 || end > self.close {
                break;
            }
            slots.push(TimeSlot::new(date, start));
            if end == self.close {
                break;
            }
            start = end;
        }
        slots
    }

    /// Whether `slot` is one of the grid slots of its date.
    pub fn is_on_grid(&self, slot: &TimeSlot) -> bool {
        self.grid(slot.date).contains(slot)
    }

    /// `[start, end)` of `slot` as instants.
    pub fn slot_bounds(
        &self,
        slot: &TimeSlot,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), NormalizeError> {
        let start = self.normalizer.to_instant(slot.date, slot.start)?;
        Ok((start, start + slot_duration()))
    }

    /// From opening on `first` to closing on `last`, as instants.
    pub fn window(
        &self,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), NormalizeError> {
        Ok((
            self.normalizer.to_instant(first, self.open)?,
            self.normalizer.to_instant(last, self.close)?,
        ))
    }
}

fn parse_clock(raw: &str, key: &str) -> Result<NaiveTime, BookingError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|_| {
        BookingError::InvalidSchedule(format!("{} '{}' is not HH:MM", key, raw))
    })
}
