// --- File: crates/cita_booking/src/normalizer.rs ---
//! Turns the `YYYY-MM-DD` + `H:MM AM/PM` strings of a booking request into an
//! absolute instant in the business time zone.
//!
//! Conflict checks compare instants, never strings, so local bookings and
//! provider events expressed in different notations line up.

use crate::error::NormalizeError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeNormalizer {
    tz: Tz,
}

impl TimeNormalizer {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn time_zone(&self) -> Tz {
        self.tz
    }

    /// Parses both strings and resolves them to an instant.
    pub fn normalize(&self, date: &str, time: &str) -> Result<DateTime<Utc>, NormalizeError> {
        let date = parse_date(date)?;
        let time = parse_time12(time)?;
        self.to_instant(date, time)
    }

    /// Instant of the business-local wall clock `date time`.
    pub fn to_instant(
        &self,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<DateTime<Utc>, NormalizeError> {
        self.tz
            .from_local_datetime(&date.and_time(time))
            .single()
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| {
                NormalizeError::MalformedInput(format!(
                    "{} {} does not exist in {}",
                    date,
                    time,
                    self.tz.name()
                ))
            })
    }

    /// Business-local wall clock of `instant`.
    pub fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.tz).naive_local()
    }
}

/// Parses a `YYYY-MM-DD` civil date. Impossible dates such as Feb 30 fail.
pub fn parse_date(raw: &str) -> Result<NaiveDate, NormalizeError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        NormalizeError::MalformedInput(format!("Invalid date '{}', expected YYYY-MM-DD", raw))
    })
}

/// Parses a 12-hour `H:MM AM` / `HH:MM PM` clock time.
///
/// The period is case-insensitive and the space before it optional.
pub fn parse_time12(raw: &str) -> Result<NaiveTime, NormalizeError> {
    let malformed = || {
        NormalizeError::MalformedInput(format!("Invalid time '{}', expected H:MM AM/PM", raw))
    };

    let upper = raw.trim().to_ascii_uppercase();
    let (clock, pm) = match (upper.strip_suffix("AM"), upper.strip_suffix("PM")) {
        (Some(clock), _) => (clock, false),
        (_, Some(clock)) => (clock, true),
        _ => return Err(malformed()),
    };

    let (hour, minute) = clock.trim_end().split_once(':').ok_or_else(malformed)?;
    let is_digits = |s: &str, lengths: std::ops::RangeInclusive<usize>| {
        lengths.contains(&s.len()) && s.chars().all(|c| c.is_ascii_digit())
    };
    if !is_digits(hour, 1..=2) || !is_digits(minute, 2..=2) {
        return Err(malformed());
    }

    let hour: u32 = hour.parse().map_err(|_| malformed())?;
    let minute: u32 = minute.parse().map_err(|_| malformed())?;
    if !(1..=12).contains(&hour) || minute > 59 {
        return Err(malformed());
    }

    let hour24 = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };
    NaiveTime::from_hms_opt(hour24, minute, 0).ok_or_else(malformed)
}
