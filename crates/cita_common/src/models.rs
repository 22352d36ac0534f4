// --- File: crates/cita_common/src/models.rs ---

// Domain data shared by the store, the calendar integration and the booking engine.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Every offerable appointment lasts one hour.
pub const SLOT_DURATION_MINUTES: i64 = 60;

/// Length of an appointment slot.
pub fn slot_duration() -> Duration {
    Duration::minutes(SLOT_DURATION_MINUTES)
}

/// The fixed catalog of services a client can book.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    #[serde(alias = "Preparación de Impuestos")]
    TaxPreparation,
    #[serde(alias = "Contabilidad")]
    Accounting,
    #[serde(alias = "Planificación Financiera")]
    FinancialPlanning,
    #[serde(alias = "Consultoría Empresarial")]
    BusinessConsulting,
    #[serde(alias = "Servicios de Auditoría")]
    AuditServices,
    #[serde(alias = "Servicios de Nómina")]
    PayrollServices,
    #[serde(alias = "Otro")]
    Other,
}

impl ServiceCategory {
    pub const ALL: [ServiceCategory; 7] = [
        ServiceCategory::TaxPreparation,
        ServiceCategory::Accounting,
        ServiceCategory::FinancialPlanning,
        ServiceCategory::BusinessConsulting,
        ServiceCategory::AuditServices,
        ServiceCategory::PayrollServices,
        ServiceCategory::Other,
    ];

    /// Storage key.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::TaxPreparation => "tax_preparation",
            ServiceCategory::Accounting => "accounting",
            ServiceCategory::FinancialPlanning => "financial_planning",
            ServiceCategory::BusinessConsulting => "business_consulting",
            ServiceCategory::AuditServices => "audit_services",
            ServiceCategory::PayrollServices => "payroll_services",
            ServiceCategory::Other => "other",
        }
    }

    /// Label shown to clients and written into calendar event titles.
    pub fn label(&self) -> &'static str {
        match self {
            ServiceCategory::TaxPreparation => "Preparación de Impuestos",
            ServiceCategory::Accounting => "Contabilidad",
            ServiceCategory::FinancialPlanning => "Planificación Financiera",
            ServiceCategory::BusinessConsulting => "Consultoría Empresarial",
            ServiceCategory::AuditServices => "Servicios de Auditoría",
            ServiceCategory::PayrollServices => "Servicios de Nómina",
            ServiceCategory::Other => "Otro",
        }
    }
}

impl FromStr for ServiceCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s || c.label() == s)
            .ok_or_else(|| format!("unknown service category: {}", s))
    }
}

/// A phone number normalized to its ten national digits.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    pub const DIGITS: usize = 10;

    /// Strips formatting and keeps the ten national digits. A leading `1`
    /// country code on an eleven digit number is dropped.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        let national = match digits.len() {
            Self::DIGITS => digits,
            11 if digits.starts_with('1') => digits[1..].to_string(),
            0 => return Err("phone number is required".to_string()),
            n => {
                return Err(format!(
                    "phone number must have {} digits, got {}",
                    Self::DIGITS,
                    n
                ))
            }
        };
        Ok(Phone(national))
    }

    pub fn digits(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.0;
        write!(f, "+1 ({}) {} {}", &d[0..3], &d[3..6], &d[6..10])
    }
}

impl TryFrom<String> for Phone {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Phone::parse(&value)
    }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self {
        phone.0
    }
}

/// Lifecycle of a booking. Cancellation is a tombstone, bookings are never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

/// Whether a booking has a matching event in the external calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Stored locally, no sync attempt has finished yet.
    Pending,
    /// Linked to a provider event id.
    Synced,
    /// The last attempt failed; waiting for the reconciliation sweep.
    SyncFailed,
    /// Cancelled locally; a provider event may still hold the slot.
    ReleasePending,
    /// Cancelled locally and nothing is left in the external calendar.
    Released,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Pending => "pending",
            SyncState::Synced => "synced",
            SyncState::SyncFailed => "sync_failed",
            SyncState::ReleasePending => "release_pending",
            SyncState::Released => "released",
        }
    }
}

impl FromStr for SyncState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SyncState::Pending),
            "synced" => Ok(SyncState::Synced),
            "sync_failed" => Ok(SyncState::SyncFailed),
            "release_pending" => Ok(SyncState::ReleasePending),
            "released" => Ok(SyncState::Released),
            other => Err(format!("unknown sync state: {}", other)),
        }
    }
}

/// A validated booking request, ready to be appended to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub client_name: String,
    pub email: String,
    pub phone: Phone,
    pub service: ServiceCategory,
    pub notes: String,
}

impl NewBooking {
    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.date, self.start_time)
    }
}

/// A reservation owned by the booking store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub client_name: String,
    pub email: String,
    pub phone: Phone,
    pub service: ServiceCategory,
    pub notes: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub provider_event_id: Option<String>,
    pub sync_state: SyncState,
    pub sync_attempts: u32,
    pub last_sync_attempt_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Time-ordered id, `BK-` followed by a UUIDv7.
    pub fn generate_id() -> String {
        format!("BK-{}", Uuid::now_v7().simple())
    }

    /// Materializes a new confirmed, not yet synced booking.
    pub fn from_new(id: String, new: NewBooking, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            date: new.date,
            start_time: new.start_time,
            client_name: new.client_name,
            email: new.email,
            phone: new.phone,
            service: new.service,
            notes: new.notes,
            status: BookingStatus::Confirmed,
            created_at,
            provider_event_id: None,
            sync_state: SyncState::Pending,
            sync_attempts: 0,
            last_sync_attempt_at: None,
        }
    }

    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.date, self.start_time)
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }
}

/// A one hour, grid-aligned appointment window. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeSlot {
    pub date: NaiveDate,
    pub start: NaiveTime,
}

impl TimeSlot {
    pub fn new(date: NaiveDate, start: NaiveTime) -> Self {
        Self { date, start }
    }

    pub fn end(&self) -> NaiveTime {
        self.start + slot_duration()
    }

    /// 12-hour clock label, e.g. `9:00 AM`.
    pub fn label(&self) -> String {
        self.start.format("%-I:%M %p").to_string()
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.label())
    }
}

/// One busy interval read from the external calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarOccupancy {
    pub event_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl CalendarOccupancy {
    /// Half-open overlap test against `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }
}
