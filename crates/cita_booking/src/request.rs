// --- File: crates/cita_booking/src/request.rs ---
//! Typed booking request and its boundary validation.

use crate::error::BookingError;
use crate::normalizer::{parse_date, parse_time12};
use chrono::{NaiveDate, NaiveTime};
use cita_common::models::{NewBooking, Phone, ServiceCategory};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateBookingRequest {
    /// Civil date in YYYY-MM-DD format
    #[cfg_attr(feature = "openapi", schema(format = "date", example = "2025-03-10"))]
    pub date: String,
    /// 12-hour clock time
    #[cfg_attr(feature = "openapi", schema(example = "10:00 AM"))]
    pub time: String,
    #[cfg_attr(feature = "openapi", schema(example = "Ana Rivera"))]
    pub name: String,
    #[cfg_attr(feature = "openapi", schema(example = "ana@example.com"))]
    pub email: String,
    #[cfg_attr(feature = "openapi", schema(example = "(787) 555-1234"))]
    pub phone: String,
    /// Catalog key such as `accounting`, or its Spanish label
    #[cfg_attr(feature = "openapi", schema(example = "accounting"))]
    pub service: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// The request with every field checked and typed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub booking: NewBooking,
}

impl CreateBookingRequest {
    /// Checks the client fields and parses the date and time.
    ///
    /// Client details are checked first so a form with several problems reports
    /// the missing contact information before the clock format.
    pub fn validate(&self) -> Result<ValidatedRequest, BookingError> {
        let client_name = self.name.trim();
        if client_name.is_empty() {
            return Err(BookingError::MalformedInput("Name is required".to_string()));
        }

        let email = self.email.trim();
        if !is_plausible_email(email) {
            return Err(BookingError::MalformedInput(format!(
                "Invalid email address '{}'",
                self.email
            )));
        }

        let phone = Phone::parse(&self.phone).map_err(BookingError::MalformedInput)?;

        let service: ServiceCategory = self
            .service
            .trim()
            .parse()
            .map_err(BookingError::MalformedInput)?;

        let date = parse_date(&self.date)?;
        let start_time = parse_time12(&self.time)?;

        let notes = self
            .notes
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        Ok(ValidatedRequest {
            date,
            start_time,
            booking: NewBooking {
                date,
                start_time,
                client_name: client_name.to_string(),
                email: email.to_string(),
                phone,
                service,
                notes,
            },
        })
    }
}

/// Accepts anything shaped like `local@domain.tld` with no whitespace.
pub fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    match domain.rfind('.') {
        Some(dot) => !local.is_empty() && dot > 0 && dot + 1 < domain.len(),
        None => false,
    }
}
