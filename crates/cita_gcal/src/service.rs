// --- File: crates/cita_gcal/src/service.rs ---
//! Google Calendar implementation of [`CalendarSyncClient`].
//!
//! Every event carries the booking id as a private extended property, which is
//! what [`CalendarSyncClient::find_event_for_booking`] searches on before a
//! retry creates anything.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cita_common::models::CalendarOccupancy;
use cita_common::services::{BoxFuture, CalendarEventRequest, CalendarSyncClient, SyncError};
use cita_config::GcalConfig;
use google_calendar3::api::{
    Event, EventDateTime, EventExtendedProperties, EventReminder, EventReminders,
};
use tracing::{debug, info, warn};

use crate::auth::{GcalSetupError, HubType};

/// Extended property key linking an event to its booking.
pub const BOOKING_ID_PROPERTY: &str = "booking_id";

/// Tomato red in the Google Calendar palette.
pub const DEFAULT_COLOR_ID: &str = "11";

const PAGE_SIZE: i32 = 250;

pub struct GoogleCalendarSyncClient {
    calendar_hub: Arc<HubType>,
    calendar_id: String,
    color_id: String,
}

impl GoogleCalendarSyncClient {
    pub fn new(calendar_hub: Arc<HubType>, calendar_id: impl Into<String>) -> Self {
        Self {
            calendar_hub,
            calendar_id: calendar_id.into(),
            color_id: DEFAULT_COLOR_ID.to_string(),
        }
    }

    /// Builds the client for the calendar named in `config`.
    pub fn from_config(
        calendar_hub: Arc<HubType>,
        config: &GcalConfig,
    ) -> Result<Self, GcalSetupError> {
        let calendar_id = config
            .calendar_id
            .as_deref()
            .ok_or(GcalSetupError::MissingSetting("calendar_id"))?;
        let client = Self::new(calendar_hub, calendar_id);
        Ok(match config.color_id.as_deref() {
            Some(color_id) => client.with_color_id(color_id),
            None => client,
        })
    }

    pub fn with_color_id(mut self, color_id: impl Into<String>) -> Self {
        self.color_id = color_id.into();
        self
    }
}

/// HTTP statuses that mean the request itself is wrong and retrying won't help.
pub fn is_rejection_status(status: u16) -> bool {
    (400..500).contains(&status) && !matches!(status, 401 | 403 | 408 | 429)
}

/// Status code carried by a Google API error, if any.
pub fn error_status(err: &google_calendar3::Error) -> Option<u16> {
    match err {
        google_calendar3::Error::BadRequest(body) => body
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|c| c.as_u64())
            .and_then(|c| u16::try_from(c).ok()),
        google_calendar3::Error::Failure(response) => Some(response.status().as_u16()),
        _ => None,
    }
}

/// Splits Google API failures into retryable and permanent ones.
pub fn classify_error(err: google_calendar3::Error) -> SyncError {
    let status = error_status(&err);
    match (&err, status) {
        (google_calendar3::Error::FieldClash(_), _) => SyncError::ProviderRejected(err.to_string()),
        (google_calendar3::Error::BadRequest(_), None) => {
            SyncError::ProviderRejected(err.to_string())
        }
        (_, Some(status)) if is_rejection_status(status) => {
            SyncError::ProviderRejected(err.to_string())
        }
        _ => SyncError::ProviderUnavailable(err.to_string()),
    }
}

/// Translates a booking event into the Google event resource.
pub fn event_from_request(request: &CalendarEventRequest, color_id: &str) -> Event {
    let overrides = request
        .reminders
        .iter()
        .map(|r| EventReminder {
            method: Some(r.method.clone()),
            minutes: Some(r.minutes_before),
        })
        .collect();

    Event {
        summary: Some(request.title.clone()),
        description: Some(request.description.clone()),
        start: Some(EventDateTime {
            date_time: Some(request.start),
            time_zone: Some(request.time_zone.clone()),
            ..Default::default()
        }),
        end: Some(EventDateTime {
            date_time: Some(request.end),
            time_zone: Some(request.time_zone.clone()),
            ..Default::default()
        }),
        reminders: Some(EventReminders {
            use_default: Some(false),
            overrides: Some(overrides),
        }),
        color_id: Some(color_id.to_string()),
        extended_properties: Some(EventExtendedProperties {
            private: Some(HashMap::from([(
                BOOKING_ID_PROPERTY.to_string(),
                request.booking_id.clone(),
            )])),
            shared: None,
        }),
        ..Default::default()
    }
}

/// Busy interval for a listed event. Cancelled and all-day events occupy nothing.
pub fn occupancy_from_event(event: Event) -> Option<CalendarOccupancy> {
    if event.status.as_deref() == Some("cancelled") {
        return None;
    }
    let start = event.start.as_ref().and_then(|s| s.date_time)?;
    let end = event.end.as_ref().and_then(|e| e.date_time)?;
    Some(CalendarOccupancy {
        event_id: event.id.unwrap_or_default(),
        start,
        end,
        title: event.summary,
        description: event.description,
    })
}

impl CalendarSyncClient for GoogleCalendarSyncClient {
    fn create_event(&self, request: CalendarEventRequest) -> BoxFuture<'_, String, SyncError> {
        let calendar_hub = self.calendar_hub.clone();
        let calendar_id = self.calendar_id.clone();
        let event = event_from_request(&request, &self.color_id);

        Box::pin(async move {
            let (_response, created) = calendar_hub
                .events()
                .insert(event, &calendar_id)
                .doit()
                .await
                .map_err(classify_error)?;

            let event_id = created.id.ok_or_else(|| {
                SyncError::ProviderUnavailable("created event has no id".to_string())
            })?;
            info!(
                "Created calendar event {} for booking {}",
                event_id, request.booking_id
            );
            Ok(event_id)
        })
    }

    fn list_occupancy(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<CalendarOccupancy>, SyncError> {
        let calendar_hub = self.calendar_hub.clone();
        let calendar_id = self.calendar_id.clone();

        Box::pin(async move {
            let mut occupied = Vec::new();
            let mut page_token: Option<String> = None;

            loop {
                let mut call = calendar_hub
                    .events()
                    .list(&calendar_id)
                    .time_min(start)
                    .time_max(end)
                    .single_events(true)
                    .order_by("startTime")
                    .max_results(PAGE_SIZE);
                if let Some(token) = page_token.as_deref() {
                    call = call.page_token(token);
                }

                let (_response, page) = call.doit().await.map_err(classify_error)?;
                occupied.extend(
                    page.items
                        .unwrap_or_default()
                        .into_iter()
                        .filter_map(occupancy_from_event),
                );

                match page.next_page_token {
                    Some(token) => page_token = Some(token),
                    None => break,
                }
            }

            debug!(
                "Calendar {} has {} busy intervals between {} and {}",
                calendar_id,
                occupied.len(),
                start,
                end
            );
            Ok(occupied)
        })
    }

    fn find_event_for_booking(
        &self,
        booking_id: &str,
    ) -> BoxFuture<'_, Option<String>, SyncError> {
        let calendar_hub = self.calendar_hub.clone();
        let calendar_id = self.calendar_id.clone();
        let property = format!("{}={}", BOOKING_ID_PROPERTY, booking_id);

        Box::pin(async move {
            let (_response, page) = calendar_hub
                .events()
                .list(&calendar_id)
                .add_private_extended_property(&property)
                .show_deleted(false)
                .max_results(1)
                .doit()
                .await
                .map_err(classify_error)?;

            Ok(page
                .items
                .unwrap_or_default()
                .into_iter()
                .filter(|e| e.status.as_deref() != Some("cancelled"))
                .find_map(|e| e.id))
        })
    }

    fn cancel_event(&self, event_id: &str) -> BoxFuture<'_, (), SyncError> {
        let calendar_hub = self.calendar_hub.clone();
        let calendar_id = self.calendar_id.clone();
        let event_id = event_id.to_string();

        Box::pin(async move {
            let current = match calendar_hub.events().get(&calendar_id, &event_id).doit().await {
                Ok((_response, event)) => event,
                Err(e) if matches!(error_status(&e), Some(404 | 410)) => {
                    warn!("Calendar event {} is already gone", event_id);
                    return Ok(());
                }
                Err(e) => return Err(classify_error(e)),
            };

            if current.status.as_deref() == Some("cancelled") {
                return Ok(());
            }

            let cancelled = Event {
                status: Some("cancelled".to_string()),
                sequence: Some(current.sequence.map(|n| n + 1).unwrap_or(1)),
                ..Default::default()
            };

            calendar_hub
                .events()
                .patch(cancelled, &calendar_id, &event_id)
                .send_updates("none")
                .doit()
                .await
                .map_err(classify_error)?;

            info!("Cancelled calendar event {}", event_id);
            Ok(())
        })
    }
}
