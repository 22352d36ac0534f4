// File: crates/cita_booking/src/handlers.rs
use crate::coordinator::{BookingCoordinator, DayAvailability};
use crate::error::BookingError;
use crate::normalizer::{parse_date, DATE_FORMAT};
use crate::reconcile::{ReconciliationSweep, SweepReport};
use crate::request::CreateBookingRequest;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use cita_common::error::CitaError;
use cita_common::models::{Booking, SyncState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

// Shared state of the booking routes
#[derive(Clone)]
pub struct BookingState {
    pub coordinator: Arc<BookingCoordinator>,
    pub sweep: Arc<ReconciliationSweep>,
}

// --- Data Structures ---

#[derive(Deserialize, Debug, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams, utoipa::ToSchema))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct AvailabilityQuery {
    /// Single day in YYYY-MM-DD format
    #[cfg_attr(feature = "openapi", schema(format = "date", example = "2025-03-10"))]
    pub date: Option<String>,
    /// First day of a range, YYYY-MM-DD
    #[cfg_attr(feature = "openapi", schema(format = "date", example = "2025-03-10"))]
    pub start_date: Option<String>,
    /// Last day of a range (inclusive), YYYY-MM-DD
    #[cfg_attr(feature = "openapi", schema(format = "date", example = "2025-03-14"))]
    pub end_date: Option<String>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SlotView {
    #[cfg_attr(feature = "openapi", schema(example = "9:00 AM"))]
    pub time: String,
    #[cfg_attr(feature = "openapi", schema(example = "2025-03-10T13:00:00+00:00"))]
    pub start_time: String, // RFC 3339
    #[cfg_attr(feature = "openapi", schema(example = "2025-03-10T14:00:00+00:00"))]
    pub end_time: String, // RFC 3339
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DaySlots {
    #[cfg_attr(feature = "openapi", schema(example = "2025-03-10"))]
    pub date: String,
    pub slots: Vec<SlotView>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AvailabilityResponse {
    pub days: Vec<DaySlots>,
    /// False if the external calendar could not be consulted
    pub calendar_checked: bool,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateBookingResponse {
    pub booking_id: String,
    #[cfg_attr(feature = "openapi", schema(example = "confirmed"))]
    pub status: String,
    pub provider_event_id: Option<String>,
    /// True when the calendar event is still to be created by the sweep
    pub pending_sync: bool,
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams, utoipa::ToSchema))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct BookingsQuery {
    #[cfg_attr(feature = "openapi", schema(format = "date", example = "2025-03-10"))]
    pub date: String,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BookingView {
    pub booking_id: String,
    pub date: String,
    #[cfg_attr(feature = "openapi", schema(example = "10:00 AM"))]
    pub time: String,
    pub client_name: String,
    pub email: String,
    #[cfg_attr(feature = "openapi", schema(example = "+1 (787) 555 1234"))]
    pub phone: String,
    #[cfg_attr(feature = "openapi", schema(example = "Contabilidad"))]
    pub service: String,
    pub notes: String,
    pub status: String,
    #[cfg_attr(feature = "openapi", schema(example = "synced"))]
    pub sync_state: String,
    pub provider_event_id: Option<String>,
    pub created_at: String,
}

impl From<Booking> for BookingView {
    fn from(booking: Booking) -> Self {
        Self {
            time: booking.slot().label(),
            date: booking.date.format(DATE_FORMAT).to_string(),
            phone: booking.phone.to_string(),
            service: booking.service.label().to_string(),
            status: booking.status.as_str().to_string(),
            sync_state: booking.sync_state.as_str().to_string(),
            created_at: booking.created_at.to_rfc3339(),
            booking_id: booking.id,
            client_name: booking.client_name,
            email: booking.email,
            notes: booking.notes,
            provider_event_id: booking.provider_event_id,
        }
    }
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CancellationResponse {
    pub booking_id: String,
    #[cfg_attr(feature = "openapi", schema(example = "cancelled"))]
    pub status: String,
    /// False while the calendar event still has to be cancelled by the sweep.
    pub calendar_released: bool,
}

fn day_slots(
    coordinator: &BookingCoordinator,
    day: DayAvailability,
) -> Result<DaySlots, BookingError> {
    let slots = day
        .slots
        .iter()
        .map(|slot| -> Result<SlotView, BookingError> {
            let (start, end) = coordinator.hours().slot_bounds(slot)?;
            Ok(SlotView {
                time: slot.label(),
                start_time: start.to_rfc3339(),
                end_time: end.to_rfc3339(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DaySlots {
        date: day.date.format(DATE_FORMAT).to_string(),
        slots,
    })
}

// --- Handlers ---

/// Handler listing offerable slots for a day or a date range.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/availability",
    params(AvailabilityQuery),
    responses(
        (status = 200, description = "Available slots per day", body = AvailabilityResponse),
        (status = 400, description = "Invalid date or range"),
        (status = 500, description = "Internal error")
    ),
    tag = "Booking"
))]
pub async fn get_availability_handler(
    State(state): State<Arc<BookingState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, CitaError> {
    let (start, end) = match (&query.date, &query.start_date, &query.end_date) {
        (Some(date), None, None) => {
            let date = parse_date(date).map_err(BookingError::from)?;
            (date, date)
        }
        (None, Some(start), Some(end)) => (
            parse_date(start).map_err(BookingError::from)?,
            parse_date(end).map_err(BookingError::from)?,
        ),
        _ => {
            return Err(CitaError::ValidationError(
                "Provide either date or both start_date and end_date".to_string(),
            ))
        }
    };

    let days = state
        .coordinator
        .availability_range(start, end, Utc::now())
        .await?;
    let calendar_checked = days.iter().all(|d| d.calendar_checked);
    let days = days
        .into_iter()
        .map(|day| day_slots(&state.coordinator, day))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(AvailabilityResponse {
        days,
        calendar_checked,
    }))
}

/// Handler creating a booking.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking confirmed", body = CreateBookingResponse),
        (status = 400, description = "Invalid input or time not offered"),
        (status = 409, description = "Slot already booked"),
        (status = 500, description = "Internal error")
    ),
    tag = "Booking"
))]
pub async fn create_booking_handler(
    State(state): State<Arc<BookingState>>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<CreateBookingResponse>), CitaError> {
    let outcome = state
        .coordinator
        .create_booking(&request, Utc::now())
        .await?;
    let pending_sync = outcome.pending_sync();

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            status: outcome.booking.status.as_str().to_string(),
            booking_id: outcome.booking.id,
            provider_event_id: outcome.booking.provider_event_id,
            pending_sync,
        }),
    ))
}

/// Handler listing the confirmed bookings of a day.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/admin/bookings",
    params(BookingsQuery),
    responses(
        (status = 200, description = "Confirmed bookings by start time", body = [BookingView]),
        (status = 400, description = "Invalid date"),
        (status = 500, description = "Internal error")
    ),
    tag = "Admin"
))]
pub async fn list_bookings_handler(
    State(state): State<Arc<BookingState>>,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<BookingView>>, CitaError> {
    let date = parse_date(&query.date).map_err(BookingError::from)?;
    let bookings = state.coordinator.list_bookings(date).await?;
    Ok(Json(bookings.into_iter().map(BookingView::from).collect()))
}

/// Handler cancelling a booking and its calendar event.
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/admin/bookings/{booking_id}",
    params(("booking_id" = String, Path, description = "Booking to cancel")),
    responses(
        (status = 200, description = "Booking cancelled", body = CancellationResponse),
        (status = 500, description = "Unknown or already cancelled booking")
    ),
    tag = "Admin"
))]
pub async fn cancel_booking_handler(
    State(state): State<Arc<BookingState>>,
    Path(booking_id): Path<String>,
) -> Result<Json<CancellationResponse>, CitaError> {
    let cancelled = state.coordinator.cancel_booking(&booking_id).await?;
    Ok(Json(CancellationResponse {
        status: cancelled.status.as_str().to_string(),
        calendar_released: cancelled.sync_state == SyncState::Released,
        booking_id: cancelled.id,
    }))
}

/// Handler running one reconciliation pass immediately.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/admin/reconcile",
    responses(
        (status = 200, description = "Sweep report", body = SweepReport),
        (status = 500, description = "Internal error")
    ),
    tag = "Admin"
))]
pub async fn reconcile_handler(
    State(state): State<Arc<BookingState>>,
) -> Result<Json<SweepReport>, CitaError> {
    let report = state.sweep.run_once(Utc::now()).await?;
    info!("Manual reconciliation: {:?}", report);
    Ok(Json(report))
}
