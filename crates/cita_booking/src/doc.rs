// File: crates/cita_booking/src/doc.rs

#![cfg(feature = "openapi")]
use utoipa::OpenApi;

use crate::handlers::{
    AvailabilityQuery, AvailabilityResponse, BookingView, BookingsQuery, CancellationResponse,
    CreateBookingResponse, DaySlots, SlotView,
};
use crate::reconcile::SweepReport;
use crate::request::CreateBookingRequest;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::get_availability_handler,
        crate::handlers::create_booking_handler,
        crate::handlers::list_bookings_handler,
        crate::handlers::cancel_booking_handler,
        crate::handlers::reconcile_handler,
    ),
    components(
        schemas(
            AvailabilityQuery,
            AvailabilityResponse,
            DaySlots,
            SlotView,
            CreateBookingRequest,
            CreateBookingResponse,
            BookingsQuery,
            BookingView,
            CancellationResponse,
            SweepReport
        )
    ),
    tags(
        (name = "Booking", description = "Slot availability and booking creation"),
        (name = "Admin", description = "Booking administration and calendar reconciliation")
    )
)]
pub struct BookingApiDoc;
