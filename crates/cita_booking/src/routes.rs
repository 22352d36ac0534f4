// --- File: crates/cita_booking/src/routes.rs ---

use crate::handlers::{
    cancel_booking_handler, create_booking_handler, get_availability_handler,
    list_bookings_handler, reconcile_handler, BookingState,
};
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

/// Creates a router containing all booking routes, to be nested under `/api`.
///
/// The `/admin` routes carry no authentication of their own. They return client
/// contact data and cancel bookings, so they must only be exposed behind an
/// auth layer or proxy in front of this router.
pub fn routes(state: Arc<BookingState>) -> Router {
    Router::new()
        .route("/availability", get(get_availability_handler))
        .route("/bookings", post(create_booking_handler))
        .route("/admin/bookings", get(list_bookings_handler))
        .route("/admin/bookings/{booking_id}", delete(cancel_booking_handler))
        .route("/admin/reconcile", post(reconcile_handler))
        .with_state(state)
}
