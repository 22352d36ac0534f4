// --- File: crates/cita_booking/src/lib.rs ---
//! The booking scheduling and consistency engine.
//!
//! Requests flow through [`BookingCoordinator`]: the [`normalizer`] turns
//! strings into instants, [`availability`] merges local bookings with the
//! external calendar, [`planner`] derives the offerable slots, and the booking
//! store makes the final call on conflicts. Calendar syncs that do not complete
//! are picked up by the [`ReconciliationSweep`].
pub mod availability;
pub mod coordinator;
pub mod doc;
pub mod error;
pub mod handlers;
pub mod hours;
pub mod normalizer;
#[cfg(test)]
mod normalizer_test;
pub mod planner;
pub mod reconcile;
pub mod request;
pub mod routes;
pub mod sync;

pub use coordinator::{BookingCoordinator, BookingOutcome, BookingPhase, DayAvailability};
pub use error::{BookingError, NormalizeError};
pub use handlers::BookingState;
pub use hours::BusinessHours;
pub use normalizer::TimeNormalizer;
pub use reconcile::{ReconciliationSweep, RetryPolicy, SweepReport};
pub use request::CreateBookingRequest;
pub use sync::{EventPolicy, EventSync};
