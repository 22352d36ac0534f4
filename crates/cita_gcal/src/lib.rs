// --- File: crates/cita_gcal/src/lib.rs ---
//! Google Calendar backed [`cita_common::services::CalendarSyncClient`].
pub mod auth;
pub mod service;

pub use auth::{create_calendar_hub, GcalSetupError, HubType};
pub use service::GoogleCalendarSyncClient;
