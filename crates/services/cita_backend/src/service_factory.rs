// --- File: crates/services/cita_backend/src/service_factory.rs ---
//! Builds the external services the booking engine depends on.
//!
//! Missing or broken calendar settings never stop the server: bookings are still
//! taken and the reconciliation sweep pushes them once a calendar is configured.
use cita_common::services::{CalendarSyncClient, DisabledCalendarSync};
use cita_config::AppConfig;
use cita_db::{BookingStore, BookingStoreFactory, DbError};
use std::sync::Arc;
#[allow(unused_imports)] // depends on the gcal feature
use tracing::{error, info, warn};

#[cfg(feature = "gcal")]
use cita_gcal::{create_calendar_hub, GoogleCalendarSyncClient};

/// The booking store selected by `database`, in memory when absent.
pub async fn booking_store(config: &AppConfig) -> Result<Arc<dyn BookingStore>, DbError> {
    BookingStoreFactory::new().from_app_config(config).await
}

/// The calendar client selected by `use_gcal` and `gcal`.
pub async fn calendar_client(config: &AppConfig) -> Arc<dyn CalendarSyncClient> {
    #[cfg(feature = "gcal")]
    {
        if let (true, Some(gcal_config)) = (config.use_gcal, config.gcal.as_ref()) {
            info!("Initializing Google Calendar client...");
            let client = match create_calendar_hub(gcal_config).await {
                Ok(hub) => GoogleCalendarSyncClient::from_config(Arc::new(hub), gcal_config),
                Err(e) => Err(e),
            };
            match client {
                Ok(client) => {
                    info!("Google Calendar client ready");
                    return Arc::new(client);
                }
                Err(e) => error!("Google Calendar unavailable, running without it: {}", e),
            }
        } else if config.use_gcal {
            warn!("use_gcal is set but the [gcal] section is missing");
        }
    }

    #[cfg(not(feature = "gcal"))]
    if config.use_gcal {
        warn!("use_gcal is set but this build has no Google Calendar support");
    }

    info!("Calendar sync disabled, bookings stay unsynced until a calendar is configured");
    Arc::new(DisabledCalendarSync)
}
