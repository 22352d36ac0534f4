// --- File: crates/services/cita_backend/src/app_state.rs ---
use crate::service_factory::{booking_store, calendar_client};
use cita_booking::{BookingCoordinator, BookingError, BookingState, ReconciliationSweep, RetryPolicy};
use cita_config::AppConfig;
use cita_db::DbError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Why the server could not start.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to load config: {0}")]
    Config(String),

    #[error("Booking store unavailable: {0}")]
    Store(#[from] DbError),

    #[error("Invalid schedule: {0}")]
    Booking(#[from] BookingError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state shared by the router and the background sweep.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub booking: Arc<BookingState>,
}

impl AppState {
    /// Wires store, calendar, coordinator and sweep from the configuration.
    pub async fn new(config: Arc<AppConfig>) -> Result<Self, StartupError> {
        let store = booking_store(&config).await?;
        let calendar = calendar_client(&config).await;

        let coordinator = BookingCoordinator::from_config(store, calendar, &config)?;
        let sweep = ReconciliationSweep::new(
            coordinator.event_sync(),
            RetryPolicy::from_config(&config.sync),
        );

        Ok(Self {
            config,
            booking: Arc::new(BookingState {
                coordinator: Arc::new(coordinator),
                sweep: Arc::new(sweep),
            }),
        })
    }

    /// Starts the periodic reconciliation sweep on the runtime.
    pub fn spawn_sweep(&self) -> tokio::task::JoinHandle<()> {
        let sweep = self.booking.sweep.clone();
        let interval = Duration::from_secs(self.config.sync.sweep_interval_secs.max(1));
        tokio::spawn(async move { sweep.run_periodically(interval).await })
    }
}
