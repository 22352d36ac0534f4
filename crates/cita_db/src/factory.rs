//! Factory for the booking store
//!
//! Picks the SQL store when a database is configured and falls back to the
//! in-memory store otherwise.

use crate::client::DbClient;
use crate::error::DbError;
use crate::memory::InMemoryBookingStore;
use crate::sql::SqlBookingStore;
use crate::store::BookingStore;
use cita_config::{AppConfig, DatabaseConfig};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Factory for creating booking stores
#[derive(Debug, Clone, Default)]
pub struct BookingStoreFactory;

impl BookingStoreFactory {
    pub fn new() -> Self {
        Self
    }

    /// Create the store selected by the application configuration
    ///
    /// # Errors
    ///
    /// Fails if a database is configured but cannot be opened or migrated.
    pub async fn from_app_config(
        &self,
        config: &AppConfig,
    ) -> Result<Arc<dyn BookingStore>, DbError> {
        match config.database.as_ref() {
            Some(db_config) => {
                let store = self.sql_store(db_config).await?;
                Ok(Arc::new(store))
            }
            None => {
                warn!("No database configured, bookings are kept in memory only");
                Ok(Arc::new(InMemoryBookingStore::new()))
            }
        }
    }

    /// Open the configured database and make sure the schema exists
    pub async fn sql_store(&self, db_config: &DatabaseConfig) -> Result<SqlBookingStore, DbError> {
        debug!("Creating SQL booking store");
        let client = DbClient::from_config(db_config).await?;
        let store = SqlBookingStore::new(client);
        store.init_schema().await?;
        info!("SQL booking store ready");
        Ok(store)
    }
}
