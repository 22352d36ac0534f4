//! Booking persistence for Cita
//!
//! The [`BookingStore`] trait is the durable owner of all bookings. Two
//! implementations are provided:
//!
//! - [`SqlBookingStore`], backed by SQLite through SQLx, where a partial unique
//!   index on confirmed slots enforces the no-double-booking rule
//! - [`InMemoryBookingStore`], used when no database is configured and in tests
//!
//! # Example
//!
//! ```rust,no_run
//! use cita_config::AppConfig;
//! use cita_db::BookingStoreFactory;
//!
//! async fn setup_store() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::default();
//!     let store = BookingStoreFactory::new().from_app_config(&config).await?;
//!     let unsynced = store.list_unsynced().await?;
//!     println!("{} bookings waiting for calendar sync", unsynced.len());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod factory;
pub mod memory;
pub mod sql;
pub mod store;

#[cfg(test)]
mod store_test;

pub use client::DbClient;
pub use error::{DbError, StoreError};
pub use factory::BookingStoreFactory;
pub use memory::InMemoryBookingStore;
pub use sql::SqlBookingStore;
pub use store::BookingStore;
