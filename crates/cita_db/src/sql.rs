//! SQLite implementation of the booking store
//!
//! The partial unique index on `(date, start_time) WHERE status = 'confirmed'`
//! makes `INSERT` the atomic check-and-insert: the database rejects the second
//! of two concurrent reservations for the same slot.

use crate::client::{DbClient, DbTransaction};
use crate::error::{DbError, StoreError};
use crate::store::BookingStore;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use cita_common::models::{Booking, BookingStatus, NewBooking, Phone, SyncState};
use cita_common::services::BoxFuture;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, error, info};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

const SELECT_COLUMNS: &str = r#"
    SELECT id, date, start_time, client_name, email, phone, service, notes, status,
           created_at, provider_event_id, sync_state, sync_attempts, last_sync_attempt_at
    FROM bookings
"#;

/// SQL implementation of the booking store
#[derive(Debug, Clone)]
pub struct SqlBookingStore {
    db_client: DbClient,
}

impl SqlBookingStore {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }

    /// Creates the bookings table and its indexes if they don't exist.
    pub async fn init_schema(&self) -> Result<(), DbError> {
        debug!("Initializing booking schema");

        self.db_client
            .execute(
                r#"
            CREATE TABLE IF NOT EXISTS bookings (
                id TEXT PRIMARY KEY NOT NULL,
                date TEXT NOT NULL,
                start_time TEXT NOT NULL,
                client_name TEXT NOT NULL,
                email TEXT NOT NULL,
                phone TEXT NOT NULL,
                service TEXT NOT NULL,
                notes TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                provider_event_id TEXT,
                sync_state TEXT NOT NULL,
                sync_attempts INTEGER NOT NULL DEFAULT 0,
                last_sync_attempt_at TEXT
            )
        "#,
            )
            .await?;

        self.db_client
            .execute(
                r#"
            CREATE UNIQUE INDEX IF NOT EXISTS bookings_confirmed_slot
            ON bookings (date, start_time) WHERE status = 'confirmed'
        "#,
            )
            .await?;

        self.db_client
            .execute("CREATE INDEX IF NOT EXISTS bookings_by_date ON bookings (date)")
            .await?;

        info!("Booking schema initialized successfully");
        Ok(())
    }

    async fn insert(&self, new: NewBooking) -> Result<Booking, StoreError> {
        let booking = Booking::from_new(Booking::generate_id(), new, Utc::now());

        let result = sqlx::query(
            r#"
            INSERT INTO bookings (id, date, start_time, client_name, email, phone, service, notes,
                                  status, created_at, provider_event_id, sync_state, sync_attempts,
                                  last_sync_attempt_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, NULL, ?11, 0, NULL)
        "#,
        )
        .bind(&booking.id)
        .bind(booking.date.format(DATE_FORMAT).to_string())
        .bind(booking.start_time.format(TIME_FORMAT).to_string())
        .bind(&booking.client_name)
        .bind(&booking.email)
        .bind(booking.phone.digits())
        .bind(booking.service.as_str())
        .bind(&booking.notes)
        .bind(booking.status.as_str())
        .bind(booking.created_at.to_rfc3339())
        .bind(booking.sync_state.as_str())
        .execute(self.db_client.pool())
        .await;

        match result {
            Ok(_) => {
                info!("Booking {} stored for {}", booking.id, booking.slot());
                Ok(booking)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                debug!("Slot {} already booked", booking.slot());
                Err(StoreError::SlotConflict {
                    date: booking.date,
                    start_time: booking.start_time,
                })
            }
            Err(e) => {
                error!("Failed to insert booking: {}", e);
                Err(StoreError::Backend(DbError::QueryError(e.to_string())))
            }
        }
    }

    async fn fetch(&self, id: &str) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query(&format!("{} WHERE id = ?1", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(query_error)?;

        row.as_ref().map(booking_from_row).transpose()
    }

    async fn fetch_in(tx: &mut DbTransaction<'_>, id: &str) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query(&format!("{} WHERE id = ?1", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(query_error)?;

        row.as_ref().map(booking_from_row).transpose()
    }

    async fn link_event(&self, id: &str, provider_event_id: &str) -> Result<Booking, StoreError> {
        let mut tx = self.db_client.begin().await?;

        sqlx::query(
            r#"
            UPDATE bookings
            SET provider_event_id = ?2,
                sync_state = CASE WHEN status = 'confirmed' THEN 'synced' ELSE 'release_pending' END,
                last_sync_attempt_at = ?3
            WHERE id = ?1 AND provider_event_id IS NULL
        "#,
        )
        .bind(id)
        .bind(provider_event_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(query_error)?;

        let booking = Self::fetch_in(&mut tx, id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        match booking.provider_event_id.as_deref() {
            Some(recorded) if recorded == provider_event_id => {
                tx.commit()
                    .await
                    .map_err(|e| DbError::TransactionError(e.to_string()))?;
                Ok(booking)
            }
            recorded => Err(StoreError::SyncIdentityMismatch {
                id: id.to_string(),
                recorded: recorded.unwrap_or_default().to_string(),
                attempted: provider_event_id.to_string(),
            }),
        }
    }

    async fn record_sync_failure(&self, id: &str) -> Result<Booking, StoreError> {
        let mut tx = self.db_client.begin().await?;

        sqlx::query(
            r#"
            UPDATE bookings
            SET sync_state = 'sync_failed', sync_attempts = sync_attempts + 1,
                last_sync_attempt_at = ?2
            WHERE id = ?1 AND status = 'confirmed' AND sync_state != 'synced'
        "#,
        )
        .bind(id)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(query_error)?;

        let booking = Self::fetch_in(&mut tx, id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionError(e.to_string()))?;
        Ok(booking)
    }

    async fn cancel_confirmed(&self, id: &str) -> Result<Booking, StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE bookings
            SET status = 'cancelled', sync_state = 'release_pending', sync_attempts = 0,
                last_sync_attempt_at = ?2
            WHERE id = ?1 AND status = 'confirmed'
        "#,
        )
        .bind(id)
        .bind(Utc::now().to_rfc3339())
        .execute(self.db_client.pool())
        .await
        .map_err(query_error)?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        info!("Booking {} cancelled", id);

        self.fetch(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Applies `assignments` to a cancelled booking and returns it.
    async fn update_cancelled(&self, id: &str, assignments: &str) -> Result<Booking, StoreError> {
        let updated = sqlx::query(&format!(
            "UPDATE bookings SET {}, last_sync_attempt_at = ?2 WHERE id = ?1 AND status = 'cancelled'",
            assignments
        ))
        .bind(id)
        .bind(Utc::now().to_rfc3339())
        .execute(self.db_client.pool())
        .await
        .map_err(query_error)?;

        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.fetch(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn confirmed_on(&self, date: NaiveDate) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query(&format!(
            "{} WHERE date = ?1 AND status = 'confirmed' ORDER BY start_time",
            SELECT_COLUMNS
        ))
        .bind(date.format(DATE_FORMAT).to_string())
        .fetch_all(self.db_client.pool())
        .await
        .map_err(query_error)?;

        rows.iter().map(booking_from_row).collect()
    }

    async fn confirmed_unsynced(&self) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query(&format!(
            "{} WHERE status = 'confirmed' AND sync_state != 'synced' ORDER BY created_at",
            SELECT_COLUMNS
        ))
        .fetch_all(self.db_client.pool())
        .await
        .map_err(query_error)?;

        rows.iter().map(booking_from_row).collect()
    }

    async fn cancelled_pending_release(&self) -> Result<Vec<Booking>, StoreError> {
        let rows = sqlx::query(&format!(
            "{} WHERE status = 'cancelled' AND sync_state = 'release_pending' ORDER BY created_at",
            SELECT_COLUMNS
        ))
        .fetch_all(self.db_client.pool())
        .await
        .map_err(query_error)?;

        rows.iter().map(booking_from_row).collect()
    }
}

fn query_error(e: sqlx::Error) -> StoreError {
    error!("Booking query failed: {}", e);
    StoreError::Backend(DbError::QueryError(e.to_string()))
}

fn column<T>(row: &SqliteRow, name: &str) -> Result<T, StoreError>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Backend(DbError::CorruptRow(format!("{}: {}", name, e))))
}

fn corrupt<E: std::fmt::Display>(name: &str) -> impl FnOnce(E) -> StoreError + '_ {
    move |e| StoreError::Backend(DbError::CorruptRow(format!("{}: {}", name, e)))
}

fn parse_instant(value: &str, name: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(corrupt(name))
}

fn booking_from_row(row: &SqliteRow) -> Result<Booking, StoreError> {
    let date: String = column(row, "date")?;
    let start_time: String = column(row, "start_time")?;
    let phone: String = column(row, "phone")?;
    let service: String = column(row, "service")?;
    let status: String = column(row, "status")?;
    let created_at: String = column(row, "created_at")?;
    let sync_state: String = column(row, "sync_state")?;
    let sync_attempts: i64 = column(row, "sync_attempts")?;
    let last_attempt: Option<String> = column(row, "last_sync_attempt_at")?;

    Ok(Booking {
        id: column(row, "id")?,
        date: NaiveDate::parse_from_str(&date, DATE_FORMAT).map_err(corrupt("date"))?,
        start_time: NaiveTime::parse_from_str(&start_time, TIME_FORMAT)
            .map_err(corrupt("start_time"))?,
        client_name: column(row, "client_name")?,
        email: column(row, "email")?,
        phone: Phone::parse(&phone).map_err(corrupt("phone"))?,
        service: service.parse().map_err(corrupt("service"))?,
        notes: column(row, "notes")?,
        status: status.parse::<BookingStatus>().map_err(corrupt("status"))?,
        created_at: parse_instant(&created_at, "created_at")?,
        provider_event_id: column(row, "provider_event_id")?,
        sync_state: sync_state.parse::<SyncState>().map_err(corrupt("sync_state"))?,
        sync_attempts: u32::try_from(sync_attempts).map_err(corrupt("sync_attempts"))?,
        last_sync_attempt_at: last_attempt
            .as_deref()
            .map(|v| parse_instant(v, "last_sync_attempt_at"))
            .transpose()?,
    })
}

impl BookingStore for SqlBookingStore {
    fn append(&self, booking: NewBooking) -> BoxFuture<'_, Booking, StoreError> {
        Box::pin(self.insert(booking))
    }

    fn get(&self, id: &str) -> BoxFuture<'_, Option<Booking>, StoreError> {
        let id = id.to_string();
        Box::pin(async move { self.fetch(&id).await })
    }

    fn mark_synced(&self, id: &str, provider_event_id: &str) -> BoxFuture<'_, Booking, StoreError> {
        let id = id.to_string();
        let provider_event_id = provider_event_id.to_string();
        Box::pin(async move { self.link_event(&id, &provider_event_id).await })
    }

    fn mark_sync_failed(&self, id: &str) -> BoxFuture<'_, Booking, StoreError> {
        let id = id.to_string();
        Box::pin(async move { self.record_sync_failure(&id).await })
    }

    fn cancel(&self, id: &str) -> BoxFuture<'_, Booking, StoreError> {
        let id = id.to_string();
        Box::pin(async move { self.cancel_confirmed(&id).await })
    }

    fn mark_released(&self, id: &str) -> BoxFuture<'_, Booking, StoreError> {
        let id = id.to_string();
        Box::pin(async move { self.update_cancelled(&id, "sync_state = 'released'").await })
    }

    fn mark_release_failed(&self, id: &str) -> BoxFuture<'_, Booking, StoreError> {
        let id = id.to_string();
        Box::pin(async move {
            self.update_cancelled(
                &id,
                "sync_state = 'release_pending', sync_attempts = sync_attempts + 1",
            )
            .await
        })
    }

    fn list_by_date(&self, date: NaiveDate) -> BoxFuture<'_, Vec<Booking>, StoreError> {
        Box::pin(self.confirmed_on(date))
    }

    fn list_unsynced(&self) -> BoxFuture<'_, Vec<Booking>, StoreError> {
        Box::pin(self.confirmed_unsynced())
    }

    fn list_pending_release(&self) -> BoxFuture<'_, Vec<Booking>, StoreError> {
        Box::pin(self.cancelled_pending_release())
    }
}
