#[cfg(test)]
mod tests {
    use crate::client::DbClient;
    use crate::error::StoreError;
    use crate::memory::InMemoryBookingStore;
    use crate::sql::SqlBookingStore;
    use crate::store::BookingStore;
    use chrono::{NaiveDate, NaiveTime};
    use cita_common::models::{BookingStatus, NewBooking, Phone, ServiceCategory, SyncState};
    use std::sync::Arc;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn at(hour: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, 0, 0).unwrap()
    }

    fn new_booking(hour: u32) -> NewBooking {
        NewBooking {
            date: date(),
            start_time: at(hour),
            client_name: "Ana Rivera".to_string(),
            email: "ana@example.com".to_string(),
            phone: Phone::parse("787-555-1234").unwrap(),
            service: ServiceCategory::TaxPreparation,
            notes: String::new(),
        }
    }

    async fn sql_store() -> SqlBookingStore {
        let client = DbClient::from_url("sqlite::memory:").await.unwrap();
        let store = SqlBookingStore::new(client);
        store.init_schema().await.unwrap();
        store
    }

    async fn stores() -> Vec<(&'static str, Arc<dyn BookingStore>)> {
        vec![
            ("memory", Arc::new(InMemoryBookingStore::new())),
            ("sql", Arc::new(sql_store().await)),
        ]
    }

    #[tokio::test]
    async fn append_assigns_id_and_starts_pending() {
        for (name, store) in stores().await {
            let booking = store.append(new_booking(9)).await.unwrap();
            assert!(booking.id.starts_with("BK-"), "{}", name);
            assert_eq!(booking.status, BookingStatus::Confirmed, "{}", name);
            assert_eq!(booking.sync_state, SyncState::Pending, "{}", name);
            assert_eq!(booking.sync_attempts, 0, "{}", name);

            let fetched = store.get(&booking.id).await.unwrap().unwrap();
            assert_eq!(fetched.id, booking.id, "{}", name);
            assert_eq!(fetched.phone.digits(), "7875551234", "{}", name);
            assert_eq!(fetched.start_time, at(9), "{}", name);
        }
    }

    #[tokio::test]
    async fn second_append_for_same_slot_conflicts() {
        for (name, store) in stores().await {
            store.append(new_booking(10)).await.unwrap();
            let err = store.append(new_booking(10)).await.unwrap_err();
            assert!(
                matches!(err, StoreError::SlotConflict { start_time, .. } if start_time == at(10)),
                "{}: {:?}",
                name,
                err
            );
            assert_eq!(store.list_by_date(date()).await.unwrap().len(), 1, "{}", name);
        }
    }

    #[tokio::test]
    async fn concurrent_appends_admit_exactly_one() {
        for (name, store) in stores().await {
            let mut handles = Vec::new();
            for _ in 0..8 {
                let store = Arc::clone(&store);
                handles.push(tokio::spawn(async move { store.append(new_booking(11)).await }));
            }

            let mut won = 0;
            let mut conflicts = 0;
            for handle in handles {
                match handle.await.unwrap() {
                    Ok(_) => won += 1,
                    Err(StoreError::SlotConflict { .. }) => conflicts += 1,
                    Err(e) => panic!("{}: unexpected error {:?}", name, e),
                }
            }
            assert_eq!(won, 1, "{}", name);
            assert_eq!(conflicts, 7, "{}", name);
        }
    }

    #[tokio::test]
    async fn cancel_releases_the_slot() {
        for (name, store) in stores().await {
            let booking = store.append(new_booking(13)).await.unwrap();
            let cancelled = store.cancel(&booking.id).await.unwrap();
            assert_eq!(cancelled.status, BookingStatus::Cancelled, "{}", name);
            assert!(store.list_by_date(date()).await.unwrap().is_empty(), "{}", name);

            // the slot can be taken again
            store.append(new_booking(13)).await.unwrap();
        }
    }

    #[tokio::test]
    async fn cancel_twice_or_unknown_is_not_found() {
        for (name, store) in stores().await {
            let booking = store.append(new_booking(14)).await.unwrap();
            store.cancel(&booking.id).await.unwrap();

            let again = store.cancel(&booking.id).await.unwrap_err();
            assert!(matches!(again, StoreError::NotFound(_)), "{}", name);

            let unknown = store.cancel("BK-missing").await.unwrap_err();
            assert!(matches!(unknown, StoreError::NotFound(_)), "{}", name);
        }
    }

    #[tokio::test]
    async fn mark_synced_is_idempotent_and_guards_identity() {
        for (name, store) in stores().await {
            let booking = store.append(new_booking(15)).await.unwrap();

            let synced = store.mark_synced(&booking.id, "evt-1").await.unwrap();
            assert_eq!(synced.sync_state, SyncState::Synced, "{}", name);
            assert_eq!(synced.provider_event_id.as_deref(), Some("evt-1"), "{}", name);

            let again = store.mark_synced(&booking.id, "evt-1").await.unwrap();
            assert_eq!(again.provider_event_id.as_deref(), Some("evt-1"), "{}", name);

            let err = store.mark_synced(&booking.id, "evt-2").await.unwrap_err();
            assert!(
                matches!(err, StoreError::SyncIdentityMismatch { ref recorded, .. } if recorded == "evt-1"),
                "{}: {:?}",
                name,
                err
            );
        }
    }

    #[tokio::test]
    async fn sync_failure_counts_attempts_but_never_downgrades() {
        for (name, store) in stores().await {
            let booking = store.append(new_booking(16)).await.unwrap();

            let failed = store.mark_sync_failed(&booking.id).await.unwrap();
            assert_eq!(failed.sync_state, SyncState::SyncFailed, "{}", name);
            assert_eq!(failed.sync_attempts, 1, "{}", name);
            assert!(failed.last_sync_attempt_at.is_some(), "{}", name);
            assert_eq!(store.list_unsynced().await.unwrap().len(), 1, "{}", name);

            store.mark_synced(&booking.id, "evt-9").await.unwrap();
            let still_synced = store.mark_sync_failed(&booking.id).await.unwrap();
            assert_eq!(still_synced.sync_state, SyncState::Synced, "{}", name);
            assert_eq!(still_synced.sync_attempts, 1, "{}", name);
            assert!(store.list_unsynced().await.unwrap().is_empty(), "{}", name);
        }
    }

    #[tokio::test]
    async fn unsynced_listing_skips_cancelled_bookings() {
        for (name, store) in stores().await {
            let kept = store.append(new_booking(9)).await.unwrap();
            let dropped = store.append(new_booking(10)).await.unwrap();
            store.cancel(&dropped.id).await.unwrap();

            let unsynced = store.list_unsynced().await.unwrap();
            assert_eq!(unsynced.len(), 1, "{}", name);
            assert_eq!(unsynced[0].id, kept.id, "{}", name);
        }
    }

    #[tokio::test]
    async fn cancelled_booking_waits_for_release() {
        for (name, store) in stores().await {
            let booking = store.append(new_booking(11)).await.unwrap();
            store.mark_sync_failed(&booking.id).await.unwrap();

            let cancelled = store.cancel(&booking.id).await.unwrap();
            assert_eq!(cancelled.sync_state, SyncState::ReleasePending, "{}", name);
            assert_eq!(cancelled.sync_attempts, 0, "{}", name);
            let pending = store.list_pending_release().await.unwrap();
            assert_eq!(pending.len(), 1, "{}", name);
            assert_eq!(pending[0].id, booking.id, "{}", name);

            let failed = store.mark_release_failed(&booking.id).await.unwrap();
            assert_eq!(failed.sync_state, SyncState::ReleasePending, "{}", name);
            assert_eq!(failed.sync_attempts, 1, "{}", name);

            let released = store.mark_released(&booking.id).await.unwrap();
            assert_eq!(released.sync_state, SyncState::Released, "{}", name);
            assert!(store.list_pending_release().await.unwrap().is_empty(), "{}", name);
        }
    }

    #[tokio::test]
    async fn late_link_on_cancelled_booking_reopens_release() {
        for (name, store) in stores().await {
            let booking = store.append(new_booking(12)).await.unwrap();
            store.cancel(&booking.id).await.unwrap();
            store.mark_released(&booking.id).await.unwrap();

            // an in-flight create lands after the cancellation
            let linked = store.mark_synced(&booking.id, "evt-late").await.unwrap();
            assert_eq!(linked.sync_state, SyncState::ReleasePending, "{}", name);
            assert_eq!(linked.provider_event_id.as_deref(), Some("evt-late"), "{}", name);
            assert_eq!(store.list_pending_release().await.unwrap().len(), 1, "{}", name);

            let untouched = store.mark_sync_failed(&booking.id).await.unwrap();
            assert_eq!(untouched.sync_state, SyncState::ReleasePending, "{}", name);
            assert_eq!(untouched.sync_attempts, 0, "{}", name);
        }
    }

    #[tokio::test]
    async fn release_of_confirmed_booking_is_not_found() {
        for (name, store) in stores().await {
            let booking = store.append(new_booking(13)).await.unwrap();
            let err = store.mark_released(&booking.id).await.unwrap_err();
            assert!(matches!(err, StoreError::NotFound(_)), "{}", name);
            let err = store.mark_release_failed(&booking.id).await.unwrap_err();
            assert!(matches!(err, StoreError::NotFound(_)), "{}", name);
        }
    }

    #[tokio::test]
    async fn list_by_date_is_ordered_by_start() {
        for (name, store) in stores().await {
            store.append(new_booking(15)).await.unwrap();
            store.append(new_booking(9)).await.unwrap();
            store.append(new_booking(12)).await.unwrap();

            let starts: Vec<NaiveTime> = store
                .list_by_date(date())
                .await
                .unwrap()
                .into_iter()
                .map(|b| b.start_time)
                .collect();
            assert_eq!(starts, vec![at(9), at(12), at(15)], "{}", name);

            let other_day = NaiveDate::from_ymd_opt(2025, 3, 11).unwrap();
            assert!(store.list_by_date(other_day).await.unwrap().is_empty(), "{}", name);
        }
    }

    #[tokio::test]
    async fn unknown_id_reads_as_none() {
        for (name, store) in stores().await {
            assert!(store.get("BK-nope").await.unwrap().is_none(), "{}", name);
            let err = store.mark_sync_failed("BK-nope").await.unwrap_err();
            assert!(matches!(err, StoreError::NotFound(_)), "{}", name);
        }
    }
}
