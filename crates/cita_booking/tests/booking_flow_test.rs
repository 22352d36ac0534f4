
use cita_booking::{BookingError, BookingPhase};
use cita_common::models::SyncState;
use cita_config::SyncConfig;
use cita_db::{BookingStore, DbClient, InMemoryBookingStore, SqlBookingStore};
use fixtures::{
    booking_day, harness, harness_with, local, now, request, request_for, sweep_time, Harness,
};
use std::sync::Arc;
use std::time::Duration;

async fn offered_times(harness: &Harness) -> Vec<String> {
    harness
        .coordinator
        .availability(booking_day(), now())
        .await
        .unwrap()
        .slots
        .iter()
        .map(|s| s.label())
        .collect()
}

#[tokio::test]
async fn synced_booking_is_confirmed_and_linked() {
    let h = harness();

    let outcome = h.coordinator.create_booking(&request("10:00 AM"), now()).await.unwrap();

    assert_eq!(outcome.phase, BookingPhase::Confirmed);
    assert!(!outcome.pending_sync());
    let event_id = outcome.booking.provider_event_id.clone().unwrap();
    let created = h.calendar.created();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].0, event_id);
    assert_eq!(created[0].1.booking_id, outcome.booking.id);
    assert_eq!(created[0].1.start, local(10, 0));
    assert_eq!(created[0].1.end, local(11, 0));

    let stored = h.store.get(&outcome.booking.id).await.unwrap().unwrap();
    assert_eq!(stored.sync_state, SyncState::Synced);
}

#[tokio::test]
async fn second_booking_for_a_slot_conflicts_until_cancelled() {
    let h = harness();
    let first = h.coordinator.create_booking(&request("2:00 PM"), now()).await.unwrap();

    let err = h
        .coordinator
        .create_booking(&request_for("Luis Ortiz", "2:00 PM"), now())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SlotConflict { .. }), "{:?}", err);
    assert!(!offered_times(&h).await.contains(&"2:00 PM".to_string()));

    h.coordinator.cancel_booking(&first.booking.id).await.unwrap();
    assert!(offered_times(&h).await.contains(&"2:00 PM".to_string()));
    assert_eq!(
        h.calendar.cancelled(),
        vec![first.booking.provider_event_id.clone().unwrap()]
    );

    let rebooked = h
        .coordinator
        .create_booking(&request_for("Luis Ortiz", "2:00 PM"), now())
        .await
        .unwrap();
    assert_ne!(rebooked.booking.id, first.booking.id);
}

async fn race_for_one_slot(store: Arc<dyn BookingStore>) {
    let h = harness_with(SyncConfig::default(), store);

    let mut tasks = Vec::new();
    for i in 0..10 {
        let coordinator = h.coordinator.clone();
        tasks.push(tokio::spawn(async move {
            coordinator
                .create_booking(&request_for(&format!("Client {}", i), "11:00 AM"), now())
                .await
        }));
    }

    let mut won = 0;
    let mut conflicted = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => won += 1,
            Err(BookingError::SlotConflict { .. }) => conflicted += 1,
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }
    assert_eq!(won, 1);
    assert_eq!(conflicted, 9);
    assert_eq!(h.store.list_by_date(booking_day()).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_for_one_slot_have_one_winner_in_memory() {
    race_for_one_slot(Arc::new(InMemoryBookingStore::new())).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_for_one_slot_have_one_winner_in_sqlite() {
    let client = DbClient::from_url("sqlite::memory:").await.unwrap();
    let store = SqlBookingStore::new(client);
    store.init_schema().await.unwrap();
    race_for_one_slot(Arc::new(store)).await;
}

#[tokio::test]
async fn failed_sync_keeps_the_booking_and_the_sweep_completes_it() {
    let h = harness();
    h.calendar.fail_next_creates(1);

    let outcome = h.coordinator.create_booking(&request("9:00 AM"), now()).await.unwrap();
    assert_eq!(outcome.phase, BookingPhase::SyncPendingRetry);
    assert_eq!(outcome.booking.sync_state, SyncState::SyncFailed);
    assert_eq!(outcome.booking.sync_attempts, 1);

    // the reservation holds while the calendar is behind
    let listed = h.coordinator.list_bookings(booking_day()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].is_confirmed());
    assert!(!offered_times(&h).await.contains(&"9:00 AM".to_string()));

    let report = h.sweep.run_once(sweep_time()).await.unwrap();
    assert_eq!(report.examined, 1);
    assert_eq!(report.synced, 1);
    let stored = h.store.get(&outcome.booking.id).await.unwrap().unwrap();
    assert_eq!(stored.sync_state, SyncState::Synced);
    assert!(stored.provider_event_id.is_some());
    assert_eq!(h.calendar.create_calls(), 2);

    let again = h.sweep.run_once(sweep_time()).await.unwrap();
    assert_eq!(again.examined, 0);
    assert_eq!(h.calendar.create_calls(), 2);
    assert_eq!(h.calendar.created().len(), 1);
}

#[tokio::test]
async fn sweep_respects_backoff() {
    let h = harness();
    h.calendar.fail_next_creates(1);
    h.coordinator.create_booking(&request("9:00 AM"), now()).await.unwrap();

    let report = h.sweep.run_once(chrono::Utc::now()).await.unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(h.calendar.create_calls(), 1);
}

#[tokio::test]
async fn exhausted_bookings_are_left_alone() {
    let sync = SyncConfig {
        max_attempts: 1,
        ..Default::default()
    };
    let h = harness_with(sync, Arc::new(InMemoryBookingStore::new()));
    h.calendar.fail_next_creates(usize::MAX);
    h.coordinator.create_booking(&request("9:00 AM"), now()).await.unwrap();

    let report = h.sweep.run_once(sweep_time()).await.unwrap();
    assert_eq!(report.examined, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(h.calendar.create_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_calendar_times_out_and_sweep_links_the_event_it_created() {
    let sync = SyncConfig {
        timeout_secs: 1,
        ..Default::default()
    };
    let h = harness_with(sync, Arc::new(InMemoryBookingStore::new()));
    h.calendar.delay_creates(Duration::from_secs(30));

    let outcome = h.coordinator.create_booking(&request("3:00 PM"), now()).await.unwrap();
    assert_eq!(outcome.phase, BookingPhase::SyncPendingRetry);
    assert!(outcome.booking.provider_event_id.is_none());
    // the provider did create the event before the call was abandoned
    assert_eq!(h.calendar.created().len(), 1);

    let report = h.sweep.run_once(sweep_time()).await.unwrap();
    assert_eq!(report.synced, 1);
    assert_eq!(h.calendar.create_calls(), 1);
    let stored = h.store.get(&outcome.booking.id).await.unwrap().unwrap();
    assert_eq!(
        stored.provider_event_id.as_deref(),
        Some(h.calendar.created()[0].0.as_str())
    );
}

#[tokio::test]
async fn external_events_block_every_slot_they_touch() {
    let h = harness();
    h.calendar.add_external(local(11, 15), local(12, 30));

    let times = offered_times(&h).await;
    assert!(!times.contains(&"11:00 AM".to_string()));
    assert!(!times.contains(&"12:00 PM".to_string()));
    assert!(times.contains(&"10:00 AM".to_string()));
    assert!(times.contains(&"1:00 PM".to_string()));
    assert_eq!(times.len(), 6);

    let err = h
        .coordinator
        .create_booking(&request("12:00 PM"), now())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SlotConflict { .. }));
    assert_eq!(h.calendar.create_calls(), 0);
}

#[tokio::test]
async fn unreadable_calendar_falls_back_to_local_bookings() {
    let h = harness();
    h.calendar.add_external(local(9, 0), local(10, 0));
    h.calendar.fail_reads(true);
    h.coordinator.create_booking(&request("1:00 PM"), now()).await.unwrap();

    let day = h.coordinator.availability(booking_day(), now()).await.unwrap();
    assert!(!day.calendar_checked);
    let times: Vec<String> = day.slots.iter().map(|s| s.label()).collect();
    // the external event is invisible, the local booking is not
    assert!(times.contains(&"9:00 AM".to_string()));
    assert!(!times.contains(&"1:00 PM".to_string()));
    assert_eq!(times.len(), 7);
}

#[tokio::test]
async fn past_slots_are_not_offered() {
    let h = harness();
    let err = h
        .coordinator
        .create_booking(&request("9:00 AM"), local(12, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::SlotNotOffered(_)), "{:?}", err);
}

#[tokio::test]
async fn cancelling_twice_is_not_found() {
    let h = harness();
    let outcome = h.coordinator.create_booking(&request("4:00 PM"), now()).await.unwrap();
    h.coordinator.cancel_booking(&outcome.booking.id).await.unwrap();

    let err = h.coordinator.cancel_booking(&outcome.booking.id).await.unwrap_err();
    assert!(matches!(err, BookingError::Store(_)), "{:?}", err);
    assert_eq!(h.calendar.cancelled().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancelling_after_a_timed_out_create_removes_the_event_it_left() {
    let sync = SyncConfig {
        timeout_secs: 1,
        ..Default::default()
    };
    let h = harness_with(sync, Arc::new(InMemoryBookingStore::new()));
    h.calendar.delay_creates(Duration::from_secs(30));

    let outcome = h.coordinator.create_booking(&request("3:00 PM"), now()).await.unwrap();
    assert!(outcome.booking.provider_event_id.is_none());
    assert!(!offered_times(&h).await.contains(&"3:00 PM".to_string()));

    let cancelled = h.coordinator.cancel_booking(&outcome.booking.id).await.unwrap();
    assert_eq!(cancelled.sync_state, SyncState::Released);
    assert_eq!(h.calendar.cancelled(), vec![h.calendar.created()[0].0.clone()]);
    assert!(offered_times(&h).await.contains(&"3:00 PM".to_string()));

    let report = h.sweep.run_once(sweep_time()).await.unwrap();
    assert_eq!(report.examined, 0);
}

#[tokio::test]
async fn failed_calendar_cancel_is_retried_by_the_sweep() {
    let h = harness();
    let outcome = h.coordinator.create_booking(&request("10:00 AM"), now()).await.unwrap();
    let event_id = outcome.booking.provider_event_id.clone().unwrap();
    h.calendar.fail_next_cancels(1);

    let cancelled = h.coordinator.cancel_booking(&outcome.booking.id).await.unwrap();
    assert_eq!(cancelled.sync_state, SyncState::ReleasePending);
    assert_eq!(cancelled.sync_attempts, 1);
    assert!(h.calendar.cancelled().is_empty());
    // the event still blocks the slot in the calendar
    assert!(!offered_times(&h).await.contains(&"10:00 AM".to_string()));

    let too_early = h.sweep.run_once(chrono::Utc::now()).await.unwrap();
    assert_eq!(too_early.skipped, 1);
    assert!(h.calendar.cancelled().is_empty());

    let report = h.sweep.run_once(sweep_time()).await.unwrap();
    assert_eq!(report.examined, 1);
    assert_eq!(report.released, 1);
    assert_eq!(h.calendar.cancelled(), vec![event_id]);
    assert!(offered_times(&h).await.contains(&"10:00 AM".to_string()));
    let stored = h.store.get(&outcome.booking.id).await.unwrap().unwrap();
    assert_eq!(stored.sync_state, SyncState::Released);

    let again = h.sweep.run_once(sweep_time()).await.unwrap();
    assert_eq!(again.examined, 0);
}

#[tokio::test(start_paused = true)]
async fn booking_cancelled_while_its_event_is_created_is_still_released() {
    let sync = SyncConfig {
        timeout_secs: 60,
        ..Default::default()
    };
    let h = harness_with(sync, Arc::new(InMemoryBookingStore::new()));
    h.calendar.delay_creates(Duration::from_secs(30));

    let coordinator = h.coordinator.clone();
    let create = tokio::spawn(async move {
        coordinator.create_booking(&request("11:00 AM"), now()).await
    });
    tokio::time::sleep(Duration::from_secs(1)).await;

    let reserved = h.store.list_by_date(booking_day()).await.unwrap();
    assert_eq!(reserved.len(), 1);
    h.coordinator.cancel_booking(&reserved[0].id).await.unwrap();

    // the create answers after the cancel and links its event late
    let outcome = create.await.unwrap().unwrap();
    assert_eq!(outcome.booking.sync_state, SyncState::Released);
    let event_id = h.calendar.created()[0].0.clone();
    assert!(h.calendar.cancelled().contains(&event_id));
    assert!(offered_times(&h).await.contains(&"11:00 AM".to_string()));
}

#[tokio::test(start_paused = true)]
async fn dropped_request_still_finishes_the_calendar_sync() {
    let sync = SyncConfig {
        timeout_secs: 60,
        ..Default::default()
    };
    let h = harness_with(sync, Arc::new(InMemoryBookingStore::new()));
    h.calendar.delay_creates(Duration::from_secs(30));

    let abandoned = tokio::time::timeout(
        Duration::from_secs(5),
        h.coordinator.create_booking(&request("1:00 PM"), now()),
    )
    .await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_secs(60)).await;

    let stored = h.store.list_by_date(booking_day()).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].sync_state, SyncState::Synced);
    assert_eq!(
        stored[0].provider_event_id.as_deref(),
        Some(h.calendar.created()[0].0.as_str())
    );
}
