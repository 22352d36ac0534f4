use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use cita_booking::availability::AvailabilityIndex;
use cita_booking::planner::SlotPlanner;
use cita_booking::BusinessHours;
use cita_common::models::{Booking, CalendarOccupancy, NewBooking, Phone, ServiceCategory};
use cita_config::ScheduleConfig;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn first_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

// Helper function to create a list of external busy periods across a week
fn create_busy_periods(count: usize, minutes: i64) -> Vec<CalendarOccupancy> {
    let mut start = Utc.with_ymd_and_hms(2025, 3, 10, 13, 20, 0).unwrap();
    (0..count)
        .map(|i| {
            let end = start + Duration::minutes(minutes);
            let occupancy = CalendarOccupancy {
                event_id: format!("ext-{}", i),
                start,
                end,
                title: None,
                description: None,
            };
            start = end + Duration::minutes(95);
            occupancy
        })
        .collect()
}

// Helper function to book every other slot of a day
fn create_bookings(date: NaiveDate) -> Vec<Booking> {
    (9..17)
        .step_by(2)
        .map(|hour| {
            let new = NewBooking {
                date,
                start_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
                client_name: "Bench Client".to_string(),
                email: "bench@example.com".to_string(),
                phone: Phone::parse("787-555-1234").unwrap(),
                service: ServiceCategory::Accounting,
                notes: String::new(),
            };
            Booking::from_new(Booking::generate_id(), new, Utc::now())
        })
        .collect()
}

fn plan_week(
    hours: &BusinessHours,
    bookings: &[Booking],
    external: &[CalendarOccupancy],
    now: DateTime<Utc>,
) -> usize {
    let index = AvailabilityIndex::new(hours);
    let planner = SlotPlanner::new(hours);
    first_day()
        .iter_days()
        .take(7)
        .map(|date| {
            let local: Vec<Booking> = bookings.iter().filter(|b| b.date == date).cloned().collect();
            let occupied = index.occupied_slots(date, &local, external);
            planner.available_slots(date, &occupied, now).len()
        })
        .sum()
}

fn benchmark_available_slots(c: &mut Criterion) {
    let hours = BusinessHours::from_config(&ScheduleConfig::default()).unwrap();
    let now = Utc.with_ymd_and_hms(2025, 3, 3, 12, 0, 0).unwrap();
    let bookings: Vec<Booking> = first_day()
        .iter_days()
        .take(5)
        .flat_map(create_bookings)
        .collect();

    let mut group = c.benchmark_group("available_slots");

    group.bench_function("empty_week", |b| {
        b.iter(|| plan_week(black_box(&hours), black_box(&[]), black_box(&[]), black_box(now)))
    });

    let few = create_busy_periods(5, 45);
    group.bench_function("few_external_events", |b| {
        b.iter(|| plan_week(black_box(&hours), black_box(&bookings), black_box(&few), black_box(now)))
    });

    let many = create_busy_periods(100, 30);
    group.bench_function("many_external_events", |b| {
        b.iter(|| plan_week(black_box(&hours), black_box(&bookings), black_box(&many), black_box(now)))
    });

    group.finish();
}

criterion_group!(benches, benchmark_available_slots);
criterion_main!(benches);
