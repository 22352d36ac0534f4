#[cfg(test)]
mod tests {
    use crate::error::NormalizeError;
    use crate::normalizer::{parse_date, parse_time12, TimeNormalizer};
    use chrono::{NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
    use chrono_tz::America::Puerto_Rico;
    use cita_common::models::TimeSlot;
    use proptest::prelude::*;

    fn normalizer() -> TimeNormalizer {
        TimeNormalizer::new(Puerto_Rico)
    }

    #[test]
    fn converts_to_utc_with_fixed_offset() {
        let instant = normalizer().normalize("2025-03-10", "10:00 AM").unwrap();
        assert_eq!(instant, Utc.with_ymd_and_hms(2025, 3, 10, 14, 0, 0).unwrap());

        // no daylight saving in Puerto Rico
        let summer = normalizer().normalize("2025-07-10", "10:00 AM").unwrap();
        assert_eq!(summer, Utc.with_ymd_and_hms(2025, 7, 10, 14, 0, 0).unwrap());
    }

    #[test]
    fn twelve_oclock_edges() {
        assert_eq!(parse_time12("12:00 AM").unwrap(), NaiveTime::from_hms_opt(0, 0, 0).unwrap());
        assert_eq!(parse_time12("12:30 PM").unwrap(), NaiveTime::from_hms_opt(12, 30, 0).unwrap());
        assert_eq!(parse_time12("1:05 PM").unwrap(), NaiveTime::from_hms_opt(13, 5, 0).unwrap());
        assert_eq!(parse_time12("11:59 AM").unwrap(), NaiveTime::from_hms_opt(11, 59, 0).unwrap());
    }

    #[test]
    fn lenient_about_case_and_spacing() {
        let expected = NaiveTime::from_hms_opt(15, 0, 0).unwrap();
        assert_eq!(parse_time12("3:00pm").unwrap(), expected);
        assert_eq!(parse_time12(" 03:00 PM ").unwrap(), expected);
    }

    #[test]
    fn impossible_calendar_date_is_malformed() {
        let err = normalizer().normalize("2024-02-30", "10:00 AM").unwrap_err();
        assert!(matches!(err, NormalizeError::MalformedInput(_)));
        // 2024 is a leap year
        assert!(parse_date("2024-02-29").is_ok());
        assert!(parse_date("2025-02-29").is_err());
    }

    #[test]
    fn rejects_out_of_range_or_garbled_times() {
        for raw in [
            "0:30 AM", "13:00 PM", "10:60 AM", "10:5 AM", "10 AM", "10:00", "10:00 XM", "",
            "+1:00 PM", "10:00 AM PM", "١٠:٠٠ AM",
        ] {
            assert!(parse_time12(raw).is_err(), "{} should be rejected", raw);
        }
    }

    #[test]
    fn rejects_garbled_dates() {
        for raw in ["2025/03/10", "10-03-2025", "2025-13-01", "tomorrow", ""] {
            assert!(parse_date(raw).is_err(), "{} should be rejected", raw);
        }
    }

    proptest! {
        #[test]
        fn wall_clock_round_trips_through_the_instant(
            hour in 1u32..=12,
            minute in 0u32..60,
            pm in any::<bool>(),
            day_offset in 0i64..730,
        ) {
            let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(day_offset);
            let period = if pm { "PM" } else { "AM" };
            let raw = format!("{}:{:02} {}", hour, minute, period);

            let instant = normalizer()
                .normalize(&date.format("%Y-%m-%d").to_string(), &raw)
                .unwrap();
            let local = normalizer().to_local(instant);

            prop_assert_eq!(local.date(), date);
            prop_assert_eq!(TimeSlot::new(local.date(), local.time()).label(), raw);
            let (is_pm, hour12) = local.time().hour12();
            prop_assert_eq!(is_pm, pm);
            prop_assert_eq!(hour12, hour);
        }
    }
}
