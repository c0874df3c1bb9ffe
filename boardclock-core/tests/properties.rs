//! Property tests for business-time accounting

use boardclock_core::accounting::{
    business_time, filtered_business_time, ReportDateRange, StageDwellAggregator,
};
use boardclock_core::types::{StageTransitionEvent, TaskHistory};
use boardclock_core::WorkCalendar;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use proptest::prelude::*;

/// Three weeks of minutes starting Monday 2024-01-01
const SPAN_MINUTES: i64 = 60 * 24 * 21;

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn at(minutes: i64) -> NaiveDateTime {
    base() + Duration::minutes(minutes)
}

fn utc(minutes: i64) -> DateTime<Utc> {
    Utc.from_utc_datetime(&at(minutes))
}

/// Two ordered instants
fn interval() -> impl Strategy<Value = (i64, i64)> {
    (0..SPAN_MINUTES, 0..SPAN_MINUTES).prop_map(|(a, b)| (a.min(b), a.max(b)))
}

fn at_ms(millis: i64) -> NaiveDateTime {
    base() + Duration::milliseconds(millis)
}

/// Two ordered instants with millisecond precision, at most a day apart
fn fine_interval() -> impl Strategy<Value = (i64, i64)> {
    (0..SPAN_MINUTES * 60_000, 0..86_400_000i64).prop_map(|(s, len)| (s, s + len))
}

fn calendar() -> impl Strategy<Value = WorkCalendar> {
    (6u32..10, 15u32..20, 11u32..14, 1u8..=7).prop_map(|(ws, we, ls, days)| {
        let t = |h| chrono::NaiveTime::from_hms_opt(h, 0, 0).unwrap();
        WorkCalendar::new(t(ws), t(we), t(ls), t(ls + 1), days).unwrap()
    })
}

proptest! {
    #[test]
    fn prop_never_exceeds_elapsed((s, e) in interval(), cal in calendar()) {
        let worked = business_time(&cal, at(s), at(e)).unwrap();
        prop_assert!(worked >= Duration::zero());
        prop_assert!(worked <= at(e) - at(s));
    }

    #[test]
    fn prop_millisecond_endpoints_never_exceed_elapsed((s, e) in fine_interval(), cal in calendar()) {
        let worked = business_time(&cal, at_ms(s), at_ms(e)).unwrap();
        prop_assert!(worked >= Duration::zero());
        prop_assert!(worked <= at_ms(e) - at_ms(s));
    }

    #[test]
    fn prop_millisecond_split_is_additive((s, e) in fine_interval(), cut in 0.0f64..=1.0) {
        let cal = WorkCalendar::default();
        let m = s + ((e - s) as f64 * cut) as i64;

        let whole = business_time(&cal, at_ms(s), at_ms(e)).unwrap();
        let left = business_time(&cal, at_ms(s), at_ms(m)).unwrap();
        let right = business_time(&cal, at_ms(m), at_ms(e)).unwrap();
        prop_assert_eq!(left + right, whole);
    }

    #[test]
    fn prop_split_is_additive((s, e) in interval(), cut in 0.0f64..=1.0) {
        let cal = WorkCalendar::default();
        let m = s + ((e - s) as f64 * cut) as i64;

        let whole = business_time(&cal, at(s), at(e)).unwrap();
        let left = business_time(&cal, at(s), at(m)).unwrap();
        let right = business_time(&cal, at(m), at(e)).unwrap();
        prop_assert_eq!(left + right, whole);
    }

    #[test]
    fn prop_weekend_is_zero(week in 0i64..3, from in 0i64..2880, len in 0i64..2880) {
        let cal = WorkCalendar::default();
        let saturday = week * 7 * 1440 + 5 * 1440;
        let s = saturday + from;
        let e = (s + len).min(saturday + 2 * 1440 - 1);
        prop_assume!(s <= e);
        prop_assert_eq!(at(s).weekday(), if from < 1440 { Weekday::Sat } else { Weekday::Sun });

        prop_assert_eq!(business_time(&cal, at(s), at(e)).unwrap(), Duration::zero());
    }

    #[test]
    fn prop_no_range_is_identity((s, e) in interval(), cal in calendar()) {
        prop_assert_eq!(
            filtered_business_time(&cal, None, at(s), at(e)).unwrap(),
            business_time(&cal, at(s), at(e)).unwrap()
        );
    }

    #[test]
    fn prop_range_never_adds_time((s, e) in interval(), (rs, re) in interval()) {
        let cal = WorkCalendar::default();
        let range = ReportDateRange::new(at(rs), at(re)).unwrap();
        let clipped = filtered_business_time(&cal, Some(&range), at(s), at(e)).unwrap();
        prop_assert!(clipped <= business_time(&cal, at(s), at(e)).unwrap());
    }

    #[test]
    fn prop_partition_is_complete(
        created in 0i64..SPAN_MINUTES / 2,
        moves in prop::collection::vec(0i64..SPAN_MINUTES, 0..12),
        stages in prop::collection::vec(0usize..4, 12),
    ) {
        let cal = WorkCalendar::default();
        let names = ["Todo", "Doing", "Review", "Done"];
        let transitions: Vec<_> = moves
            .iter()
            .enumerate()
            .map(|(i, m)| StageTransitionEvent {
                timestamp: utc(*m),
                source_stage_id: names[stages[i]].to_string(),
                destination_stage_id: names[stages[(i + 1) % stages.len()]].to_string(),
            })
            .collect();
        let history = TaskHistory {
            task_id: "task".to_string(),
            created_at: utc(created),
            current_stage_id: "Todo".to_string(),
            closed_at: None,
            transitions,
        };
        let now = utc(SPAN_MINUTES);

        let result = StageDwellAggregator::new(&cal, Tz::UTC, None)
            .aggregate(&history, now)
            .unwrap();

        let expected = business_time(&cal, at(created), at(SPAN_MINUTES)).unwrap();
        prop_assert_eq!(result.total(), expected);
    }
}
