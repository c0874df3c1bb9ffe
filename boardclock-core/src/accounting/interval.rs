//! Business time between two local timestamps.

use crate::calendar::WorkCalendar;
use crate::error::{Error, Result};
use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_DAY: i64 = 86_400 * NANOS_PER_SECOND;

/// Where a time of day falls relative to the work day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Band {
    /// Before the work day starts
    Before,
    /// From work start up to lunch
    Morning,
    /// During lunch
    Lunch,
    /// From the end of lunch up to the end of the work day
    Afternoon,
    /// At or after the end of the work day
    After,
}

/// Work-day bounds in nanoseconds from midnight.
#[derive(Debug, Clone, Copy)]
struct DayBounds {
    work_start: i64,
    lunch_start: i64,
    lunch_end: i64,
    work_end: i64,
    daily: i64,
}

impl DayBounds {
    fn of(calendar: &WorkCalendar) -> Self {
        let work_start = nanos_of(calendar.work_day_start());
        let lunch_start = nanos_of(calendar.lunch_start());
        let lunch_end = nanos_of(calendar.lunch_end());
        let work_end = nanos_of(calendar.work_day_end());
        Self {
            work_start,
            lunch_start,
            lunch_end,
            work_end,
            daily: (work_end - work_start) - (lunch_end - lunch_start),
        }
    }

    fn band(&self, t: i64) -> Band {
        if t < self.work_start {
            Band::Before
        } else if t < self.lunch_start {
            Band::Morning
        } else if t < self.lunch_end {
            Band::Lunch
        } else if t < self.work_end {
            Band::Afternoon
        } else {
            Band::After
        }
    }

    /// Business nanoseconds within `[s, e]` of a single work day.
    fn contribution(&self, s: i64, e: i64) -> i64 {
        use Band::*;

        let Self {
            work_start: ws,
            lunch_start: ls,
            lunch_end: le,
            work_end: we,
            daily,
        } = *self;

        let nanos = match (self.band(s), self.band(e)) {
            (Before, Before) => 0,
            (Before, Morning) => e - ws,
            (Before, Lunch) => ls - ws,
            (Before, Afternoon) => (ls - ws) + (e - le),
            (Before, After) => daily,

            (Morning, Morning) => e - s,
            (Morning, Lunch) => ls - s,
            (Morning, Afternoon) => (ls - s) + (e - le),
            (Morning, After) => (ls - s) + (we - le),

            (Lunch, Lunch) => 0,
            (Lunch, Afternoon) => e - le,
            (Lunch, After) => we - le,

            (Afternoon, Afternoon) => e - s,
            (Afternoon, After) => we - s,

            (After, After) => 0,

            // End band earlier than start band: only reachable when lunch
            // lies outside the work day
            _ => 0,
        };

        nanos.clamp(0, e - s)
    }
}

/// Sub-second precision is kept; tracker timestamps carry milliseconds.
fn nanos_of(t: NaiveTime) -> i64 {
    i64::from(t.num_seconds_from_midnight()) * NANOS_PER_SECOND + i64::from(t.nanosecond())
}

/// Classify a time of day against the calendar.
pub fn classify(calendar: &WorkCalendar, t: NaiveTime) -> Band {
    DayBounds::of(calendar).band(nanos_of(t))
}

/// Business time between `start` and `end`, both in local wall-clock time.
///
/// Every calendar day touched by the interval contributes the part of it that
/// lies in the morning or afternoon band, provided the day is a work day.
/// The result never exceeds `end - start`.
pub fn business_time(
    calendar: &WorkCalendar,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Duration> {
    if start > end {
        return Err(Error::InvalidRange(format!(
            "interval start {} is after its end {}",
            start, end
        )));
    }

    let bounds = DayBounds::of(calendar);
    let last_day = end.date();
    let mut day = start.date();
    let mut total = 0i64;

    loop {
        if calendar.is_work_day(day) {
            let s = if day == start.date() {
                nanos_of(start.time())
            } else {
                0
            };
            let e = if day == last_day {
                nanos_of(end.time())
            } else {
                NANOS_PER_DAY
            };
            total += bounds.contribution(s, e);
        }

        if day >= last_day {
            break;
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    Ok(Duration::nanoseconds(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    // 2024-01-01 is a Monday
    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn calc(start: NaiveDateTime, end: NaiveDateTime) -> Duration {
        business_time(&WorkCalendar::default(), start, end).unwrap()
    }

    #[test]
    fn test_full_monday() {
        assert_eq!(calc(at(1, 8, 0), at(1, 19, 0)), Duration::hours(8));
    }

    #[test]
    fn test_across_weekend() {
        // Friday 17:30 -> Monday 09:30
        assert_eq!(calc(at(5, 17, 30), at(8, 9, 30)), Duration::hours(1));
    }

    #[test]
    fn test_within_morning() {
        assert_eq!(calc(at(1, 9, 15), at(1, 11, 45)), Duration::minutes(150));
    }

    #[test]
    fn test_lunch_is_excluded() {
        assert_eq!(calc(at(1, 12, 0), at(1, 15, 0)), Duration::hours(2));
        assert_eq!(calc(at(1, 13, 10), at(1, 13, 50)), Duration::zero());
        assert_eq!(calc(at(1, 13, 30), at(1, 14, 30)), Duration::minutes(30));
        assert_eq!(calc(at(1, 13, 30), at(1, 20, 0)), Duration::hours(4));
    }

    #[test]
    fn test_band_table() {
        // (start, end) on Monday -> expected minutes
        let cases = [
            ((7, 0), (8, 0), 0),
            ((7, 0), (10, 0), 60),
            ((7, 0), (13, 30), 240),
            ((7, 0), (15, 0), 300),
            ((7, 0), (18, 0), 480),
            ((10, 0), (12, 0), 120),
            ((10, 0), (13, 30), 180),
            ((10, 0), (16, 0), 300),
            ((10, 0), (19, 0), 420),
            ((13, 15), (13, 45), 0),
            ((13, 15), (16, 0), 120),
            ((13, 15), (23, 0), 240),
            ((15, 0), (16, 30), 90),
            ((15, 0), (21, 0), 180),
            ((18, 0), (23, 59), 0),
            ((19, 0), (20, 0), 0),
        ];

        for ((sh, sm), (eh, em), minutes) in cases {
            assert_eq!(
                calc(at(1, sh, sm), at(1, eh, em)),
                Duration::minutes(minutes),
                "{:02}:{:02} -> {:02}:{:02}",
                sh,
                sm,
                eh,
                em
            );
        }
    }

    #[test]
    fn test_band_edges() {
        assert_eq!(calc(at(1, 9, 0), at(1, 9, 0)), Duration::zero());
        assert_eq!(calc(at(1, 9, 0), at(1, 13, 0)), Duration::hours(4));
        assert_eq!(calc(at(1, 13, 0), at(1, 14, 0)), Duration::zero());
        assert_eq!(calc(at(1, 14, 0), at(1, 18, 0)), Duration::hours(4));
        assert_eq!(calc(at(1, 18, 0), at(1, 18, 0)), Duration::zero());
    }

    #[test]
    fn test_multi_day() {
        // Monday 16:00 -> Wednesday 10:00: 2h + 8h + 1h
        assert_eq!(calc(at(1, 16, 0), at(3, 10, 0)), Duration::hours(11));
        // Whole work week
        assert_eq!(calc(at(1, 0, 0), at(8, 0, 0)), Duration::hours(40));
    }

    #[test]
    fn test_ends_at_midnight() {
        assert_eq!(calc(at(1, 17, 0), at(2, 0, 0)), Duration::hours(1));
    }

    #[test]
    fn test_weekend_is_zero() {
        assert_eq!(calc(at(6, 0, 0), at(6, 23, 59)), Duration::zero());
        assert_eq!(calc(at(6, 10, 0), at(7, 15, 0)), Duration::zero());
    }

    #[test]
    fn test_six_day_week_counts_saturday() {
        let mut cal = WorkCalendar::default();
        cal.set_work_days_per_week(6).unwrap();
        let total = business_time(&cal, at(6, 0, 0), at(7, 23, 0)).unwrap();
        assert_eq!(total, Duration::hours(8));
    }

    #[test]
    fn test_inverted_interval_is_rejected() {
        let err = business_time(&WorkCalendar::default(), at(2, 0, 0), at(1, 0, 0)).unwrap_err();
        assert!(matches!(err, Error::InvalidRange(_)));
    }

    #[test]
    fn test_classify() {
        let cal = WorkCalendar::default();
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        assert_eq!(classify(&cal, t(8, 59)), Band::Before);
        assert_eq!(classify(&cal, t(9, 0)), Band::Morning);
        assert_eq!(classify(&cal, t(13, 0)), Band::Lunch);
        assert_eq!(classify(&cal, t(14, 0)), Band::Afternoon);
        assert_eq!(classify(&cal, t(18, 0)), Band::After);
    }

    #[test]
    fn test_lunch_outside_work_day_stays_bounded() {
        let mut cal = WorkCalendar::default();
        cal.set_lunch_hours(
            NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
        )
        .unwrap();

        let start = at(1, 10, 0);
        let end = at(1, 11, 0);
        let total = business_time(&cal, start, end).unwrap();
        assert!(total >= Duration::zero());
        assert!(total <= end - start);
    }

    #[test]
    fn test_sub_second_endpoints_keep_precision() {
        let ms = |h, m, sec, milli| {
            NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_milli_opt(h, m, sec, milli)
                .unwrap()
        };

        // 0.2s straddling a second boundary
        assert_eq!(
            calc(ms(10, 15, 0, 900), ms(10, 15, 1, 100)),
            Duration::milliseconds(200)
        );
        // 0.4s inside one second
        assert_eq!(
            calc(ms(10, 15, 0, 100), ms(10, 15, 0, 500)),
            Duration::milliseconds(400)
        );
        // Starts 0.25s before lunch
        assert_eq!(
            calc(ms(12, 59, 59, 750), ms(13, 30, 0, 0)),
            Duration::milliseconds(250)
        );
    }
}
