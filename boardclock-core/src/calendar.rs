//! Working-time calendar
//!
//! A [`WorkCalendar`] describes when business time accrues: the bounds of the
//! work day, a lunch break that does not count, and how many days of the week
//! (starting Monday) are work days. The derived daily and weekly totals are
//! kept in the same value and are recomputed by every setter.
//!
//! The process shares one calendar through a [`CalendarHandle`]. Readers take
//! an `Arc` snapshot and compute without holding any lock; writers apply a
//! change to a private copy and swap it in only when validation passes.

use crate::error::{Error, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use std::sync::{Arc, RwLock};

/// Working hours, lunch break and work week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkCalendar {
    work_day_start: NaiveTime,
    work_day_end: NaiveTime,
    lunch_start: NaiveTime,
    lunch_end: NaiveTime,
    work_days_per_week: u8,
    daily_work_duration: Duration,
    weekly_work_duration: Duration,
}

impl Default for WorkCalendar {
    fn default() -> Self {
        let work_day_start = hms(9, 0, 0);
        let work_day_end = hms(18, 0, 0);
        let lunch_start = hms(13, 0, 0);
        let lunch_end = hms(14, 0, 0);
        let daily = daily_duration(work_day_start, work_day_end, lunch_start, lunch_end);

        Self {
            work_day_start,
            work_day_end,
            lunch_start,
            lunch_end,
            work_days_per_week: 5,
            daily_work_duration: daily,
            weekly_work_duration: daily * 5,
        }
    }
}

fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, s).unwrap_or_default()
}

fn daily_duration(
    work_day_start: NaiveTime,
    work_day_end: NaiveTime,
    lunch_start: NaiveTime,
    lunch_end: NaiveTime,
) -> Duration {
    (work_day_end - work_day_start) - (lunch_end - lunch_start)
}

fn check_window(what: &str, start: NaiveTime, end: NaiveTime) -> Result<()> {
    if start >= end {
        return Err(Error::InvalidRange(format!(
            "{} start {} must be before end {}",
            what, start, end
        )));
    }
    Ok(())
}

fn check_work_days(n: u8) -> Result<()> {
    if !(1..=7).contains(&n) {
        return Err(Error::InvalidValue(format!(
            "work days per week must be between 1 and 7, got {}",
            n
        )));
    }
    Ok(())
}

impl WorkCalendar {
    /// Build a calendar from explicit bounds, validating every field.
    pub fn new(
        work_day_start: NaiveTime,
        work_day_end: NaiveTime,
        lunch_start: NaiveTime,
        lunch_end: NaiveTime,
        work_days_per_week: u8,
    ) -> Result<Self> {
        check_window("work day", work_day_start, work_day_end)?;
        check_window("lunch", lunch_start, lunch_end)?;
        check_work_days(work_days_per_week)?;

        let daily = daily_duration(work_day_start, work_day_end, lunch_start, lunch_end);
        Ok(Self {
            work_day_start,
            work_day_end,
            lunch_start,
            lunch_end,
            work_days_per_week,
            daily_work_duration: daily,
            weekly_work_duration: daily * i32::from(work_days_per_week),
        })
    }

    /// Change the work day bounds.
    pub fn set_work_hours(&mut self, start: NaiveTime, end: NaiveTime) -> Result<()> {
        check_window("work day", start, end)?;

        let daily = daily_duration(start, end, self.lunch_start, self.lunch_end);
        self.work_day_start = start;
        self.work_day_end = end;
        self.daily_work_duration = daily;
        self.weekly_work_duration = daily * i32::from(self.work_days_per_week);
        Ok(())
    }

    /// Change the lunch break.
    ///
    /// The break is only checked against itself. A break outside the work day
    /// is accepted and yields a daily total that callers should treat as
    /// advisory.
    pub fn set_lunch_hours(&mut self, start: NaiveTime, end: NaiveTime) -> Result<()> {
        check_window("lunch", start, end)?;

        let daily = daily_duration(self.work_day_start, self.work_day_end, start, end);
        self.lunch_start = start;
        self.lunch_end = end;
        self.daily_work_duration = daily;
        self.weekly_work_duration = daily * i32::from(self.work_days_per_week);
        Ok(())
    }

    /// Change how many days, counted from Monday, are work days.
    pub fn set_work_days_per_week(&mut self, n: u8) -> Result<()> {
        check_work_days(n)?;

        self.work_days_per_week = n;
        self.weekly_work_duration = self.daily_work_duration * i32::from(n);
        Ok(())
    }

    /// Whether business time accrues on this date.
    pub fn is_work_day(&self, date: NaiveDate) -> bool {
        date.weekday().num_days_from_monday() < u32::from(self.work_days_per_week)
    }

    pub fn work_day_start(&self) -> NaiveTime {
        self.work_day_start
    }

    pub fn work_day_end(&self) -> NaiveTime {
        self.work_day_end
    }

    pub fn lunch_start(&self) -> NaiveTime {
        self.lunch_start
    }

    pub fn lunch_end(&self) -> NaiveTime {
        self.lunch_end
    }

    pub fn work_days_per_week(&self) -> u8 {
        self.work_days_per_week
    }

    /// Length of the work day without lunch.
    pub fn daily_work_duration(&self) -> Duration {
        self.daily_work_duration
    }

    /// `daily_work_duration` times the number of work days.
    pub fn weekly_work_duration(&self) -> Duration {
        self.weekly_work_duration
    }

    /// Length of the lunch break.
    pub fn lunch_duration(&self) -> Duration {
        self.lunch_end - self.lunch_start
    }
}

/// Process-wide holder of the current calendar snapshot.
#[derive(Debug, Default)]
pub struct CalendarHandle {
    current: RwLock<Arc<WorkCalendar>>,
}

impl CalendarHandle {
    pub fn new(calendar: WorkCalendar) -> Self {
        Self {
            current: RwLock::new(Arc::new(calendar)),
        }
    }

    /// Current calendar. The snapshot stays valid after later updates.
    pub fn snapshot(&self) -> Arc<WorkCalendar> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Apply `change` to a copy of the current calendar and publish it.
    ///
    /// Nothing is published when `change` fails.
    pub fn update<F>(&self, change: F) -> Result<Arc<WorkCalendar>>
    where
        F: FnOnce(&mut WorkCalendar) -> Result<()>,
    {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut next = WorkCalendar::clone(&guard);
        change(&mut next)?;

        let next = Arc::new(next);
        *guard = Arc::clone(&next);
        tracing::debug!(
            daily = %crate::format::format_duration(next.daily_work_duration()),
            work_days = next.work_days_per_week(),
            "Calendar updated"
        );
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_default_calendar() {
        let cal = WorkCalendar::default();
        assert_eq!(cal.work_day_start(), t(9, 0));
        assert_eq!(cal.work_day_end(), t(18, 0));
        assert_eq!(cal.lunch_start(), t(13, 0));
        assert_eq!(cal.lunch_end(), t(14, 0));
        assert_eq!(cal.work_days_per_week(), 5);
        assert_eq!(cal.daily_work_duration(), Duration::hours(8));
        assert_eq!(cal.weekly_work_duration(), Duration::hours(40));
    }

    #[test]
    fn test_set_work_hours_recomputes_totals() {
        let mut cal = WorkCalendar::default();
        cal.set_work_hours(t(8, 0), t(17, 30)).unwrap();

        assert_eq!(cal.daily_work_duration(), Duration::minutes(8 * 60 + 30));
        assert_eq!(cal.weekly_work_duration(), Duration::minutes(5 * (8 * 60 + 30)));
    }

    #[test]
    fn test_invalid_work_hours_keep_previous_state() {
        let mut cal = WorkCalendar::default();
        let before = cal.clone();

        let err = cal.set_work_hours(t(18, 0), t(9, 0)).unwrap_err();
        assert!(matches!(err, Error::InvalidRange(_)));
        assert!(cal.set_work_hours(t(9, 0), t(9, 0)).is_err());
        assert_eq!(cal, before);
    }

    #[test]
    fn test_set_lunch_hours() {
        let mut cal = WorkCalendar::default();
        cal.set_lunch_hours(t(12, 30), t(13, 0)).unwrap();
        assert_eq!(cal.lunch_duration(), Duration::minutes(30));
        assert_eq!(cal.daily_work_duration(), Duration::minutes(8 * 60 + 30));

        let before = cal.clone();
        assert!(matches!(
            cal.set_lunch_hours(t(14, 0), t(13, 0)),
            Err(Error::InvalidRange(_))
        ));
        assert_eq!(cal, before);
    }

    #[test]
    fn test_lunch_outside_work_day_is_accepted() {
        let mut cal = WorkCalendar::default();
        cal.set_lunch_hours(t(19, 0), t(21, 0)).unwrap();
        // 9h day minus a 2h break that never overlaps it
        assert_eq!(cal.daily_work_duration(), Duration::hours(7));
    }

    #[test]
    fn test_set_work_days() {
        let mut cal = WorkCalendar::default();
        cal.set_work_days_per_week(6).unwrap();
        assert_eq!(cal.weekly_work_duration(), Duration::hours(48));

        for bad in [0, 8, 200] {
            assert!(matches!(
                cal.set_work_days_per_week(bad),
                Err(Error::InvalidValue(_))
            ));
        }
        assert_eq!(cal.work_days_per_week(), 6);
    }

    #[test]
    fn test_setters_are_idempotent() {
        let mut once = WorkCalendar::default();
        once.set_work_hours(t(10, 0), t(19, 0)).unwrap();
        once.set_lunch_hours(t(14, 0), t(15, 0)).unwrap();
        once.set_work_days_per_week(4).unwrap();

        let mut twice = once.clone();
        twice.set_work_hours(t(10, 0), t(19, 0)).unwrap();
        twice.set_lunch_hours(t(14, 0), t(15, 0)).unwrap();
        twice.set_work_days_per_week(4).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_new_validates() {
        assert!(WorkCalendar::new(t(9, 0), t(18, 0), t(13, 0), t(14, 0), 5).is_ok());
        assert!(WorkCalendar::new(t(18, 0), t(9, 0), t(13, 0), t(14, 0), 5).is_err());
        assert!(WorkCalendar::new(t(9, 0), t(18, 0), t(14, 0), t(13, 0), 5).is_err());
        assert!(WorkCalendar::new(t(9, 0), t(18, 0), t(13, 0), t(14, 0), 0).is_err());
    }

    #[test]
    fn test_is_work_day() {
        let cal = WorkCalendar::default();
        // 2024-01-01 is a Monday
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let friday = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let saturday = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();

        assert!(cal.is_work_day(monday));
        assert!(cal.is_work_day(friday));
        assert!(!cal.is_work_day(saturday));
        assert!(!cal.is_work_day(sunday));
    }

    #[test]
    fn test_handle_swaps_snapshot() {
        let handle = CalendarHandle::default();
        let before = handle.snapshot();

        handle
            .update(|cal| cal.set_work_days_per_week(3))
            .unwrap();

        assert_eq!(before.work_days_per_week(), 5);
        assert_eq!(handle.snapshot().work_days_per_week(), 3);
    }

    #[test]
    fn test_handle_rejects_failed_update() {
        let handle = CalendarHandle::default();

        let result = handle.update(|cal| {
            cal.set_work_days_per_week(6)?;
            cal.set_work_hours(t(12, 0), t(11, 0))
        });

        assert!(result.is_err());
        // The first change happened on the discarded copy only
        assert_eq!(handle.snapshot().work_days_per_week(), 5);
    }
}
