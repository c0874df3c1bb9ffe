//! Clipping intervals to a reporting window.

use super::interval::business_time;
use crate::calendar::WorkCalendar;
use crate::error::{Error, Result};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Reporting window in local wall-clock time, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDateRange {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl ReportDateRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidRange(format!(
                "report range start {} is after its end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }
}

/// How an interval relates to a reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeRelation {
    /// Ends before the window opens
    Before,
    /// Starts before the window and ends inside it
    OverlapsStart,
    /// Starts before the window and ends at or after its close
    Covers,
    /// Lies entirely within the window
    Inside,
    /// Starts inside the window and ends after it
    OverlapsEnd,
    /// Starts at or after the window's close
    After,
}

impl RangeRelation {
    /// First matching relation wins; every interval matches exactly one.
    pub fn classify(range: &ReportDateRange, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        let (fs, fe) = (range.start, range.end);

        if end < fs {
            RangeRelation::Before
        } else if start < fs && end < fe {
            RangeRelation::OverlapsStart
        } else if start < fs {
            RangeRelation::Covers
        } else if start < fe && end <= fe {
            RangeRelation::Inside
        } else if start < fe {
            RangeRelation::OverlapsEnd
        } else {
            RangeRelation::After
        }
    }

    /// The part of `[start, end]` that lies in the window, if any.
    pub fn clip(
        self,
        range: &ReportDateRange,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Option<(NaiveDateTime, NaiveDateTime)> {
        match self {
            RangeRelation::Before | RangeRelation::After => None,
            RangeRelation::OverlapsStart => Some((range.start, end)),
            RangeRelation::Covers => Some((range.start, range.end)),
            RangeRelation::Inside => Some((start, end)),
            RangeRelation::OverlapsEnd => Some((start, range.end)),
        }
    }
}

/// Business time of `[start, end]` restricted to `range`.
///
/// Without a range this is plain [`business_time`].
pub fn filtered_business_time(
    calendar: &WorkCalendar,
    range: Option<&ReportDateRange>,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<Duration> {
    if start > end {
        return Err(Error::InvalidRange(format!(
            "interval start {} is after its end {}",
            start, end
        )));
    }

    let Some(range) = range else {
        return business_time(calendar, start, end);
    };

    match RangeRelation::classify(range, start, end).clip(range, start, end) {
        Some((s, e)) => business_time(calendar, s, e),
        None => Ok(Duration::zero()),
    }
}
