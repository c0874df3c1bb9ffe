//! Business-time accounting engine
//!
//! Pure computations over a [`WorkCalendar`](crate::calendar::WorkCalendar)
//! snapshot. Nothing in here performs I/O or takes locks.
//!
//! ## Layers
//!
//! ```text
//! ┌──────────────────────┐   per-stage segments   ┌───────────────────────┐
//! │ StageDwellAggregator │ ─────────────────────► │ filtered_business_time│
//! │  (task history)      │                        │  (reporting window)   │
//! └──────────────────────┘                        └───────────┬───────────┘
//!                                                             │ clipped
//!                                                             ▼
//!                                                 ┌───────────────────────┐
//!                                                 │ business_time         │
//!                                                 │  (day-by-day banding) │
//!                                                 └───────────────────────┘
//! ```
//!
//! [`business_time`] and [`filtered_business_time`] work in local wall-clock
//! time. [`StageDwellAggregator`] takes tracker timestamps in UTC and converts
//! them with the configured zone.
//!
//! ## Example
//!
//! ```rust
//! use boardclock_core::accounting::business_time;
//! use boardclock_core::calendar::WorkCalendar;
//! use chrono::{Duration, NaiveDate};
//!
//! let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let start = monday.and_hms_opt(8, 0, 0).unwrap();
//! let end = monday.and_hms_opt(19, 0, 0).unwrap();
//!
//! let worked = business_time(&WorkCalendar::default(), start, end).unwrap();
//! assert_eq!(worked, Duration::hours(8));
//! ```

pub mod dwell;
pub mod interval;
pub mod range;

pub use dwell::{StageDwellAggregator, StageDwellResult};
pub use interval::{business_time, classify, Band};
pub use range::{filtered_business_time, RangeRelation, ReportDateRange};
