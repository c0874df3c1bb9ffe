//! # boardclock-core
//!
//! Core library for boardclock - business-time reports for Trello boards.
//!
//! This library provides:
//! - A working calendar (work hours, lunch break, work week)
//! - Business-time accounting of intervals, clipped to a reporting window
//! - Per-stage dwell time of tasks from their move history
//! - Report building over a local cache of the tracker
//! - Database storage layer with SQLite
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through three layers:
//! - **Tracker:** boards, lists and cards on Trello, plus each card's moves
//! - **Cache:** boards, stages, tasks and people mirrored into SQLite by
//!   [`sync::CacheSync`]
//! - **Reports:** rows computed by [`report::ReportBuilder`] from cached
//!   tasks and freshly fetched histories, stored per board
//!
//! ## Example
//!
//! ```rust,no_run
//! use boardclock_core::{Config, Database};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Open database
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! // The stored calendar wins over the configured seed
//! let calendar = match db.load_calendar().expect("failed to read calendar") {
//!     Some(calendar) => calendar,
//!     None => config.calendar.to_calendar().expect("invalid calendar"),
//! };
//! println!("{} per day", boardclock_core::format::format_duration(calendar.daily_work_duration()));
//! ```

// Re-export commonly used items at the crate root
pub use calendar::{CalendarHandle, WorkCalendar};
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use report::{Report, ReportBuilder, ReportRequest};
pub use sync::{CacheSync, SyncResult};
pub use types::*;

// Public modules
pub mod accounting;
pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod format;
pub mod logging;
pub mod report;
pub mod sync;
pub mod tracker;
pub mod types;
