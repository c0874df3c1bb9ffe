//! Database layer for boardclock
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Repository pattern for queries
//! - The tracker cache that reports are selected from
//! - The stored working calendar and the last report per board

pub mod repo;
pub mod schema;

pub use repo::{Database, StoredReport};
