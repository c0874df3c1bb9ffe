//! Error types for boardclock-core

use thiserror::Error;

/// Main error type for the boardclock-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed bound: calendar window with start >= end, or an interval
    /// whose start lies after its end
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// Configuration value outside its domain
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// Fetching a task's history from the tracker failed
    #[error("failed to fetch task {task_id}: {message}")]
    TransientFetch { task_id: String, message: String },

    /// Tracker API error
    #[error("tracker error: {0}")]
    Tracker(String),
}

/// Result type alias for boardclock-core
pub type Result<T> = std::result::Result<T, Error>;
