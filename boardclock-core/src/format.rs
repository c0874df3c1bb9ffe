//! Formatting and parsing helpers shared by the store and the CLIs.

use crate::error::{Error, Result};
use chrono::{Duration, NaiveDateTime, NaiveTime};

/// Format a duration as `H:MM:SS`; hours are not wrapped at 24.
///
/// Negative durations keep their sign (`-1:00:00`).
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    let (minutes, seconds) = (total / 60, total % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    format!("{}{}:{:02}:{:02}", sign, hours, minutes, seconds)
}

/// Parse a duration written by [`format_duration`].
pub fn parse_duration(s: &str) -> Result<Duration> {
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };

    let parts: Vec<&str> = body.split(':').collect();
    if parts.len() != 3 {
        return Err(Error::InvalidValue(format!(
            "expected H:MM:SS duration, got {:?}",
            s
        )));
    }

    let mut fields = [0i64; 3];
    for (slot, part) in fields.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| Error::InvalidValue(format!("invalid duration {:?}", s)))?;
    }

    let secs = fields[0] * 3600 + fields[1] * 60 + fields[2];
    Ok(Duration::seconds(if negative { -secs } else { secs }))
}

/// Format a time of day as `HH:MM:SS`.
pub fn format_time_of_day(t: NaiveTime) -> String {
    t.format("%H:%M:%S").to_string()
}

/// Parse `HH:MM:SS` or `HH:MM`.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|e| Error::InvalidValue(format!("invalid time of day {:?}: {}", s, e)))
}

/// Parse a local timestamp given as `YYYY-MM-DD HH:MM[:SS]`, with either a
/// space or a `T` between date and time, or a bare date (start of day).
pub fn parse_local_datetime(s: &str) -> Result<NaiveDateTime> {
    let normalized = s.trim().replacen('T', " ", 1);

    for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, pattern) {
            return Ok(dt);
        }
    }

    chrono::NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::default()))
        .map_err(|e| Error::InvalidValue(format!("invalid timestamp {:?}: {}", s, e)))
}
