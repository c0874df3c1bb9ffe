//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/boardclock/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/boardclock/` (~/.config/boardclock/)
//! - Data: `$XDG_DATA_HOME/boardclock/` (~/.local/share/boardclock/)
//! - State/Logs: `$XDG_STATE_HOME/boardclock/` (~/.local/state/boardclock/)

use crate::calendar::WorkCalendar;
use crate::error::{Error, Result};
use crate::format::parse_time_of_day;
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::PathBuf;

/// Env var overriding `tracker.api_key`
pub const API_KEY_ENV: &str = "BOARDCLOCK_API_KEY";
/// Env var overriding `tracker.token`
pub const TOKEN_ENV: &str = "BOARDCLOCK_TOKEN";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Initial working calendar
    #[serde(default)]
    pub calendar: CalendarConfig,

    /// Tracker API access
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Cache synchronization
    #[serde(default)]
    pub sync: SyncConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Working calendar seed
///
/// Used only when the database holds no calendar yet; after that the stored
/// calendar wins and is changed through `boardclock-calendar`.
#[derive(Debug, Deserialize, Clone)]
pub struct CalendarConfig {
    #[serde(default = "default_work_day_start")]
    pub work_day_start: String,

    #[serde(default = "default_work_day_end")]
    pub work_day_end: String,

    #[serde(default = "default_lunch_start")]
    pub lunch_start: String,

    #[serde(default = "default_lunch_end")]
    pub lunch_end: String,

    /// Work days counted from Monday (1-7)
    #[serde(default = "default_work_days_per_week")]
    pub work_days_per_week: u8,

    /// IANA zone that tracker timestamps are converted to
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            work_day_start: default_work_day_start(),
            work_day_end: default_work_day_end(),
            lunch_start: default_lunch_start(),
            lunch_end: default_lunch_end(),
            work_days_per_week: default_work_days_per_week(),
            timezone: default_timezone(),
        }
    }
}

impl CalendarConfig {
    /// Build and validate the calendar these settings describe.
    pub fn to_calendar(&self) -> Result<WorkCalendar> {
        WorkCalendar::new(
            parse_time_of_day(&self.work_day_start)?,
            parse_time_of_day(&self.work_day_end)?,
            parse_time_of_day(&self.lunch_start)?,
            parse_time_of_day(&self.lunch_end)?,
            self.work_days_per_week,
        )
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse()
            .map_err(|e| Error::Config(format!("calendar.timezone: {}", e)))
    }
}

fn default_work_day_start() -> String {
    "09:00:00".to_string()
}

fn default_work_day_end() -> String {
    "18:00:00".to_string()
}

fn default_lunch_start() -> String {
    "13:00:00".to_string()
}

fn default_lunch_end() -> String {
    "14:00:00".to_string()
}

fn default_work_days_per_week() -> u8 {
    5
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Tracker (Trello REST API) configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TrackerConfig {
    /// API root, without a trailing slash
    #[serde(default = "default_tracker_base_url")]
    pub base_url: String,

    /// API key (can also use BOARDCLOCK_API_KEY)
    pub api_key: Option<String>,

    /// API token (can also use BOARDCLOCK_TOKEN)
    pub token: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_tracker_timeout")]
    pub timeout_secs: u64,

    /// Max retry attempts for transient failures
    #[serde(default = "default_tracker_max_retries")]
    pub max_retries: usize,

    /// Name of the board whose cards list the team
    ///
    /// Card name is the person's full name, the card's list is their status.
    pub team_board: Option<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: default_tracker_base_url(),
            api_key: None,
            token: None,
            timeout_secs: default_tracker_timeout(),
            max_retries: default_tracker_max_retries(),
            team_board: None,
        }
    }
}

impl TrackerConfig {
    /// Check if credentials are present
    pub fn is_ready(&self) -> bool {
        self.api_key.is_some() && self.token.is_some()
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(Error::Config("tracker.base_url must not be empty".to_string()));
        }
        if self.api_key.is_none() {
            return Err(Error::Config(format!(
                "tracker.api_key is required (or set {})",
                API_KEY_ENV
            )));
        }
        if self.token.is_none() {
            return Err(Error::Config(format!(
                "tracker.token is required (or set {})",
                TOKEN_ENV
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "tracker.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Some(key) = non_empty_env(API_KEY_ENV) {
            self.api_key = Some(key);
        }
        if let Some(token) = non_empty_env(TOKEN_ENV) {
            self.token = Some(token);
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn default_tracker_base_url() -> String {
    "https://api.trello.com/1".to_string()
}

fn default_tracker_timeout() -> u64 {
    30
}

fn default_tracker_max_retries() -> usize {
    3
}

/// Cache synchronization configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// Seconds between syncs in watch mode
    #[serde(default = "default_sync_interval")]
    pub interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sync_interval(),
        }
    }
}

fn default_sync_interval() -> u64 {
    120
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    ///
    /// Tracker credentials from the environment override the file.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Config::default()
        };

        config.tracker.apply_env();
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/boardclock/config.toml` (~/.config/boardclock/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("boardclock").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/boardclock/` (~/.local/share/boardclock/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("boardclock")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/boardclock/` (~/.local/state/boardclock/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("boardclock")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/boardclock/data.db` (~/.local/share/boardclock/data.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }

    /// Returns the log file path of one binary
    ///
    /// `$XDG_STATE_HOME/boardclock/<app>.log`, e.g.
    /// ~/.local/state/boardclock/boardclock-sync.log
    pub fn log_path(app: &str) -> PathBuf {
        Self::state_dir().join(format!("{}.log", app))
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.calendar.work_day_start, "09:00:00");
        assert_eq!(config.calendar.work_days_per_week, 5);
        assert_eq!(config.sync.interval_secs, 120);
        assert_eq!(config.tracker.base_url, "https://api.trello.com/1");
        assert!(config.tracker.team_board.is_none());
    }

    #[test]
    fn test_default_calendar_matches_builtin() {
        let calendar = CalendarConfig::default().to_calendar().unwrap();
        assert_eq!(calendar, WorkCalendar::default());
        assert_eq!(CalendarConfig::default().timezone().unwrap(), Tz::UTC);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[calendar]
work_day_start = "08:30"
work_day_end = "17:30:00"
work_days_per_week = 6
timezone = "Asia/Tomsk"

[tracker]
api_key = "key"
token = "token"
team_board = "Team"

[sync]
interval_secs = 300

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        let calendar = config.calendar.to_calendar().unwrap();
        assert_eq!(calendar.daily_work_duration(), Duration::hours(8));
        assert_eq!(calendar.weekly_work_duration(), Duration::hours(48));
        assert_eq!(config.calendar.timezone().unwrap(), chrono_tz::Asia::Tomsk);

        assert!(config.tracker.is_ready());
        assert_eq!(config.tracker.team_board.as_deref(), Some("Team"));
        assert_eq!(config.tracker.max_retries, 3);
        assert_eq!(config.sync.interval_secs, 300);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_calendar_config() {
        let config = CalendarConfig {
            lunch_start: "15:00:00".to_string(),
            lunch_end: "14:00:00".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.to_calendar(), Err(Error::InvalidRange(_))));

        let config = CalendarConfig {
            timezone: "Mars/Olympus".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.timezone(), Err(Error::Config(_))));
    }

    #[test]
    fn test_tracker_config_validation() {
        let config = TrackerConfig::default();
        assert!(!config.is_ready());
        assert!(config.validate().is_err());

        let config = TrackerConfig {
            api_key: Some("key".to_string()),
            token: Some("token".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = TrackerConfig {
            timeout_secs: 0,
            ..config
        };
        assert!(config.validate().is_err());
    }
}
