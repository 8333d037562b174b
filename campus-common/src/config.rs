//! Bootstrap configuration loading
//!
//! Configuration sources, highest priority first:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing config file is not an error: a warning is logged and the
//! compiled defaults are used.

use crate::{Error, Result};
use chrono::FixedOffset;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "CAMPUS_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct CampusConfig {
    /// Path to SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// HTTP listen address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Campus local offset, e.g. `+05:30`
    ///
    /// Used for all-day bookings and the day-of-week of history records.
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub calendar: CalendarConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub events: EventsConfig,

    /// Spaces to provision at startup
    #[serde(default)]
    pub spaces: Vec<SpaceConfig>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Which calendar snapshot provider to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CalendarMode {
    /// No calendar; every pass runs degraded
    #[default]
    Disabled,
    /// Bookings listed in `[[calendar.bookings]]`
    Fixed,
    /// Schedule generated relative to the current time
    Demo,
    /// Google Calendar v3 REST API
    Google,
}

/// Calendar provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    #[serde(default)]
    pub mode: CalendarMode,

    /// API base URL (google mode)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Bearer token sent with each request (google mode)
    #[serde(default)]
    pub access_token: Option<String>,

    /// Upper bound on one snapshot fetch
    #[serde(default = "default_calendar_timeout_ms")]
    pub timeout_ms: u64,

    /// Length of the fetched window
    #[serde(default = "default_lookahead_days")]
    pub lookahead_days: u32,

    /// Bookings served in fixed mode
    #[serde(default)]
    pub bookings: Vec<BookingConfig>,
}

/// One booking served by the fixed calendar provider
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    pub calendar_id: String,
    #[serde(default = "default_booking_title")]
    pub title: String,
    #[serde(default = "default_booking_organizer")]
    pub organizer: String,
    /// RFC 3339 instant or `YYYY-MM-DD` for an all-day booking
    pub start: String,
    /// RFC 3339 instant or `YYYY-MM-DD` (exclusive) for an all-day booking
    pub end: String,
}

/// History recording policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HistoryPolicyKind {
    /// One record per accepted reading
    #[default]
    EveryEvent,
    /// At most one record per space per `interval_minutes`
    Interval,
}

/// History recorder configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    #[serde(default)]
    pub policy: HistoryPolicyKind,

    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
}

/// Event bus configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// Per-subscriber buffer before the oldest events are dropped
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

/// A space provisioned from the bootstrap file
#[derive(Debug, Clone, Deserialize)]
pub struct SpaceConfig {
    pub space_id: String,
    pub name: String,
    #[serde(default = "default_space_kind")]
    pub kind: String,
    pub capacity: u32,
    #[serde(default)]
    pub sensor_id: Option<String>,
    #[serde(default)]
    pub calendar_id: Option<String>,
}

fn default_database_path() -> PathBuf {
    default_data_folder().join("campus.db")
}

fn default_bind_addr() -> String {
    "127.0.0.1:5750".to_string()
}

fn default_utc_offset() -> String {
    "+00:00".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_calendar_timeout_ms() -> u64 {
    3000
}

fn default_lookahead_days() -> u32 {
    7
}

fn default_booking_title() -> String {
    "Booked".to_string()
}

fn default_booking_organizer() -> String {
    "Faculty".to_string()
}

fn default_interval_minutes() -> u64 {
    15
}

fn default_event_capacity() -> usize {
    1000
}

fn default_space_kind() -> String {
    "Classroom".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            mode: CalendarMode::default(),
            base_url: None,
            access_token: None,
            timeout_ms: default_calendar_timeout_ms(),
            lookahead_days: default_lookahead_days(),
            bookings: Vec::new(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            policy: HistoryPolicyKind::default(),
            interval_minutes: default_interval_minutes(),
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

impl Default for CampusConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            bind_addr: default_bind_addr(),
            utc_offset: default_utc_offset(),
            logging: LoggingConfig::default(),
            calendar: CalendarConfig::default(),
            history: HistoryConfig::default(),
            events: EventsConfig::default(),
            spaces: Vec::new(),
        }
    }
}

impl CampusConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: CampusConfig =
            toml::from_str(text).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, falling back to defaults
    ///
    /// `None` or a non-existent file yields the defaults (with a warning).
    /// A file that exists but cannot be parsed is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            warn!("No config file found, using compiled defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            warn!("Config file {} not found, using compiled defaults", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config = Self::from_toml_str(&text)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Campus local offset as a typed value
    pub fn offset(&self) -> Result<FixedOffset> {
        crate::time::parse_utc_offset(&self.utc_offset)
    }

    /// Calendar fetch timeout
    pub fn calendar_timeout(&self) -> std::time::Duration {
        crate::time::millis_to_duration(self.calendar.timeout_ms)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        self.offset()?;

        if self.calendar.timeout_ms == 0 {
            return Err(Error::Config("calendar.timeout_ms must be > 0".to_string()));
        }
        if self.calendar.lookahead_days == 0 {
            return Err(Error::Config("calendar.lookahead_days must be > 0".to_string()));
        }
        if self.calendar.mode == CalendarMode::Google && self.calendar.base_url.is_none() {
            return Err(Error::Config(
                "calendar.base_url is required when calendar.mode = \"google\"".to_string(),
            ));
        }
        if self.history.policy == HistoryPolicyKind::Interval && self.history.interval_minutes == 0 {
            return Err(Error::Config("history.interval_minutes must be > 0".to_string()));
        }
        if self.events.capacity == 0 {
            return Err(Error::Config("events.capacity must be > 0".to_string()));
        }

        let mut space_ids = HashSet::new();
        let mut sensor_ids = HashSet::new();
        for space in &self.spaces {
            if space.space_id.trim().is_empty() {
                return Err(Error::Config("space_id must not be empty".to_string()));
            }
            if !space_ids.insert(space.space_id.as_str()) {
                return Err(Error::Config(format!("Duplicate space_id: {}", space.space_id)));
            }
            if let Some(sensor_id) = &space.sensor_id {
                if !sensor_ids.insert(sensor_id.as_str()) {
                    return Err(Error::Config(format!(
                        "Sensor {} is bound to more than one space",
                        sensor_id
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Resolve which config file to read
///
/// Priority: explicit path → `CAMPUS_CONFIG` → user config dir →
/// `/etc/campus/config.toml`. Returns `None` when nothing exists.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config locations
    let user_config = dirs::config_dir().map(|d| d.join("campus").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/campus/config.toml");
    if cfg!(unix) && system_config.exists() {
        return Some(system_config);
    }

    None
}

/// Get OS-dependent default data folder
fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("campus"))
        .unwrap_or_else(|| PathBuf::from("./campus_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CampusConfig::default();
        config.validate().unwrap();
        assert_eq!(config.calendar.mode, CalendarMode::Disabled);
        assert_eq!(config.history.policy, HistoryPolicyKind::EveryEvent);
        assert_eq!(config.events.capacity, 1000);
        assert!(config.database_path.ends_with("campus.db"));
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = CampusConfig::from_toml_str("").unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:5750");
        assert_eq!(config.calendar.timeout_ms, 3000);
        assert_eq!(config.calendar.lookahead_days, 7);
    }

    #[test]
    fn test_google_mode_requires_base_url() {
        let err = CampusConfig::from_toml_str("[calendar]\nmode = \"google\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_duplicate_sensor_binding_rejected() {
        let text = r#"
            [[spaces]]
            space_id = "S1"
            name = "Chemistry Lab 101"
            capacity = 40
            sensor_id = "CAM_001"

            [[spaces]]
            space_id = "S2"
            name = "Seminar Hall"
            capacity = 120
            sensor_id = "CAM_001"
        "#;
        let err = CampusConfig::from_toml_str(text).unwrap_err();
        assert!(err.to_string().contains("CAM_001"));
    }

    #[test]
    fn test_bad_offset_rejected() {
        assert!(CampusConfig::from_toml_str("utc_offset = \"IST\"\n").is_err());
    }
}
