//! Configuration types for the booking bot.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{BookingError, Result};

/// Environment variable that overrides `app.app_secret`.
pub const APP_SECRET_ENV: &str = "ROOMBOT_APP_SECRET";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomBotConfig {
    /// Open-platform app credentials and endpoint.
    pub app: AppConfig,
    /// Bitable holding the task, room-config and completion tables.
    pub bitable: BitableConfig,
    /// Meeting-room inventory settings.
    pub rooms: RoomsConfig,
    /// Booking loop settings.
    pub scheduler: SchedulerConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

/// Open-platform app credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// App id (`cli_...`).
    pub app_id: String,
    /// App secret. Prefer the `ROOMBOT_APP_SECRET` environment variable.
    pub app_secret: String,
    /// API base URL, without the `/open-apis` suffix.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_secret: String::new(),
            base_url: "https://open.feishu.cn".to_owned(),
            request_timeout_secs: 30,
        }
    }
}

/// Location of the bitable and its tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BitableConfig {
    /// Bitable app token, or a wiki node token when `is_wiki` is set.
    pub app_token: String,
    /// Whether `app_token` refers to a wiki node wrapping the bitable.
    pub is_wiki: bool,
    /// Recurring task definitions.
    pub task_table_id: String,
    /// Room inventory with ON/OFF switches.
    pub room_config_table_id: String,
    /// Completion records.
    pub completed_table_id: String,
}

/// Meeting-room inventory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    /// Room level (building/floor) ids whose rooms are listed by `init-rooms`.
    pub room_level_ids: Vec<String>,
    /// Reason shown on room approval requests.
    pub approval_reason: String,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            room_level_ids: Vec::new(),
            approval_reason: "Booked automatically by roombot".to_owned(),
        }
    }
}

/// Booking loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between two polling cycles.
    pub poll_interval_secs: u64,
    /// How many calendar days ahead the calendar accepts bookings.
    pub horizon_days: i64,
    /// UTC offset (`+08:00`) in which calendar dates are evaluated.
    pub utc_offset: String,
    /// IANA zone name sent with created events.
    pub timezone: String,
    /// Reuse an identical existing event instead of creating a duplicate
    /// after a partially failed booking.
    pub resume_existing_events: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 600,
            horizon_days: 7,
            utc_offset: "+08:00".to_owned(),
            timezone: "Asia/Shanghai".to_owned(),
            resume_existing_events: false,
        }
    }
}

impl SchedulerConfig {
    /// Parse `utc_offset`.
    pub fn offset(&self) -> Result<FixedOffset> {
        parse_utc_offset(&self.utc_offset).ok_or_else(|| {
            BookingError::Config(format!(
                "invalid utc_offset '{}', expected e.g. +08:00",
                self.utc_offset
            ))
        })
    }
}

/// Log line layout.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Timestamp, target, level and message.
    #[default]
    Default,
    /// Level and message only.
    Simple,
    /// Default plus source file and line.
    Detailed,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level filter; `RUST_LOG` takes precedence.
    pub level: String,
    /// Log file path. Empty logs to the console only.
    pub file: PathBuf,
    /// Roll the log file daily, appending the date to its name.
    pub add_date_to_filename: bool,
    /// Line layout.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            file: PathBuf::from("logs/roombot.log"),
            add_date_to_filename: true,
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Configured log file, or `None` when file logging is switched off.
    pub fn file_path(&self) -> Option<&Path> {
        (!self.file.as_os_str().is_empty()).then_some(self.file.as_path())
    }
}

impl RoomBotConfig {
    /// Load configuration from a TOML file and apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self =
            toml::from_str(&content).map_err(|e| BookingError::Config(e.to_string()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| BookingError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns `./roombot.toml` when present, else `<config dir>/roombot/config.toml`.
    pub fn default_config_path() -> PathBuf {
        let local = PathBuf::from("roombot.toml");
        if local.exists() {
            return local;
        }
        match dirs::config_dir() {
            Some(dir) => dir.join("roombot").join("config.toml"),
            None => local,
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var(APP_SECRET_ENV)
            && !secret.is_empty()
        {
            self.app.app_secret = secret;
        }
    }

    /// Checks the settings the booking loop cannot run without.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("app.app_id", &self.app.app_id),
            ("app.app_secret", &self.app.app_secret),
            ("bitable.app_token", &self.bitable.app_token),
            ("bitable.task_table_id", &self.bitable.task_table_id),
            ("bitable.room_config_table_id", &self.bitable.room_config_table_id),
            ("bitable.completed_table_id", &self.bitable.completed_table_id),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(BookingError::Config(format!("{name} must be set")));
            }
        }
        if self.app.request_timeout_secs == 0 {
            return Err(BookingError::Config(
                "app.request_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.scheduler.poll_interval_secs == 0 {
            return Err(BookingError::Config(
                "scheduler.poll_interval_secs must be greater than 0".into(),
            ));
        }
        if self.scheduler.horizon_days < 0 {
            return Err(BookingError::Config(
                "scheduler.horizon_days must not be negative".into(),
            ));
        }
        self.scheduler.offset()?;
        Ok(())
    }
}

/// Parse `+HH:MM`, `-HH:MM`, `+HHMM` or `Z`.
pub fn parse_utc_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn filled() -> RoomBotConfig {
        let mut config = RoomBotConfig::default();
        config.app.app_id = "cli_a1".into();
        config.app.app_secret = "secret".into();
        config.bitable.app_token = "bascn1".into();
        config.bitable.task_table_id = "tbl_task".into();
        config.bitable.room_config_table_id = "tbl_room".into();
        config.bitable.completed_table_id = "tbl_done".into();
        config
    }

    #[test]
    fn defaults_match_deployment() {
        let config = RoomBotConfig::default();
        assert_eq!(config.app.base_url, "https://open.feishu.cn");
        assert_eq!(config.scheduler.poll_interval_secs, 600);
        assert_eq!(config.scheduler.horizon_days, 7);
        assert_eq!(config.scheduler.timezone, "Asia/Shanghai");
        assert_eq!(config.logging.format, LogFormat::Default);
        assert!(config.logging.add_date_to_filename);
    }

    #[test]
    fn default_config_fails_validation() {
        let err = RoomBotConfig::default().validate().unwrap_err();
        assert_eq!(err.to_string(), "config error: app.app_id must be set");
    }

    #[test]
    fn filled_config_validates() {
        assert!(filled().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_interval_and_bad_offset() {
        let mut config = filled();
        config.scheduler.poll_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = filled();
        config.scheduler.utc_offset = "Asia/Shanghai".into();
        assert!(config.validate().is_err());

        let mut config = filled();
        config.scheduler.horizon_days = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let toml_str = r#"
            [app]
            app_id = "cli_a1"

            [rooms]
            room_level_ids = ["omb_1", "omb_2"]

            [logging]
            format = "detailed"
            file = "/var/log/roombot.log"
        "#;
        let config: RoomBotConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.app.app_id, "cli_a1");
        assert_eq!(config.app.request_timeout_secs, 30);
        assert_eq!(config.rooms.room_level_ids, vec!["omb_1", "omb_2"]);
        assert!(!config.rooms.approval_reason.is_empty());
        assert_eq!(config.logging.format, LogFormat::Detailed);
        assert_eq!(
            config.logging.file_path(),
            Some(Path::new("/var/log/roombot.log"))
        );
        assert_eq!(config.scheduler.utc_offset, "+08:00");
    }

    #[test]
    fn empty_log_file_means_console_only() {
        let config: RoomBotConfig = toml::from_str("[logging]\nfile = \"\"\n").unwrap();
        assert!(config.logging.file.as_os_str().is_empty());
        assert!(config.logging.file_path().is_none());

        let default = LoggingConfig::default();
        assert_eq!(default.file_path(), Some(Path::new("logs/roombot.log")));
    }

    #[test]
    fn offsets_parse() {
        assert_eq!(
            parse_utc_offset("+08:00").map(|o| o.local_minus_utc()),
            Some(8 * 3600)
        );
        assert_eq!(
            parse_utc_offset("-0530").map(|o| o.local_minus_utc()),
            Some(-(5 * 3600 + 30 * 60))
        );
        assert_eq!(parse_utc_offset("Z").map(|o| o.local_minus_utc()), Some(0));
        assert!(parse_utc_offset("08:00").is_none());
        assert!(parse_utc_offset("+8").is_none());
        assert!(parse_utc_offset("+24:00").is_none());
        assert!(parse_utc_offset("").is_none());
    }

    #[test]
    fn from_file_nonexistent_returns_error() {
        let result = RoomBotConfig::from_file(Path::new("/nonexistent/path/roombot.toml"));
        assert!(result.is_err());
    }
}
