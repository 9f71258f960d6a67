use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TICK_SECS: u64 = 60;
pub const DEFAULT_BATCH_LIMIT: usize = 25;
pub const DEFAULT_SESSION_MINUTES: u32 = 30;
pub const DEFAULT_MATCH_TOLERANCE_MINUTES: u32 = 5;
pub const DEFAULT_REMINDER_DELAY_HOURS: u32 = 6;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_ROOMS_BASE_URL: &str = "https://api.daily.co/v1";

/// Top-level config (vow.toml + VOW_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VowConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Video-room provider. Sessions open without a URL when absent.
    #[serde(default)]
    pub rooms: Option<RoomsConfig>,
    /// Push delivery webhook. Notifications are only logged when absent.
    #[serde(default)]
    pub push: Option<PushConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Tuning knobs for the two periodic ticks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Cadence of the heavy tick (transitions, sessions, most notifications).
    #[serde(default = "default_tick_secs")]
    pub heavy_interval_secs: u64,
    /// Cadence of the light tick (pre-session warnings only).
    #[serde(default = "default_tick_secs")]
    pub light_interval_secs: u64,
    /// Max candidate wills loaded per status group per tick.
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,
    #[serde(default = "default_session_minutes")]
    pub session_duration_minutes: u32,
    /// Half-width of the time-of-day match window.
    #[serde(default = "default_match_tolerance")]
    pub match_tolerance_minutes: u32,
    /// How long a will must sit in `pending` before uncommitted members are nudged.
    #[serde(default = "default_reminder_delay")]
    pub join_reminder_after_hours: u32,
    /// How long a will must sit in `will_review` before missing reviewers are nudged.
    #[serde(default = "default_reminder_delay")]
    pub review_reminder_after_hours: u32,
    #[serde(default = "default_motivational_start")]
    pub motivational_start_hour: u32,
    #[serde(default = "default_motivational_end")]
    pub motivational_end_hour: u32,
    /// Wills shorter than this get motivational messages inside their own window.
    #[serde(default = "default_short_cycle_hours")]
    pub short_cycle_hours: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            heavy_interval_secs: default_tick_secs(),
            light_interval_secs: default_tick_secs(),
            batch_limit: default_batch_limit(),
            session_duration_minutes: default_session_minutes(),
            match_tolerance_minutes: default_match_tolerance(),
            join_reminder_after_hours: default_reminder_delay(),
            review_reminder_after_hours: default_reminder_delay(),
            motivational_start_hour: default_motivational_start(),
            motivational_end_hour: default_motivational_end(),
            short_cycle_hours: default_short_cycle_hours(),
        }
    }
}

/// Daily.co-compatible REST API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomsConfig {
    pub api_key: String,
    #[serde(default = "default_rooms_base_url")]
    pub base_url: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    pub webhook_url: String,
    /// Sent as `Authorization: Bearer <token>` when set.
    pub token: Option<String>,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.vow/vow.db", home)
}
fn default_tick_secs() -> u64 {
    DEFAULT_TICK_SECS
}
fn default_batch_limit() -> usize {
    DEFAULT_BATCH_LIMIT
}
fn default_session_minutes() -> u32 {
    DEFAULT_SESSION_MINUTES
}
fn default_match_tolerance() -> u32 {
    DEFAULT_MATCH_TOLERANCE_MINUTES
}
fn default_reminder_delay() -> u32 {
    DEFAULT_REMINDER_DELAY_HOURS
}
fn default_motivational_start() -> u32 {
    8
}
fn default_motivational_end() -> u32 {
    21
}
fn default_short_cycle_hours() -> u32 {
    24
}
fn default_rooms_base_url() -> String {
    DEFAULT_ROOMS_BASE_URL.to_string()
}
fn default_http_timeout() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

impl VowConfig {
    /// Load config from a TOML file with VOW_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g. `VOW_SCHEDULER__BATCH_LIMIT=50`.
    /// A missing file is not an error; every field has a default.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Self::figment(&path)
            .extract()
            .map_err(|e| crate::error::VowError::Config(e.to_string()))
    }

    /// Deadline for one room-provider call. Same value the HTTP client uses,
    /// so the outer timeout never fires before the client's own.
    pub fn provider_timeout(&self) -> Duration {
        let secs = self
            .rooms
            .as_ref()
            .map_or(DEFAULT_HTTP_TIMEOUT_SECS, |r| r.timeout_secs);
        Duration::from_secs(secs.max(1))
    }

    fn figment(path: &str) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("VOW_").split("__"))
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.vow/vow.toml", home)
}
