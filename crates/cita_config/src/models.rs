// --- File: crates/cita_config/src/models.rs ---

use serde::{Deserialize, Serialize};

// --- General Server Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8086,
        }
    }
}

// --- Database Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String, // e.g. sqlite://bookings.db, set via CITA__DATABASE__URL
}

// --- Google Calendar Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct GcalConfig {
    pub key_path: Option<String>,    // Service account JSON key, mandatory when use_gcal
    pub calendar_id: Option<String>, // Mandatory when use_gcal
    pub time_zone: Option<String>,   // Sent with every event, defaults to schedule.time_zone
    pub color_id: Option<String>,    // Defaults to "11"
}

// --- Business hours ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScheduleConfig {
    /// IANA time zone of the business. Must not observe daylight saving.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    /// First slot start, `HH:MM` 24-hour.
    #[serde(default = "default_work_start")]
    pub work_start_time: String,
    /// Last slot end, `HH:MM` 24-hour.
    #[serde(default = "default_work_end")]
    pub work_end_time: String,
    /// Three letter weekday names, e.g. `Mon`.
    #[serde(default = "default_working_days")]
    pub working_days: Vec<String>,
    /// Widest date range an availability query may ask for.
    #[serde(default = "default_max_range_days")]
    pub max_range_days: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            time_zone: default_time_zone(),
            work_start_time: default_work_start(),
            work_end_time: default_work_end(),
            working_days: default_working_days(),
            max_range_days: default_max_range_days(),
        }
    }
}

fn default_time_zone() -> String {
    "America/Puerto_Rico".to_string()
}

fn default_work_start() -> String {
    "09:00".to_string()
}

fn default_work_end() -> String {
    "17:00".to_string()
}

fn default_working_days() -> Vec<String> {
    ["Mon", "Tue", "Wed", "Thu", "Fri"]
        .iter()
        .map(|d| d.to_string())
        .collect()
}

fn default_max_range_days() -> u32 {
    31
}

// --- Calendar synchronisation and reconciliation ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SyncConfig {
    /// Upper bound on a single provider call; a timeout counts as unavailable.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_backoff_secs")]
    pub base_backoff_secs: u64,
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
    /// How long a booking may stay `pending` before the sweep picks it up.
    #[serde(default = "default_pending_grace_secs")]
    pub pending_grace_secs: u64,
    #[serde(default = "default_email_reminder_minutes")]
    pub email_reminder_minutes: i32,
    #[serde(default = "default_popup_reminder_minutes")]
    pub popup_reminder_minutes: i32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            max_attempts: default_max_attempts(),
            base_backoff_secs: default_base_backoff_secs(),
            max_backoff_secs: default_max_backoff_secs(),
            pending_grace_secs: default_pending_grace_secs(),
            email_reminder_minutes: default_email_reminder_minutes(),
            popup_reminder_minutes: default_popup_reminder_minutes(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_max_attempts() -> u32 {
    8
}

fn default_base_backoff_secs() -> u64 {
    60
}

fn default_max_backoff_secs() -> u64 {
    3600
}

fn default_pending_grace_secs() -> u64 {
    120
}

fn default_email_reminder_minutes() -> i32 {
    24 * 60
}

fn default_popup_reminder_minutes() -> i32 {
    60
}

// --- Unified App Configuration ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// `trace`, `debug`, `info`, `warn` or `error`.
    #[serde(default)]
    pub log_level: Option<String>,

    // --- Runtime Flags ---
    #[serde(default)]
    pub use_gcal: bool,

    // --- Optional Feature Configurations ---
    #[serde(default)]
    pub database: Option<DatabaseConfig>, // Absent means an in-memory store
    #[serde(default)]
    pub gcal: Option<GcalConfig>,

    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}
