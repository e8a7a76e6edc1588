use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};

use crate::error::AppError;
use crate::types::Profile;

/// Default location of the JSON configuration document.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Longest accepted polling interval (one week).
pub const MAX_SCHEDULE_MINS: u64 = 7 * 24 * 60;

const DEFAULT_PAGE_SIZE: u32 = 500;
const DEFAULT_LOCALE: &str = "en";
const DEFAULT_SUBJECT: &str = "Citizenship Tracker - Application Status Change Notification";

/// Application configuration, read once at startup and passed to every component.
#[derive(Clone, Deserialize)]
pub struct AppConfig {
    /// Accounts to poll, in the order they are checked each cycle
    pub user_profiles: Vec<Profile>,

    /// Sender address for notification emails
    pub sender_email: String,

    /// SendGrid API key (overridden by `SENDGRID_API_KEY` when set)
    pub sendgrid_api_key: String,

    /// Polling interval in minutes
    #[serde(deserialize_with = "minutes_from_number_or_string")]
    pub schedule_time_mins: u64,

    /// Directory holding one status file per (username, application)
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Optional Tera template replacing the built-in notification layout
    #[serde(default)]
    pub template_path: Option<PathBuf>,

    /// Locale key used for history titles and details (default: "en")
    #[serde(default = "default_locale")]
    pub locale: String,

    /// `limit` sent with `get-profile-summary` (default: 500)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Subject line of notification emails
    #[serde(default = "default_subject")]
    pub email_subject: String,

    /// Per-request HTTP timeout in seconds; unset means the client default (none)
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("user_profiles", &self.user_profiles)
            .field("sender_email", &self.sender_email)
            .field("sendgrid_api_key", &"<redacted>")
            .field("schedule_time_mins", &self.schedule_time_mins)
            .field("state_dir", &self.state_dir)
            .field("template_path", &self.template_path)
            .field("locale", &self.locale)
            .field("page_size", &self.page_size)
            .field("email_subject", &self.email_subject)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the JSON file named by `CASEWATCH_CONFIG`
    /// (default `config.json`), after loading `.env` if present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let path = std::env::var("CASEWATCH_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::from_file(&path)?;

        if let Ok(key) = std::env::var("SENDGRID_API_KEY") {
            config.sendgrid_api_key = key;
        }

        config.validate()?;
        tracing::info!(
            path = %path,
            profiles = config.user_profiles.len(),
            interval_mins = config.schedule_time_mins,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Read and parse a configuration file without validating it.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("failed to read config file {}: {}", path.display(), e)
        })?;
        Ok(Self::from_json(&raw)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        serde_json::from_str(raw).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Reject configurations the scheduler cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.schedule_time_mins == 0 {
            return Err(AppError::Config(
                "schedule_time_mins must be greater than zero".to_string(),
            ));
        }
        if self.schedule_time_mins > MAX_SCHEDULE_MINS {
            return Err(AppError::Config(format!(
                "schedule_time_mins must be at most {} (one week), got {}",
                MAX_SCHEDULE_MINS, self.schedule_time_mins
            )));
        }
        if self.sender_email.trim().is_empty() {
            return Err(AppError::Config("sender_email is required".to_string()));
        }
        if self.sendgrid_api_key.trim().is_empty() {
            return Err(AppError::Config("sendgrid_api_key is required".to_string()));
        }
        if let Some(profile) = self
            .user_profiles
            .iter()
            .find(|p| p.username.is_empty() || p.receiver_email.is_empty())
        {
            return Err(AppError::Config(format!(
                "profile {:?} needs both username and receiver_email",
                profile.username
            )));
        }
        if self.user_profiles.is_empty() {
            tracing::warn!("No user profiles configured; cycles will do nothing");
        }
        Ok(())
    }
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}

/// Accepts `5` as well as `"5"`; older config files quote the interval.
fn minutes_from_number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Minutes {
        Number(u64),
        Text(String),
    }

    match Minutes::deserialize(deserializer)? {
        Minutes::Number(n) => Ok(n),
        Minutes::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom("schedule_time_mins must be a valid u64")),
    }
}
