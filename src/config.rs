//! Application-level configuration loading, including venue and court defaults.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::board::PromotionPolicy;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "COURT_QUEUE_BACK_CONFIG_PATH";
/// Entry code expected in the fixed QR payload when none is configured.
const DEFAULT_ENTRY_CODE: &str = "qr_entrance_fixed_2024";
/// Base URL baked into the entry link when none is configured.
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:3000";
/// Length of an admission window in minutes.
const DEFAULT_SESSION_MINUTES: u64 = 120;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    entry_code: String,
    public_base_url: String,
    session_minutes: u64,
    promotion: PromotionPolicy,
    court_names: Vec<String>,
    venue: VenueDefaults,
}

#[derive(Debug, Clone)]
/// Baked-in venue settings served until an admin upserts real ones.
pub struct VenueDefaults {
    pub venue_name: String,
    pub operating_hours: String,
    pub contact_info: String,
    pub rules: String,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        courts = app_config.court_names.len(),
                        "loaded venue configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Fixed code the `session` query parameter of the entry QR link must carry.
    pub fn entry_code(&self) -> &str {
        &self.entry_code
    }

    /// Base URL used to render the canonical entry link for the admin console.
    pub fn public_base_url(&self) -> &str {
        &self.public_base_url
    }

    /// Length of one admission window.
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_minutes * 60)
    }

    /// What a full team is promoted to when its fourth member joins.
    pub fn promotion(&self) -> PromotionPolicy {
        self.promotion
    }

    /// Display names of the pre-provisioned courts, in board order.
    pub fn court_names(&self) -> &[String] {
        &self.court_names
    }

    /// Venue settings served while no admin upsert has happened yet.
    pub fn venue_defaults(&self) -> &VenueDefaults {
        &self.venue
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            entry_code: DEFAULT_ENTRY_CODE.into(),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.into(),
            session_minutes: DEFAULT_SESSION_MINUTES,
            promotion: PromotionPolicy::Play,
            court_names: default_court_names(),
            venue: VenueDefaults::default(),
        }
    }
}

impl Default for VenueDefaults {
    fn default() -> Self {
        Self {
            venue_name: "Smart Badminton Court".into(),
            operating_hours: "Weekdays 06:00-23:00 / Weekends 06:00-22:00".into(),
            contact_info: "0507-1370-9731".into(),
            rules: concat!(
                "Court sessions are limited to 2 hours per admission.\n",
                "Please wear non-marking indoor shoes.\n",
                "Return rental racquets to the front desk after play.\n",
                "Food and drinks are not allowed on the courts.",
            )
            .into(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    entry_code: Option<String>,
    #[serde(default)]
    public_base_url: Option<String>,
    #[serde(default)]
    session_minutes: Option<u64>,
    #[serde(default)]
    promotion: Option<RawPromotion>,
    #[serde(default)]
    courts: Vec<String>,
    #[serde(default)]
    venue: Option<RawVenue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
/// JSON spelling of the team promotion policy.
enum RawPromotion {
    Play,
    Confirm,
}

#[derive(Debug, Deserialize)]
/// JSON representation of the venue settings defaults.
struct RawVenue {
    venue_name: String,
    operating_hours: String,
    contact_info: String,
    rules: String,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        let court_names = if value.courts.is_empty() {
            defaults.court_names
        } else {
            value.courts
        };

        Self {
            entry_code: value.entry_code.unwrap_or(defaults.entry_code),
            public_base_url: value.public_base_url.unwrap_or(defaults.public_base_url),
            session_minutes: value.session_minutes.unwrap_or(defaults.session_minutes),
            promotion: value
                .promotion
                .map(Into::into)
                .unwrap_or(defaults.promotion),
            court_names,
            venue: value.venue.map(Into::into).unwrap_or(defaults.venue),
        }
    }
}

impl From<RawPromotion> for PromotionPolicy {
    fn from(value: RawPromotion) -> Self {
        match value {
            RawPromotion::Play => PromotionPolicy::Play,
            RawPromotion::Confirm => PromotionPolicy::Confirm,
        }
    }
}

impl From<RawVenue> for VenueDefaults {
    fn from(value: RawVenue) -> Self {
        Self {
            venue_name: value.venue_name,
            operating_hours: value.operating_hours,
            contact_info: value.contact_info,
            rules: value.rules,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in court roster shipped with the binary.
fn default_court_names() -> Vec<String> {
    (1..=4).map(|number| format!("Court {number}")).collect()
}
