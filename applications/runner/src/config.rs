/// Runner configuration
use playmark_core::{CatalogError, TrackCatalog, TrackRef, TrackRole};
use playmark_policy::{PolicyConfig, PolicyError};
use playmark_session::{TimingConfig, TRACK_END_WINDOW_MS};
use playmark_web_api::{ApiConfig, AuthConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration file read when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "playmark.toml";

/// Prefix of environment overrides (`PLAYMARK_AUTH__REFRESH_TOKEN=...`)
pub const ENV_PREFIX: &str = "PLAYMARK";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid policy: {0}")]
    Policy(#[from] PolicyError),

    #[error("Invalid catalog: {0}")]
    Catalog(#[from] CatalogError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaymarkConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub device: DeviceSettings,

    #[serde(default)]
    pub telemetry: TelemetrySettings,

    pub catalog: CatalogSettings,

    #[serde(default)]
    pub timing: TimingSettings,

    #[serde(default)]
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthSettings {
    #[serde(default = "default_token_url")]
    pub token_url: String,

    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceSettings {
    /// Display name of the playback device to drive
    #[serde(default = "default_device_name")]
    pub name: String,

    /// Must stay below the end-of-track window so a poll lands inside it
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TelemetrySettings {
    /// Collector URL; events are only logged when absent
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackEntry {
    /// Track URI or bare id
    pub uri: String,

    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogSettings {
    pub anchor: TrackEntry,
    pub primary: TrackEntry,
    pub fillers: Vec<TrackEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimingSettings {
    #[serde(default = "default_tick_ms")]
    pub elapsed_tick_ms: u64,

    #[serde(default = "default_tick_ms")]
    pub completion_check_ms: u64,
}

impl PlaymarkConfig {
    /// Load from the given file (or `playmark.toml` when present) and the
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, environment())
    }

    /// Load with an explicit environment source
    pub fn load_with(path: Option<&Path>, env: config::Environment) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Environment variables override the file
        settings = settings.add_source(env);

        let config: Self = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.auth.client_id.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "auth.client_id is required (set PLAYMARK_AUTH__CLIENT_ID)".to_string(),
            ));
        }

        if self.auth.access_token.is_none() && self.auth.refresh_token.is_none() {
            return Err(ConfigError::Invalid(
                "auth.access_token or auth.refresh_token is required".to_string(),
            ));
        }

        if self.device.name.trim().is_empty() {
            return Err(ConfigError::Invalid("device.name cannot be empty".to_string()));
        }

        for (key, value) in [
            ("api.timeout_secs", self.api.timeout_secs),
            ("device.poll_interval_ms", self.device.poll_interval_ms),
            ("timing.elapsed_tick_ms", self.timing.elapsed_tick_ms),
            ("timing.completion_check_ms", self.timing.completion_check_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{key} must be positive")));
            }
        }

        if self.device.poll_interval_ms >= TRACK_END_WINDOW_MS {
            return Err(ConfigError::Invalid(format!(
                "device.poll_interval_ms must be below {TRACK_END_WINDOW_MS}"
            )));
        }

        self.catalog().validate()?;
        self.policy.validate()?;

        Ok(())
    }

    /// Tracks available to a session
    pub fn catalog(&self) -> TrackCatalog {
        let track = |role, entry: &TrackEntry| TrackRef::new(role, &entry.uri, &entry.name);
        TrackCatalog::new(
            track(TrackRole::Anchor, &self.catalog.anchor),
            track(TrackRole::Primary, &self.catalog.primary),
            self.catalog
                .fillers
                .iter()
                .map(|entry| track(TrackRole::Filler, entry))
                .collect(),
        )
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::new(&self.api.base_url).with_timeout(Duration::from_secs(self.api.timeout_secs))
    }

    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            token_url: self.auth.token_url.clone(),
            client_id: self.auth.client_id.clone(),
            access_token: self.auth.access_token.clone(),
            refresh_token: self.auth.refresh_token.clone(),
        }
    }

    pub fn timing(&self) -> TimingConfig {
        TimingConfig {
            elapsed_tick: Duration::from_millis(self.timing.elapsed_tick_ms),
            completion_check: Duration::from_millis(self.timing.completion_check_ms),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.device.poll_interval_ms)
    }

    /// Copy with secrets masked, for display
    pub fn redacted(&self) -> Self {
        let mask = |token: &Option<String>| token.as_ref().map(|_| "********".to_string());
        let mut config = self.clone();
        config.auth.access_token = mask(&self.auth.access_token);
        config.auth.refresh_token = mask(&self.auth.refresh_token);
        config
    }

    /// Effective configuration as TOML, secrets masked
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(&self.redacted())
    }
}

/// Environment source: `PLAYMARK_<SECTION>__<KEY>`
pub fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

// Default values
impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            token_url: default_token_url(),
            client_id: String::new(),
            access_token: None,
            refresh_token: None,
        }
    }
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            name: default_device_name(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            elapsed_tick_ms: default_tick_ms(),
            completion_check_ms: default_tick_ms(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.spotify.com".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_token_url() -> String {
    "https://accounts.spotify.com/api/token".to_string()
}

fn default_device_name() -> String {
    "Playmark".to_string()
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_tick_ms() -> u64 {
    1_000
}
