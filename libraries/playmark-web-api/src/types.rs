//! Configuration and wire types for the streaming service Web API.

use crate::error::{ClientError, Result};
use playmark_core::{DeviceInfo, PlayerSnapshot};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Parse an http(s) URL, dropping trailing slashes.
pub(crate) fn parse_http_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ClientError::InvalidUrl("URL cannot be empty".into()));
    }
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(ClientError::InvalidUrl(
            "URL must start with http:// or https://".into(),
        ));
    }
    Url::parse(trimmed).map_err(|e| ClientError::InvalidUrl(format!("{trimmed}: {e}")))
}

/// Connection settings for the Web API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL (e.g. "https://api.spotify.com")
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// OAuth settings for the token store.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Token endpoint used for refresh
    pub token_url: String,
    /// Public client id sent with refresh requests
    pub client_id: String,
    /// Access token obtained out of band
    pub access_token: Option<String>,
    /// Refresh token obtained out of band
    pub refresh_token: Option<String>,
}

// =============================================================================
// Token endpoint
// =============================================================================

/// Response from the token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Token validity in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Present when the service rotates the refresh token
    #[serde(default)]
    pub refresh_token: Option<String>,
}

// =============================================================================
// Playlists
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct CreatePlaylistRequest<'a> {
    pub name: &'a str,
    pub public: bool,
    pub description: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct AddTracksRequest<'a> {
    pub uris: &'a [String],
}

/// Maximum URIs per add-tracks request
pub const ADD_TRACKS_BATCH: usize = 100;

// =============================================================================
// Player
// =============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct TransferRequest<'a> {
    pub device_ids: [&'a str; 1],
    pub play: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct PlayRequest<'a> {
    pub uris: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
pub(crate) struct DevicesResponse {
    pub devices: Vec<DeviceInfo>,
}

/// Track currently loaded in the player.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayingItem {
    pub id: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub duration_ms: u64,
}

/// Response of `GET /v1/me/player`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerState {
    #[serde(default)]
    pub device: Option<DeviceInfo>,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub item: Option<PlayingItem>,
}

impl PlayerState {
    /// Id of the device the state belongs to
    pub fn device_id(&self) -> Option<&str> {
        self.device.as_ref().map(|d| d.id.as_str())
    }

    /// Device-independent view consumed by the playback event adapter
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            position_ms: self.progress_ms.unwrap_or(0),
            duration_ms: self.item.as_ref().map_or(0, |i| i.duration_ms),
            paused: !self.is_playing,
            current_track_id: self.item.as_ref().and_then(|i| i.id.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_validation() {
        assert!(parse_http_url("https://api.example.com").is_ok());
        assert!(parse_http_url("http://localhost:8080").is_ok());
        assert!(parse_http_url("").is_err());
        assert!(parse_http_url("api.example.com").is_err());
        assert!(parse_http_url("ftp://example.com").is_err());
    }

    #[test]
    fn trailing_slashes_are_dropped() {
        let url = parse_http_url("https://api.example.com///").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/");
        assert_eq!(url.path(), "/");
    }

    #[test]
    fn player_state_snapshot() {
        let json = r#"{
            "device": {"id": "dev-1", "name": "Playmark", "is_active": true, "volume_percent": 70},
            "progress_ms": 42000,
            "is_playing": true,
            "item": {"id": "abc", "uri": "spotify:track:abc", "duration_ms": 200000}
        }"#;
        let state: PlayerState = serde_json::from_str(json).unwrap();
        assert_eq!(state.device_id(), Some("dev-1"));

        let snapshot = state.snapshot();
        assert_eq!(snapshot.position_ms, 42_000);
        assert_eq!(snapshot.duration_ms, 200_000);
        assert!(!snapshot.paused);
        assert_eq!(snapshot.current_track_id.as_deref(), Some("abc"));
    }

    #[test]
    fn idle_player_has_no_track() {
        let state: PlayerState = serde_json::from_str(r#"{"is_playing": false}"#).unwrap();
        let snapshot = state.snapshot();
        assert!(snapshot.current_track_id.is_none());
        assert!(snapshot.paused);
    }
}
