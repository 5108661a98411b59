/// Collaborator traits consumed by the session state machine
use crate::error::Result;
use crate::types::{PlaylistRef, TelemetryEnvelope, UserProfile, Visibility};
use async_trait::async_trait;

/// Access token provider
///
/// Implementers hand out bearer tokens and know how to refresh them.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Return a token believed to be valid, refreshing first if it has expired
    ///
    /// # Errors
    /// Returns `ApiError::AuthExpired` when no valid or refreshable token exists
    async fn access_token(&self) -> Result<String>;

    /// Force a refresh, typically after the service rejected a token with 401
    ///
    /// # Errors
    /// Returns `ApiError::AuthExpired` when the refresh token is missing or rejected
    async fn refresh(&self) -> Result<String>;
}

/// Streaming service Web API
///
/// Every call fails with `ApiError::Http` on a non-success response. A 401 is
/// retried exactly once after a token refresh before the failure surfaces.
#[async_trait]
pub trait StreamingApi: Send + Sync {
    /// Profile of the signed-in user
    async fn current_user(&self) -> Result<UserProfile>;

    /// Create a playlist owned by `owner_id`
    async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        visibility: Visibility,
    ) -> Result<PlaylistRef>;

    /// Append tracks (by URI) to a playlist, preserving order
    async fn add_tracks(&self, playlist_id: &str, track_uris: &[String]) -> Result<()>;

    /// Make `device_id` the active playback device
    ///
    /// # Errors
    /// Returns `ApiError::DeviceNotFound` when the service does not know the device
    async fn transfer_playback(&self, device_id: &str) -> Result<()>;

    /// Start playing a single track on a device
    async fn play(&self, device_id: &str, track_uri: &str) -> Result<()>;
}

/// Playback device commands
///
/// Fire-and-forget from the state machine's perspective, except `volume()`
/// whose value is awaited.
#[async_trait]
pub trait PlaybackDevice: Send + Sync {
    /// Pause playback
    async fn pause(&self) -> Result<()>;

    /// Resume playback
    async fn resume(&self) -> Result<()>;

    /// Seek within the current track
    async fn seek(&self, position_ms: u64) -> Result<()>;

    /// Current volume (0-100)
    async fn volume(&self) -> Result<u8>;

    /// Set volume (0-100)
    async fn set_volume(&self, level: u8) -> Result<()>;
}

/// Telemetry sink
///
/// Best-effort delivery. Implementers must not block the caller and must
/// swallow (and log) their own failures.
pub trait TelemetrySink: Send + Sync {
    /// Hand an event to the sink
    fn emit(&self, envelope: TelemetryEnvelope);
}
