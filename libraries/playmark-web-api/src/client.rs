//! Streaming service Web API client.

use crate::error::{status_error, transport_error, ClientError};
use crate::types::{
    parse_http_url, AddTracksRequest, ApiConfig, CreatePlaylistRequest, DevicesResponse,
    PlayRequest, PlayerState, TransferRequest, ADD_TRACKS_BATCH,
};
use async_trait::async_trait;
use playmark_core::{
    AccessTokenProvider, ApiError, DeviceInfo, PlaylistRef, Result, StreamingApi, UserProfile,
    Visibility,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Build the shared HTTP client.
pub fn http_client(config: &ApiConfig) -> crate::error::Result<Client> {
    Client::builder()
        .timeout(config.timeout)
        .connect_timeout(Duration::from_secs(10))
        .user_agent(format!("Playmark/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(ClientError::Build)
}

/// Bearer-authenticated client for the streaming service Web API.
///
/// Every request carries the provider's current access token. A 401 triggers
/// one refresh and one retry; a second 401 is returned as an HTTP error.
///
/// # Example
///
/// ```ignore
/// use playmark_web_api::{ApiConfig, AuthConfig, TokenStore, WebApiClient, http_client};
///
/// let config = ApiConfig::new("https://api.spotify.com");
/// let http = http_client(&config)?;
/// let tokens = Arc::new(TokenStore::new(http.clone(), &auth)?);
/// let client = WebApiClient::with_http(http, &config, tokens)?;
///
/// let me = client.current_user().await?;
/// println!("Signed in as {}", me.id);
/// ```
pub struct WebApiClient {
    http: Client,
    base: Url,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl WebApiClient {
    /// Create a client with its own HTTP connection pool.
    pub fn new(
        config: &ApiConfig,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> crate::error::Result<Self> {
        Self::with_http(http_client(config)?, config, tokens)
    }

    /// Create a client sharing an existing HTTP connection pool.
    pub fn with_http(
        http: Client,
        config: &ApiConfig,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> crate::error::Result<Self> {
        let base = parse_http_url(&config.base_url)?;
        Ok(Self { http, base, tokens })
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn player_endpoint(&self, action: &str, device_id: &str) -> Url {
        let mut url = self.endpoint(&["v1", "me", "player", action]);
        url.query_pairs_mut().append_pair("device_id", device_id);
        url
    }

    /// Send a request, refreshing the token and retrying once on 401.
    async fn send<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        let token = self.tokens.access_token().await?;
        let response = build(&self.http)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!("Access token rejected, refreshing");
        let token = self.tokens.refresh().await?;
        build(&self.http)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(transport_error)
    }

    /// Send and require a success status.
    async fn send_ok<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        let response = self.send(build).await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(status_error(response).await)
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(url = %url, "GET");
        let response = self.send_ok(|http| http.get(url.clone())).await?;
        response.json().await.map_err(transport_error)
    }

    async fn put_player(&self, action: &str, url: Url) -> Result<()> {
        debug!(url = %url, action, "Player command");
        self.send_ok(|http| http.put(url.clone()).header(reqwest::header::CONTENT_LENGTH, 0))
            .await?;
        Ok(())
    }

    // =========================================================================
    // Player
    // =========================================================================

    /// Pause playback on a device.
    pub async fn pause(&self, device_id: &str) -> Result<()> {
        self.put_player("pause", self.player_endpoint("pause", device_id))
            .await
    }

    /// Resume playback on a device.
    pub async fn resume(&self, device_id: &str) -> Result<()> {
        self.put_player("resume", self.player_endpoint("play", device_id))
            .await
    }

    /// Seek within the current track.
    pub async fn seek(&self, device_id: &str, position_ms: u64) -> Result<()> {
        let mut url = self.player_endpoint("seek", device_id);
        url.query_pairs_mut()
            .append_pair("position_ms", &position_ms.to_string());
        self.put_player("seek", url).await
    }

    /// Set the device volume (0-100).
    pub async fn set_volume(&self, device_id: &str, level: u8) -> Result<()> {
        let mut url = self.player_endpoint("volume", device_id);
        url.query_pairs_mut()
            .append_pair("volume_percent", &level.min(100).to_string());
        self.put_player("volume", url).await
    }

    /// Devices visible to the signed-in user.
    pub async fn devices(&self) -> Result<Vec<DeviceInfo>> {
        let response: DevicesResponse = self
            .get_json(self.endpoint(&["v1", "me", "player", "devices"]))
            .await?;
        Ok(response.devices)
    }

    /// Current volume of a device, looked up through the device list.
    pub async fn volume(&self, device_id: &str) -> Result<u8> {
        let devices = self.devices().await?;
        let device = devices
            .into_iter()
            .find(|d| d.id == device_id)
            .ok_or_else(|| ApiError::DeviceNotFound(device_id.to_string()))?;
        Ok(device.volume_percent.unwrap_or(100))
    }

    /// Current player state, `None` when nothing is playing anywhere.
    pub async fn player_state(&self) -> Result<Option<PlayerState>> {
        let url = self.endpoint(&["v1", "me", "player"]);
        let response = self.send_ok(|http| http.get(url.clone())).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body = response.bytes().await.map_err(transport_error)?;
        if body.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| ApiError::parse(format!("Failed to parse player state: {e}")))
    }
}

#[async_trait]
impl StreamingApi for WebApiClient {
    async fn current_user(&self) -> Result<UserProfile> {
        self.get_json(self.endpoint(&["v1", "me"])).await
    }

    async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        visibility: Visibility,
    ) -> Result<PlaylistRef> {
        let url = self.endpoint(&["v1", "users", owner_id, "playlists"]);
        debug!(url = %url, name, "Creating playlist");

        let body = CreatePlaylistRequest {
            name,
            public: visibility.is_public(),
            description: "",
        };
        let response = self
            .send_ok(|http| http.post(url.clone()).json(&body))
            .await?;
        let playlist: PlaylistRef = response.json().await.map_err(transport_error)?;

        info!(playlist_id = %playlist.id, name = %playlist.name, "Playlist created");
        Ok(playlist)
    }

    async fn add_tracks(&self, playlist_id: &str, track_uris: &[String]) -> Result<()> {
        let url = self.endpoint(&["v1", "playlists", playlist_id, "tracks"]);
        for chunk in track_uris.chunks(ADD_TRACKS_BATCH) {
            debug!(url = %url, count = chunk.len(), "Adding tracks");
            let body = AddTracksRequest { uris: chunk };
            self.send_ok(|http| http.post(url.clone()).json(&body))
                .await?;
        }
        Ok(())
    }

    async fn transfer_playback(&self, device_id: &str) -> Result<()> {
        let url = self.endpoint(&["v1", "me", "player"]);
        debug!(url = %url, device_id, "Transferring playback");

        let body = TransferRequest {
            device_ids: [device_id],
            play: false,
        };
        let response = self.send(|http| http.put(url.clone()).json(&body)).await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                warn!(device_id, "Transfer target not found");
                Err(ApiError::DeviceNotFound(device_id.to_string()))
            }
            _ => match status_error(response).await {
                ApiError::Http { status, message } => {
                    Err(ApiError::PlaybackTransferFailed { status, message })
                }
                other => Err(other),
            },
        }
    }

    async fn play(&self, device_id: &str, track_uri: &str) -> Result<()> {
        let url = self.player_endpoint("play", device_id);
        debug!(url = %url, track_uri, "Starting playback");

        let body = PlayRequest { uris: [track_uri] };
        self.send_ok(|http| http.put(url.clone()).json(&body))
            .await?;
        Ok(())
    }
}
