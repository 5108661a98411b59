//! Playmark Web API
//!
//! Streaming service integration for Playmark sessions.
//!
//! # Features
//!
//! - **API client**: bearer-authenticated `StreamingApi` with one
//!   refresh-and-retry on 401
//! - **Token store**: refresh-token exchange against the OAuth token endpoint
//! - **Device**: `PlaybackDevice` backed by player commands
//! - **Poller**: turns player state into `PlayerNotification`s
//! - **Telemetry**: fire-and-forget HTTP sink and a log-only sink
//!
//! # Example
//!
//! ```ignore
//! use playmark_web_api::{http_client, ApiConfig, AuthConfig, TokenStore, WebApiClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApiConfig::new("https://api.spotify.com");
//!     let http = http_client(&config)?;
//!     let tokens = Arc::new(TokenStore::new(http.clone(), &auth_config)?);
//!     let client = Arc::new(WebApiClient::with_http(http, &config, tokens)?);
//!
//!     let device = find_device(&client, "Playmark").await?;
//!     println!("{device:?}");
//!     Ok(())
//! }
//! ```

mod auth;
mod client;
mod device;
mod error;
mod poller;
mod telemetry;
mod types;

pub use auth::TokenStore;
pub use client::{http_client, WebApiClient};
pub use device::WebApiDevice;
pub use error::{ClientError, Result, TelemetryError};
pub use poller::{find_device, PlayerPoller, DEFAULT_POLL_INTERVAL};
pub use telemetry::{HttpTelemetrySink, LogTelemetrySink};
pub use types::{
    ApiConfig, AuthConfig, PlayerState, PlayingItem, TokenResponse, ADD_TRACKS_BATCH,
    DEFAULT_TIMEOUT,
};
