//! `PlaybackDevice` backed by Web API player commands.

use crate::client::WebApiClient;
use async_trait::async_trait;
use playmark_core::{PlaybackDevice, Result};
use std::sync::Arc;

/// Controls one device through the Web API.
pub struct WebApiDevice {
    client: Arc<WebApiClient>,
    device_id: String,
}

impl WebApiDevice {
    pub fn new(client: Arc<WebApiClient>, device_id: impl Into<String>) -> Self {
        Self {
            client,
            device_id: device_id.into(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

#[async_trait]
impl PlaybackDevice for WebApiDevice {
    async fn pause(&self) -> Result<()> {
        self.client.pause(&self.device_id).await
    }

    async fn resume(&self) -> Result<()> {
        self.client.resume(&self.device_id).await
    }

    async fn seek(&self, position_ms: u64) -> Result<()> {
        self.client.seek(&self.device_id, position_ms).await
    }

    async fn volume(&self) -> Result<u8> {
        self.client.volume(&self.device_id).await
    }

    async fn set_volume(&self, level: u8) -> Result<()> {
        self.client.set_volume(&self.device_id, level).await
    }
}
