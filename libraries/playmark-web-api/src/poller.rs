//! Player-state poller.
//!
//! The Web API has no push channel for player state, so the poller turns
//! periodic `GET /v1/me/player` responses into `PlayerNotification`s for the
//! session driver.

use crate::client::WebApiClient;
use playmark_core::{DeviceInfo, PlayerNotification, PlayerSnapshot, Result};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Look up a device by its display name (case-insensitive).
pub async fn find_device(client: &WebApiClient, name: &str) -> Result<Option<DeviceInfo>> {
    let devices = client.devices().await?;
    Ok(devices
        .into_iter()
        .find(|d| d.name.eq_ignore_ascii_case(name)))
}

/// Polls the player and forwards state changes until cancelled.
pub struct PlayerPoller {
    client: Arc<WebApiClient>,
    device_name: String,
    interval: Duration,
    token: CancellationToken,
    device_id: Option<String>,
    last_state: Option<Option<PlayerSnapshot>>,
    last_error: Option<String>,
}

impl PlayerPoller {
    pub fn new(
        client: Arc<WebApiClient>,
        device_name: impl Into<String>,
        interval: Duration,
        token: CancellationToken,
    ) -> Self {
        Self {
            client,
            device_name: device_name.into(),
            interval,
            token,
            device_id: None,
            last_state: None,
            last_error: None,
        }
    }

    /// Run on a new task
    pub fn spawn(self, tx: mpsc::Sender<PlayerNotification>) -> JoinHandle<()> {
        tokio::spawn(self.run(tx))
    }

    /// Poll until the token is cancelled, the receiver goes away, or the
    /// service reports that authentication expired.
    pub async fn run(mut self, tx: mpsc::Sender<PlayerNotification>) {
        info!(
            device = %self.device_name,
            interval_ms = self.interval.as_millis() as u64,
            "Player poller started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = self.token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if self.poll_once(&tx).await.is_break() {
                break;
            }
        }

        debug!(device = %self.device_name, "Player poller stopped");
    }

    async fn poll_once(&mut self, tx: &mpsc::Sender<PlayerNotification>) -> ControlFlow<()> {
        let Some(device_id) = self.device_id.clone() else {
            return self.discover(tx).await;
        };

        match self.client.player_state().await {
            Ok(state) => {
                self.last_error = None;
                // Another device playing counts as nothing playing here
                let snapshot = state
                    .filter(|s| !matches!(s.device_id(), Some(id) if id != device_id))
                    .map(|s| s.snapshot());
                if self.last_state.as_ref() == Some(&snapshot) {
                    return ControlFlow::Continue(());
                }
                self.last_state = Some(snapshot.clone());
                send(tx, PlayerNotification::StateChanged(snapshot)).await
            }
            Err(e) => self.report(tx, &e).await,
        }
    }

    async fn discover(&mut self, tx: &mpsc::Sender<PlayerNotification>) -> ControlFlow<()> {
        match find_device(&self.client, &self.device_name).await {
            Ok(Some(device)) => {
                info!(device_id = %device.id, name = %device.name, "Playback device found");
                self.last_error = None;
                self.device_id = Some(device.id.clone());
                send(
                    tx,
                    PlayerNotification::Ready {
                        device_id: device.id,
                    },
                )
                .await
            }
            Ok(None) => {
                debug!(device = %self.device_name, "Playback device not visible yet");
                ControlFlow::Continue(())
            }
            Err(e) => self.report(tx, &e).await,
        }
    }

    /// Forward an error once per distinct message.
    async fn report(
        &mut self,
        tx: &mpsc::Sender<PlayerNotification>,
        error: &playmark_core::ApiError,
    ) -> ControlFlow<()> {
        let message = error.to_string();
        if self.last_error.as_deref() != Some(message.as_str()) {
            warn!(error = %message, "Player poll failed");
            self.last_error = Some(message.clone());
            let notification = PlayerNotification::Error {
                message,
                fatal: error.is_fatal(),
            };
            if send(tx, notification).await.is_break() {
                return ControlFlow::Break(());
            }
        }
        if error.is_fatal() {
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }
}

async fn send(
    tx: &mpsc::Sender<PlayerNotification>,
    notification: PlayerNotification,
) -> ControlFlow<()> {
    if tx.send(notification).await.is_err() {
        debug!("Notification receiver dropped");
        return ControlFlow::Break(());
    }
    ControlFlow::Continue(())
}
