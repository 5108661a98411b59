//! Playback event adapter
//!
//! Maps the player's notifications onto state machine calls, one handler per
//! notification kind. Nothing is buffered: each notification is handed to the
//! machine as soon as it arrives.

use playmark_core::{PlaybackTick, PlayerNotification, PlayerSnapshot};
use tracing::{debug, trace};

/// Receiver of normalized player events
///
/// Implemented by [`crate::SessionStateMachine`]; tests can implement it to
/// observe what the adapter dispatches.
pub trait PlayerEventHandler {
    /// The player reported a usable device
    fn set_device(&mut self, device_id: String);

    /// The device went away
    fn clear_device(&mut self, device_id: &str);

    /// A state change with a current track
    fn on_tick(&mut self, tick: PlaybackTick);

    /// The player reported an error of its own; `fatal` when it cannot go on
    fn report_player_error(&mut self, message: &str, fatal: bool);
}

/// Stateless mapping from [`PlayerNotification`] to [`PlayerEventHandler`]
pub struct PlaybackEventAdapter;

impl PlaybackEventAdapter {
    /// Build a tick from a snapshot
    ///
    /// Returns `None` when the player has no current track.
    pub fn normalize(snapshot: &PlayerSnapshot) -> Option<PlaybackTick> {
        let track_id = snapshot.current_track_id.as_deref()?;
        if track_id.is_empty() {
            return None;
        }
        Some(PlaybackTick {
            position_ms: snapshot.position_ms,
            duration_ms: snapshot.duration_ms,
            paused: snapshot.paused,
            current_track_id: track_id.to_string(),
        })
    }

    /// Deliver one notification to the handler
    pub fn dispatch<H: PlayerEventHandler + ?Sized>(
        notification: PlayerNotification,
        handler: &mut H,
    ) {
        match notification {
            PlayerNotification::Ready { device_id } => {
                debug!(device_id = %device_id, "Player ready");
                handler.set_device(device_id);
            }
            PlayerNotification::NotReady { device_id } => {
                debug!(device_id = %device_id, "Player not ready");
                handler.clear_device(&device_id);
            }
            PlayerNotification::StateChanged(Some(snapshot)) => {
                match Self::normalize(&snapshot) {
                    Some(tick) => handler.on_tick(tick),
                    None => trace!("State change without a current track"),
                }
            }
            PlayerNotification::StateChanged(None) => {
                trace!("Empty state change");
            }
            PlayerNotification::Error { message, fatal } => {
                handler.report_player_error(&message, fatal);
            }
        }
    }
}
