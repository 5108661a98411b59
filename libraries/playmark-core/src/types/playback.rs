/// Player notifications and the normalized playback tick
use serde::{Deserialize, Serialize};

/// Normalized playback state, one per player notification
///
/// Ephemeral: the state machine folds it into its runtime and drops it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackTick {
    /// Position within the current track
    pub position_ms: u64,

    /// Duration of the current track (0 when unknown)
    pub duration_ms: u64,

    /// Whether playback is paused
    pub paused: bool,

    /// Id (or URI) of the track the player reports as current
    pub current_track_id: String,
}

impl PlaybackTick {
    /// Fraction of the track played; 0 when the duration is unknown
    pub fn progress_ratio(&self) -> f64 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        self.position_ms as f64 / self.duration_ms as f64
    }
}

/// Raw player state as reported by the device
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Position within the current track
    pub position_ms: u64,

    /// Duration of the current track
    pub duration_ms: u64,

    /// Whether playback is paused
    pub paused: bool,

    /// Current track id, absent between tracks or before the first play
    pub current_track_id: Option<String>,
}

/// Notifications delivered by the external player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerNotification {
    /// The device is ready to receive playback
    Ready { device_id: String },

    /// The device went away
    NotReady { device_id: String },

    /// Player state changed; `None` when nothing is loaded
    StateChanged(Option<PlayerSnapshot>),

    /// The player reported an error; `fatal` when the login behind it expired
    Error { message: String, fatal: bool },
}
