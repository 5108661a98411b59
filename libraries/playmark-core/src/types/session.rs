/// Per-session parameters drawn by the randomization policy
use super::track::TrackRef;
use serde::{Deserialize, Serialize};

/// Number of tracks every session plays
pub const TRACKS_PER_SESSION: usize = 3;

/// Immutable session parameters, drawn once at session start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Total session length
    pub duration_ms: u64,

    /// Fraction of a track's duration that counts as listened, in (0, 1]
    pub min_track_ratio: f64,

    /// Elapsed time after which early finish becomes possible
    pub early_finish_threshold_ms: u64,

    /// Fixed-size play order
    pub track_order: Vec<TrackRef>,

    /// Whether the save-playlist affordance is offered
    pub show_save_button: bool,

    /// Name used if the user saves the session as a playlist
    pub playlist_name: String,
}

impl SessionConfig {
    /// Number of tracks in the order
    pub fn track_count(&self) -> u32 {
        self.track_order.len() as u32
    }

    /// Track at a 1-based index
    pub fn track(&self, index: u32) -> Option<&TrackRef> {
        if index == 0 {
            return None;
        }
        self.track_order.get(index as usize - 1)
    }

    /// URIs in play order
    pub fn track_uris(&self) -> Vec<String> {
        self.track_order.iter().map(|t| t.uri.clone()).collect()
    }

    /// `0 < early_finish_threshold_ms <= duration_ms`, ratio in (0, 1], fixed order length
    pub fn satisfies_invariants(&self) -> bool {
        self.early_finish_threshold_ms > 0
            && self.early_finish_threshold_ms <= self.duration_ms
            && self.min_track_ratio > 0.0
            && self.min_track_ratio <= 1.0
            && self.track_order.len() == TRACKS_PER_SESSION
    }
}

/// Kind of transient interaction injected into one track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseKind {
    /// Pause, then resume after the hold time
    PauseResume,
    /// Lower the volume, then restore it after the hold time
    VolumeDip,
}

impl NoiseKind {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PauseResume => "pause_resume",
            Self::VolumeDip => "volume_dip",
        }
    }
}

/// A drawn noise interaction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoisePlan {
    /// What to do
    pub kind: NoiseKind,

    /// Delay after the track's play command before the interaction begins
    pub offset_ms: u64,

    /// How long the pause or dip lasts
    pub hold_ms: u64,

    /// Fraction of the current volume kept during a dip (ignored for pauses)
    pub dip_factor: f64,
}
