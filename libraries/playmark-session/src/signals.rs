//! Signals surfaced to the UI
//!
//! The state machine never renders anything. It pushes [`SessionSignal`]s
//! into an unbounded channel and whoever owns the receiver decides how to
//! show them. A dropped receiver is not an error.

use playmark_core::PlaylistRef;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Message severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// UI-facing session signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum SessionSignal {
    /// The session started playing its first track
    Started {
        session_id: Uuid,
        duration_ms: u64,
        early_finish_threshold_ms: u64,
        min_track_ratio: f64,
        track_count: u32,
    },

    /// The save-playlist button should be shown
    SaveAvailable { playlist_name: String },

    /// Progress within the current track
    TrackProgress { track_index: u32, percent: u8 },

    /// Once-per-second elapsed time update
    Elapsed { elapsed_ms: u64, remaining_ms: u64 },

    /// Every track met its ratio and the early-finish threshold passed
    EarlyFinishAvailable,

    /// Terminal: the session is complete
    Completed { code: String, early: bool },

    /// The session was saved as a playlist
    PlaylistSaved { playlist: PlaylistRef },

    /// Terminal: the login expired and the listener has to sign in again
    ReauthRequired { message: String },

    /// Free-form message
    Message { severity: Severity, text: String },
}

/// Sending half of the signal channel
#[derive(Debug, Clone, Default)]
pub struct SignalSink {
    tx: Option<mpsc::UnboundedSender<SessionSignal>>,
}

impl SignalSink {
    /// Create a connected sink and its receiver
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SessionSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that drops everything
    pub fn disconnected() -> Self {
        Self { tx: None }
    }

    /// Send a signal; a closed receiver is ignored
    pub fn send(&self, signal: SessionSignal) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(signal);
        }
    }

    /// Send a message signal
    pub fn message(&self, severity: Severity, text: impl Into<String>) {
        self.send(SessionSignal::Message {
            severity,
            text: text.into(),
        });
    }
}
