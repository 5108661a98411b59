/// Structured telemetry records
use super::session::NoiseKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Milestones recorded during a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// Session started with the drawn parameters
    SessionStarted {
        duration_ms: u64,
        min_track_ratio: f64,
        early_finish_threshold_ms: u64,
        track_order: Vec<String>,
        show_save_button: bool,
    },

    /// A play command was issued for a track
    TrackStarted {
        track_index: u32,
        track_uri: String,
        gap_ms: u64,
    },

    /// The session moved past a track
    TrackEnded {
        track_index: u32,
        track_uri: String,
        position_ms: u64,
        duration_ms: u64,
    },

    /// A play command failed; the session keeps running
    PlaybackFailed { track_index: u32, message: String },

    /// A transient pause or volume dip was injected
    NoiseInjected { track_index: u32, kind: NoiseKind },

    /// All tracks met their ratio before the full duration
    EarlyFinishAvailable { elapsed_ms: u64 },

    /// The session was saved as a playlist
    PlaylistSaved { playlist_id: String },

    /// Terminal event, emitted exactly once
    SessionCompleted {
        elapsed_ms: u64,
        track_order: Vec<String>,
        per_track_ratios: Vec<f64>,
        completion_code: String,
        early: bool,
    },

    /// The session ended without a code because the login expired
    SessionAborted { elapsed_ms: u64, reason: String },
}

impl TelemetryEvent {
    /// Short event name, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionStarted { .. } => "session_started",
            Self::TrackStarted { .. } => "track_started",
            Self::TrackEnded { .. } => "track_ended",
            Self::PlaybackFailed { .. } => "playback_failed",
            Self::NoiseInjected { .. } => "noise_injected",
            Self::EarlyFinishAvailable { .. } => "early_finish_available",
            Self::PlaylistSaved { .. } => "playlist_saved",
            Self::SessionCompleted { .. } => "session_completed",
            Self::SessionAborted { .. } => "session_aborted",
        }
    }
}

/// An event stamped with its session and time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEnvelope {
    pub session_id: Uuid,
    pub emitted_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: TelemetryEvent,
}

impl TelemetryEnvelope {
    /// Wrap an event emitted at `now_ms` (epoch millis)
    pub fn new(session_id: Uuid, now_ms: i64, event: TelemetryEvent) -> Self {
        Self {
            session_id,
            emitted_at: DateTime::from_timestamp_millis(now_ms).unwrap_or_else(Utc::now),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serializes_flat_with_type_tag() {
        let envelope = TelemetryEnvelope::new(
            Uuid::nil(),
            1_700_000_000_000,
            TelemetryEvent::EarlyFinishAvailable { elapsed_ms: 245_000 },
        );

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["type"], "early_finish_available");
        assert_eq!(json["elapsed_ms"], 245_000);
        assert_eq!(json["session_id"], Uuid::nil().to_string());
        assert!(json["emitted_at"].as_str().unwrap().starts_with("2023-11-14"));
    }

    #[test]
    fn completed_event_round_trips() {
        let event = TelemetryEvent::SessionCompleted {
            elapsed_ms: 305_000,
            track_order: vec!["spotify:track:a".into()],
            per_track_ratios: vec![0.91],
            completion_code: "PM-ABC123".into(),
            early: false,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: TelemetryEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.name(), "session_completed");
    }

    #[test]
    fn aborted_event_carries_reason() {
        let event = TelemetryEvent::SessionAborted {
            elapsed_ms: 42_000,
            reason: "Authentication expired".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "session_aborted");
        assert_eq!(json["reason"], "Authentication expired");
        assert_eq!(event.name(), "session_aborted");
    }
}
