//! Playmark Core
//!
//! Shared building blocks for Playmark listening sessions.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `TrackRef`, `TrackCatalog`, `SessionConfig`, `PlaybackTick`, ...
//! - **Collaborator Traits**: `StreamingApi`, `PlaybackDevice`, `TelemetrySink`,
//!   `AccessTokenProvider`, `Clock`
//! - **Error Handling**: the `ApiError` taxonomy shared by every collaborator
//!
//! The session state machine only ever talks to its collaborators through
//! these traits, so tests can inject fakes and the web client can live in its
//! own crate.
//!
//! # Example
//!
//! ```rust
//! use playmark_core::types::{TrackCatalog, TrackRef, TrackRole};
//!
//! let catalog = TrackCatalog::new(
//!     TrackRef::new(TrackRole::Anchor, "4uLU6hMCjMI75M1A2tKUQC", "Anchor"),
//!     TrackRef::new(TrackRole::Primary, "7GhIk7Il098yCjg4BQjzvb", "Primary"),
//!     vec![TrackRef::new(TrackRole::Filler, "0VjIjW4GlUZAMYd2vXMi3b", "Filler")],
//! );
//! assert!(catalog.validate().is_ok());
//! ```

#![forbid(unsafe_code)]

pub mod clock;
pub mod error;
pub mod traits;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ApiError, Result};
pub use traits::{AccessTokenProvider, PlaybackDevice, StreamingApi, TelemetrySink};

pub use types::{
    // Tracks
    CatalogError, TrackCatalog, TrackRef, TrackRole,
    // Session parameters
    NoiseKind, NoisePlan, SessionConfig, TRACKS_PER_SESSION,
    // Playback
    DeviceInfo, PlaybackTick, PlayerNotification, PlayerSnapshot,
    // Web API records
    PlaylistRef, UserProfile, Visibility,
    // Telemetry
    TelemetryEnvelope, TelemetryEvent,
};
