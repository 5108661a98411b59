mod api;
mod playback;
mod session;
mod telemetry;
mod track;

pub use api::{DeviceInfo, PlaylistRef, UserProfile, Visibility};
pub use playback::{PlaybackTick, PlayerNotification, PlayerSnapshot};
pub use session::{NoiseKind, NoisePlan, SessionConfig, TRACKS_PER_SESSION};
pub use telemetry::{TelemetryEnvelope, TelemetryEvent};
pub use track::{CatalogError, TrackCatalog, TrackRef, TrackRole};
