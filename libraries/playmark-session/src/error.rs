//! Error types for the session state machine

use playmark_core::ApiError;
use playmark_policy::PolicyError;
use thiserror::Error;

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// A Web API or device call failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The session parameters could not be drawn
    #[error("Session configuration error: {0}")]
    Policy(#[from] PolicyError),

    /// `start()` was called before the player reported a ready device
    #[error("No playback device is ready")]
    DeviceNotReady,

    /// `start()` was called on a machine that already owns a session
    #[error("Session already started")]
    AlreadyStarted,

    /// The operation needs a running session
    #[error("Session is not running")]
    NotRunning,

    /// Early finish requested before every track met its ratio and the threshold passed
    #[error("Early finish is not available yet")]
    NotEligible,

    /// The save-playlist affordance was not offered for this session
    #[error("Saving this session as a playlist is not available")]
    SaveUnavailable,

    /// The drawn parameters violate the session invariants
    #[error("Drawn session config violates its invariants")]
    InvalidConfig,

    /// The driver task is gone
    #[error("Session driver has stopped")]
    DriverClosed,
}

impl SessionError {
    /// Whether the error ends the session and requires re-authentication
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_fatal())
    }
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
