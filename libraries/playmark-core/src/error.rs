/// Error taxonomy shared by every Playmark collaborator
use thiserror::Error;

/// Result type alias using `ApiError`
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors raised by the streaming service, its playback device and the token provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No valid or refreshable access token exists; the user must re-authenticate
    #[error("Authentication expired, sign in again")]
    AuthExpired,

    /// The playback device is unknown to the service
    #[error("Playback device not found: {0}")]
    DeviceNotFound(String),

    /// Transferring playback to the device failed
    #[error("Playback transfer failed ({status}): {message}")]
    PlaybackTransferFailed { status: u16, message: String },

    /// The service answered with a non-success status
    #[error("HTTP error ({status}): {message}")]
    Http { status: u16, message: String },

    /// The request never produced a response (connect, timeout, ...)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl ApiError {
    /// Create an HTTP error
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::PlaybackTransferFailed { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Whether the error ends the whole session (re-authentication required)
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthExpired)
    }

    /// Whether the error aborts `start()` and requires the user to retry
    pub fn aborts_start(&self) -> bool {
        matches!(
            self,
            Self::AuthExpired | Self::DeviceNotFound(_) | Self::PlaybackTransferFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_auth_expired_is_fatal() {
        assert!(ApiError::AuthExpired.is_fatal());
        assert!(!ApiError::DeviceNotFound("abc".into()).is_fatal());
        assert!(!ApiError::http(500, "boom").is_fatal());
        assert!(!ApiError::transport("reset").is_fatal());
    }

    #[test]
    fn status_is_exposed_for_http_like_errors() {
        assert_eq!(ApiError::http(404, "missing").status(), Some(404));
        assert_eq!(
            ApiError::PlaybackTransferFailed {
                status: 502,
                message: "bad gateway".into()
            }
            .status(),
            Some(502)
        );
        assert_eq!(ApiError::AuthExpired.status(), None);
    }

    #[test]
    fn device_errors_abort_start() {
        assert!(ApiError::DeviceNotFound("d1".into()).aborts_start());
        assert!(!ApiError::http(429, "slow down").aborts_start());
    }
}
