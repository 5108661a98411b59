//! Error types for the Web API client.

use playmark_core::ApiError;
use reqwest::Response;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while building a client.
///
/// Request-time failures use [`ApiError`] so they flow straight into the
/// session state machine.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Invalid service or token URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Result type for client construction.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Telemetry delivery failures. Logged by the sink, never surfaced.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The request never produced a response
    #[error("Telemetry request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The collector answered with a non-success status
    #[error("Telemetry rejected ({status})")]
    Rejected { status: u16 },
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Object { message: String },
    Code(String),
}

/// Map a reqwest failure that happened before or while reading a response.
pub(crate) fn transport_error(e: reqwest::Error) -> ApiError {
    if e.is_decode() {
        ApiError::parse(e.to_string())
    } else {
        ApiError::transport(e.to_string())
    }
}

/// Build an error from a non-success response.
///
/// The service wraps messages as `{"error": {"status": .., "message": ..}}`;
/// the raw body is used when it doesn't.
pub(crate) async fn status_error(response: Response) -> ApiError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    ApiError::http(status, error_message(&text))
}

pub(crate) fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error: ErrorDetail::Object { message },
        }) => message,
        Ok(ErrorBody {
            error: ErrorDetail::Code(code),
        }) => code,
        Err(_) => body.trim().to_string(),
    }
}
