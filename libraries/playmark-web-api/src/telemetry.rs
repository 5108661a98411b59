//! Telemetry sinks.

use crate::error::TelemetryError;
use crate::types::parse_http_url;
use playmark_core::{TelemetryEnvelope, TelemetrySink};
use reqwest::Client;
use tokio::runtime::Handle;
use tracing::{info, warn};
use url::Url;

/// Posts each envelope as JSON to a collector endpoint.
///
/// `emit` never waits: delivery runs on a spawned task and failures are
/// logged and dropped.
#[derive(Clone)]
pub struct HttpTelemetrySink {
    http: Client,
    endpoint: Url,
}

impl HttpTelemetrySink {
    pub fn new(http: Client, endpoint: &str) -> crate::error::Result<Self> {
        Ok(Self {
            http,
            endpoint: parse_http_url(endpoint)?,
        })
    }

    /// Deliver one envelope and wait for the collector's answer.
    pub async fn send(&self, envelope: &TelemetryEnvelope) -> Result<(), TelemetryError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(envelope)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TelemetryError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}

impl TelemetrySink for HttpTelemetrySink {
    fn emit(&self, envelope: TelemetryEnvelope) {
        let event = envelope.event.name();
        let Ok(runtime) = Handle::try_current() else {
            warn!(event, "No async runtime, telemetry dropped");
            return;
        };

        let sink = self.clone();
        runtime.spawn(async move {
            if let Err(e) = sink.send(&envelope).await {
                warn!(
                    event,
                    session_id = %envelope.session_id,
                    error = %e,
                    "Telemetry delivery failed"
                );
            }
        });
    }
}

/// Writes each envelope to the log. Used when no collector is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTelemetrySink;

impl TelemetrySink for LogTelemetrySink {
    fn emit(&self, envelope: TelemetryEnvelope) {
        match serde_json::to_string(&envelope) {
            Ok(payload) => info!(
                target: "playmark::telemetry",
                event = envelope.event.name(),
                session_id = %envelope.session_id,
                payload = %payload,
                "Telemetry"
            ),
            Err(e) => warn!(error = %e, "Failed to encode telemetry"),
        }
    }
}
