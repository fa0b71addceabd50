//! HTTP transmitter implementation using reqwest.

use std::time::Duration;

use tracing::debug;

use crate::location::{BoxFuture, LocationSample};
use crate::session::SessionConfig;

use super::{SubmissionResult, Transmitter, WireFormat};

/// Default total request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Errors constructing an [`HttpTransmitter`].
#[derive(Debug, thiserror::Error)]
pub enum TransmitError {
    /// The endpoint is not a valid URL.
    #[error("invalid endpoint URL '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// Failed to build the underlying HTTP client.
    #[error("failed to create HTTP client: {0}")]
    ClientBuild(String),
}

/// Transmitter submitting samples to an HTTP(S) endpoint.
///
/// The endpoint URL and wire format are fixed at construction; the total
/// request timeout (connect through body) defaults to 10 seconds.
#[derive(Debug)]
pub struct HttpTransmitter {
    client: reqwest::Client,
    endpoint: reqwest::Url,
    format: WireFormat,
    timeout: Duration,
}

impl HttpTransmitter {
    /// Create a transmitter for the given endpoint and wire format.
    pub fn new(endpoint: &str, format: WireFormat) -> Result<Self, TransmitError> {
        Self::with_timeout(endpoint, format, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a transmitter with a custom total request timeout.
    pub fn with_timeout(
        endpoint: &str,
        format: WireFormat,
        timeout: Duration,
    ) -> Result<Self, TransmitError> {
        let endpoint =
            reqwest::Url::parse(endpoint).map_err(|e| TransmitError::InvalidEndpoint {
                url: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransmitError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            format,
            timeout,
        })
    }

    /// The configured wire format.
    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    fn build_request(
        &self,
        sample: &LocationSample,
        config: &SessionConfig,
    ) -> reqwest::RequestBuilder {
        match self.format {
            WireFormat::Form => self
                .client
                .post(self.endpoint.clone())
                .form(&encode_fields(sample, config)),
            WireFormat::Query => self
                .client
                .get(self.endpoint.clone())
                .query(&encode_fields(sample, config)),
            WireFormat::Json => self.client.post(self.endpoint.clone()).json(
                &serde_json::json!({
                    "id": config.vehicle_id,
                    "mode": config.mode.as_str(),
                    "lat": sample.latitude,
                    "lon": sample.longitude,
                }),
            ),
        }
    }
}

/// Encode the submission fields shared by the form and query variants.
fn encode_fields(sample: &LocationSample, config: &SessionConfig) -> [(&'static str, String); 4] {
    [
        ("id", config.vehicle_id.clone()),
        ("lat", sample.latitude.to_string()),
        ("lon", sample.longitude.to_string()),
        ("mode", config.mode.as_str().to_string()),
    ]
}

impl Transmitter for HttpTransmitter {
    fn send<'a>(
        &'a self,
        sample: &'a LocationSample,
        config: &'a SessionConfig,
    ) -> BoxFuture<'a, SubmissionResult> {
        Box::pin(async move {
            let request = self.build_request(sample, config);

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    let reason = if e.is_timeout() {
                        format!("request timed out after {}s", self.timeout.as_secs())
                    } else {
                        e.to_string()
                    };
                    debug!(endpoint = %self.endpoint, reason = %reason, "Submission failed");
                    return SubmissionResult::Failed { reason };
                }
            };

            let status = response.status().as_u16();
            match response.text().await {
                Ok(body) => {
                    debug!(status, "Submission acknowledged");
                    SubmissionResult::Sent { status, body }
                }
                Err(e) => SubmissionResult::Failed {
                    reason: format!("failed to read response body: {}", e),
                },
            }
        })
    }
}
