//! Location submission pipeline
//!
//! This module provides the [`Transmitter`] trait and its HTTP
//! implementation. A transmitter encodes one location sample plus the
//! session's identity into a request and classifies the outcome:
//!
//! - Any HTTP response, whatever its status code, is
//!   [`SubmissionResult::Sent`] carrying the raw status and body. The
//!   backend's own error text is more useful to the driver than a
//!   synthesized failure.
//! - Transport-level failures (DNS, connect, timeout) are
//!   [`SubmissionResult::Failed`].
//!
//! Transmitters never retry. A failed submission is superseded by the next
//! scheduled tick, which resubmits a fresher position anyway.

mod http;

pub use http::{HttpTransmitter, TransmitError, DEFAULT_TIMEOUT_SECS};

#[cfg(test)]
pub use self::tests::MockTransmitter;

use std::fmt;
use std::str::FromStr;

use crate::location::{BoxFuture, LocationSample};
use crate::session::SessionConfig;

/// Outcome of one sample-and-submit tick.
///
/// Overwritten on every tick; only the most recent outcome is retained.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionResult {
    /// The backend responded. Carries the raw status code and body,
    /// including non-2xx responses.
    Sent {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },
    /// The request never produced a response.
    Failed {
        /// Human-readable transport failure description.
        reason: String,
    },
    /// No position was available; nothing was sent.
    NoFix,
    /// Location access is denied; nothing was sent.
    PermissionDenied,
}

impl fmt::Display for SubmissionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionResult::Sent { status, body } => write!(f, "sent ({}): {}", status, body),
            SubmissionResult::Failed { reason } => write!(f, "failed: {}", reason),
            SubmissionResult::NoFix => write!(f, "waiting for GPS fix"),
            SubmissionResult::PermissionDenied => write!(f, "location permission denied"),
        }
    }
}

/// Wire encoding for location submissions.
///
/// One variant is chosen per deployment and must match the backend; the
/// formats are not interchangeable mid-session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    /// POST with a form-urlencoded body: `id`, `lat`, `lon`, `mode`.
    #[default]
    Form,
    /// GET with the same fields in the query string.
    Query,
    /// POST with a JSON object body: `{id, mode, lat, lon}`.
    Json,
}

impl WireFormat {
    /// The configuration name of this format.
    pub fn as_str(&self) -> &'static str {
        match self {
            WireFormat::Form => "form",
            WireFormat::Query => "query",
            WireFormat::Json => "json",
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WireFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "form" => Ok(WireFormat::Form),
            "query" => Ok(WireFormat::Query),
            "json" => Ok(WireFormat::Json),
            other => Err(format!(
                "unknown wire format '{}' (expected form, query or json)",
                other
            )),
        }
    }
}

/// Submits location samples to the backend.
///
/// `send` initiates the request and resolves to a classified outcome; it
/// never returns a hard error. Dyn-compatible so sessions can hold an
/// `Arc<dyn Transmitter>` and tests can inject mocks.
pub trait Transmitter: Send + Sync {
    /// Encode and submit one sample under the given session identity.
    fn send<'a>(
        &'a self,
        sample: &'a LocationSample,
        config: &'a SessionConfig,
    ) -> BoxFuture<'a, SubmissionResult>;
}
