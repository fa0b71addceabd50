//! Fleetbeacon - periodic vehicle location reporting
//!
//! This library provides the core functionality for a driver-side tracking
//! client: it samples the device's position at a fixed cadence and submits
//! each sample to a configured backend endpoint, exposing a start/stop
//! control surface and the outcome of the most recent submission.
//!
//! # Architecture
//!
//! - [`location`] - position acquisition (gpsd, fixed sources) behind the
//!   [`location::LocationSource`] trait, including the permission-denied and
//!   no-fix degraded paths
//! - [`transmit`] - wire encoding and HTTP submission behind the
//!   [`transmit::Transmitter`] trait
//! - [`session`] - the tracking session state machine and its tick scheduler
//! - [`prefs`] - persisted driver preferences (vehicle id and mode)
//! - [`config`] - the on-disk configuration file
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use fleetbeacon::location::FixedSource;
//! use fleetbeacon::session::{SessionConfig, TrackingSession};
//! use fleetbeacon::transmit::{HttpTransmitter, WireFormat};
//! use fleetbeacon::TransportMode;
//!
//! let source = Arc::new(FixedSource::new(8.4657, -13.2317));
//! let transmitter = Arc::new(HttpTransmitter::new(
//!     "https://tracker.example.com/api/location/update",
//!     WireFormat::Form,
//! )?);
//!
//! let session = TrackingSession::new(source, transmitter);
//! session.start(SessionConfig::new("Poda001", TransportMode::Bus))?;
//! // ... ticks run every 5 seconds until ...
//! session.stop();
//! ```

pub mod config;
pub mod location;
pub mod prefs;
pub mod session;
pub mod transmit;

pub use location::{LocationFix, LocationSample, LocationSource};
pub use session::{SessionConfig, SessionState, SessionStatus, StartError, TrackingSession};
pub use transmit::{SubmissionResult, Transmitter, WireFormat};

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Boxed future type for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

use std::fmt;
use std::str::FromStr;

/// Transport category associated with a tracked vehicle.
///
/// The set is closed: the backend normalizes modes to lowercase and the
/// fleet views key on them, so free-form strings are rejected at the
/// configuration boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportMode {
    /// Poda-poda / minibus routes.
    Bus,
    /// Shared or private taxi.
    Taxi,
    /// Kekeh (auto-rickshaw).
    Kekeh,
    /// Okada (motorbike taxi).
    Okada,
    /// Harbour ferry.
    Ferry,
}

impl TransportMode {
    /// All valid modes, in display order.
    pub const ALL: &'static [TransportMode] = &[
        TransportMode::Bus,
        TransportMode::Taxi,
        TransportMode::Kekeh,
        TransportMode::Okada,
        TransportMode::Ferry,
    ];

    /// The lowercase wire representation of this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Bus => "bus",
            TransportMode::Taxi => "taxi",
            TransportMode::Kekeh => "kekeh",
            TransportMode::Okada => "okada",
            TransportMode::Ferry => "ferry",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransportMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bus" => Ok(TransportMode::Bus),
            "taxi" => Ok(TransportMode::Taxi),
            "kekeh" => Ok(TransportMode::Kekeh),
            "okada" => Ok(TransportMode::Okada),
            "ferry" => Ok(TransportMode::Ferry),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

/// Error returned when parsing an unrecognized transport mode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transport mode '{0}' (expected one of: bus, taxi, kekeh, okada, ferry)")]
pub struct UnknownMode(pub String);
