//! Position acquisition abstraction
//!
//! This module provides traits and implementations for acquiring the
//! device's current position. Acquisition is fallible in two distinct,
//! non-fatal ways that the session reports separately:
//!
//! - **No fix**: the positioning subsystem has no usable position yet
//!   (cold start, indoors, daemon unreachable). Transient; expected to
//!   resolve on a later tick.
//! - **Permission denied**: the platform refuses access to location.
//!   The surrounding host is responsible for obtaining permission; the
//!   session keeps ticking so a later grant takes effect without a restart.
//!
//! Acquisition is bounded in time. A source that cannot produce a fix
//! within its deadline reports [`LocationFix::NoFix`] rather than hanging
//! the tick.

mod fixed;
mod gpsd;
mod permission;

pub use fixed::FixedSource;
pub use gpsd::{GpsdSource, DEFAULT_GPSD_ADDR};
pub use permission::{AllowAll, PermissionGated, PermissionProvider};

#[cfg(test)]
pub use permission::tests::DenyAll;

use chrono::{DateTime, Utc};

pub use crate::BoxFuture;

/// A single position reading.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationSample {
    /// Latitude in decimal degrees (WGS84).
    pub latitude: f64,
    /// Longitude in decimal degrees (WGS84).
    pub longitude: f64,
    /// When this sample was captured.
    pub captured_at: DateTime<Utc>,
}

impl LocationSample {
    /// Create a sample captured now.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            captured_at: Utc::now(),
        }
    }
}

/// Outcome of a single acquisition attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationFix {
    /// A valid position reading.
    Fix(LocationSample),
    /// No position available within the acquisition deadline.
    NoFix,
    /// The platform denied access to location.
    PermissionDenied,
}

/// Source of position readings.
///
/// Implementations must resolve within a bounded time: either a fix, or one
/// of the two sentinel outcomes. Acquisition never panics and never returns
/// a hard error - every failure mode degrades to a reportable outcome so
/// the session can try again on the next tick.
///
/// Uses `Pin<Box<dyn Future>>` for trait object support (`Arc<dyn
/// LocationSource>`), allowing sources to be injected and decorated.
pub trait LocationSource: Send + Sync {
    /// Acquire the current position.
    fn acquire(&self) -> BoxFuture<'_, LocationFix>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Mock source returning a scripted sequence of outcomes.
    ///
    /// Outcomes are yielded in order; the last one repeats once the script
    /// is exhausted.
    pub struct MockLocationSource {
        script: Mutex<Vec<LocationFix>>,
        calls: Mutex<u64>,
    }

    impl MockLocationSource {
        pub fn new(script: Vec<LocationFix>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: Mutex::new(0),
            }
        }

        /// Source that always returns the same outcome.
        pub fn always(fix: LocationFix) -> Self {
            Self::new(vec![fix])
        }

        /// Number of acquisition attempts made so far.
        pub fn calls(&self) -> u64 {
            *self.calls.lock()
        }
    }

    impl LocationSource for MockLocationSource {
        fn acquire(&self) -> BoxFuture<'_, LocationFix> {
            Box::pin(async move {
                *self.calls.lock() += 1;
                let mut script = self.script.lock();
                if script.len() > 1 {
                    script.remove(0)
                } else {
                    script[0].clone()
                }
            })
        }
    }

    #[tokio::test]
    async fn test_mock_source_scripted_sequence() {
        let source = MockLocationSource::new(vec![
            LocationFix::NoFix,
            LocationFix::Fix(LocationSample::new(8.4657, -13.2317)),
        ]);

        assert_eq!(source.acquire().await, LocationFix::NoFix);
        let fix = source.acquire().await;
        assert!(matches!(fix, LocationFix::Fix(_)));
        // Last outcome repeats
        assert_eq!(source.acquire().await, fix);
        assert_eq!(source.calls(), 3);
    }

    #[test]
    fn test_sample_new_stamps_capture_time() {
        let before = Utc::now();
        let sample = LocationSample::new(8.4657, -13.2317);
        assert!(sample.captured_at >= before);
        assert_eq!(sample.latitude, 8.4657);
        assert_eq!(sample.longitude, -13.2317);
    }
}
