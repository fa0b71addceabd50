//! Fixed-coordinate source for demos and tests.

use super::{BoxFuture, LocationFix, LocationSample, LocationSource};

/// Source that always reports the same coordinate.
///
/// Useful for demo deployments and end-to-end testing without positioning
/// hardware - the equivalent of driving a simulated vehicle on a fixed
/// stand. Each acquisition produces a fresh capture timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedSource {
    latitude: f64,
    longitude: f64,
}

impl FixedSource {
    /// Create a source pinned to the given coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl LocationSource for FixedSource {
    fn acquire(&self) -> BoxFuture<'_, LocationFix> {
        Box::pin(async move {
            LocationFix::Fix(LocationSample::new(self.latitude, self.longitude))
        })
    }
}
