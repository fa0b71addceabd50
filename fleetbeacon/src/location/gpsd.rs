//! gpsd-backed position source.
//!
//! Connects to a gpsd daemon over TCP, enables JSON watch mode, and waits
//! for a TPV (time-position-velocity) report carrying a 2-D or better fix.
//! Everything that can go wrong - daemon not running, connection dropped,
//! no satellites yet - degrades to [`LocationFix::NoFix`] within the
//! acquisition deadline.

use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use super::{BoxFuture, LocationFix, LocationSample, LocationSource};

/// Default gpsd address on the local host.
pub const DEFAULT_GPSD_ADDR: &str = "127.0.0.1:2947";

/// Default acquisition deadline in seconds.
///
/// Must stay comfortably below the reporting interval so a dead daemon
/// cannot starve the tick cadence.
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 3;

/// Watch command enabling JSON report streaming.
const WATCH_ENABLE: &[u8] = b"?WATCH={\"enable\":true,\"json\":true}\n";

/// Position source backed by a gpsd daemon.
///
/// Each acquisition opens a fresh connection and waits for the first
/// usable TPV report. Opening per tick keeps the source stateless across
/// ticks; gpsd multiplexes watchers cheaply.
#[derive(Debug, Clone)]
pub struct GpsdSource {
    addr: String,
    acquire_timeout: Duration,
}

impl GpsdSource {
    /// Create a source talking to gpsd at the given `host:port` address.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        }
    }

    /// Set the acquisition deadline.
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    async fn poll_fix(&self) -> LocationFix {
        let stream = match TcpStream::connect(&self.addr).await {
            Ok(stream) => stream,
            Err(e) => {
                debug!(addr = %self.addr, error = %e, "gpsd connection failed");
                return LocationFix::NoFix;
            }
        };

        let (reader, mut writer) = stream.into_split();
        if let Err(e) = writer.write_all(WATCH_ENABLE).await {
            debug!(error = %e, "Failed to enable gpsd watch mode");
            return LocationFix::NoFix;
        }

        let mut lines = BufReader::new(reader).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("gpsd closed the connection before reporting a fix");
                    return LocationFix::NoFix;
                }
                Err(e) => {
                    debug!(error = %e, "Read error on gpsd connection");
                    return LocationFix::NoFix;
                }
            };

            let report: GpsdReport = match serde_json::from_str(&line) {
                Ok(report) => report,
                // Non-JSON noise is ignored; gpsd also emits VERSION,
                // DEVICES and SKY reports we don't care about.
                Err(_) => continue,
            };

            if let Some(fix) = report.into_fix() {
                return LocationFix::Fix(fix);
            }
        }
    }
}

impl Default for GpsdSource {
    fn default() -> Self {
        Self::new(DEFAULT_GPSD_ADDR)
    }
}

impl LocationSource for GpsdSource {
    fn acquire(&self) -> BoxFuture<'_, LocationFix> {
        Box::pin(async move {
            match tokio::time::timeout(self.acquire_timeout, self.poll_fix()).await {
                Ok(fix) => fix,
                Err(_) => {
                    debug!(
                        timeout_secs = self.acquire_timeout.as_secs(),
                        "gpsd acquisition timed out"
                    );
                    LocationFix::NoFix
                }
            }
        })
    }
}

/// Subset of a gpsd JSON report relevant to acquisition.
///
/// TPV `mode` values: 0 unknown, 1 no fix, 2 two-dimensional, 3
/// three-dimensional.
#[derive(Debug, Deserialize)]
struct GpsdReport {
    class: String,
    #[serde(default)]
    mode: Option<u8>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

impl GpsdReport {
    /// Extract a usable position, if this report carries one.
    fn into_fix(self) -> Option<LocationSample> {
        if self.class != "TPV" || self.mode.unwrap_or(0) < 2 {
            return None;
        }
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(LocationSample::new(lat, lon)),
            _ => None,
        }
    }
}
