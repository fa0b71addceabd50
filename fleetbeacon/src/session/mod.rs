//! Tracking session state machine
//!
//! A [`TrackingSession`] coordinates the scheduler, location source and
//! transmitter: `start(config)` validates the configuration, transitions to
//! `Active` and arms the scheduler with an immediate first tick; each tick
//! acquires a position and submits it; `stop()` disarms the scheduler and
//! returns to `Idle`.
//!
//! # Invariants
//!
//! - The scheduler is armed if and only if the session is `Active`.
//! - `last_result` is written only by ticks belonging to the currently
//!   active session. A tick in flight when `stop()` completes discards its
//!   result instead of writing into a session that has reverted to `Idle`
//!   (enforced by an epoch counter captured when the scheduler is armed).
//! - The config is set exactly once per active period; `stop()` clears it.
//!
//! No tick outcome is fatal: permission denials, missing fixes and network
//! failures are all recorded and retried by the next scheduled tick.
//!
//! # Example
//!
//! ```ignore
//! let session = TrackingSession::new(source, transmitter)
//!     .with_interval(Duration::from_secs(5));
//!
//! session.start(SessionConfig::new("Poda001", TransportMode::Bus))?;
//! let status = session.status();
//! session.stop();
//! ```

mod scheduler;

pub use scheduler::Scheduler;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::location::{LocationFix, LocationSource};
use crate::prefs::{PreferenceStore, Preferences};
use crate::transmit::{SubmissionResult, Transmitter};
use crate::TransportMode;

/// Default reporting interval in seconds.
pub const DEFAULT_INTERVAL_SECS: u64 = 5;

/// Immutable configuration of one tracking session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Vehicle identifier reported to the backend.
    pub vehicle_id: String,
    /// Transport mode the vehicle operates under.
    pub mode: TransportMode,
}

impl SessionConfig {
    /// Create a config, trimming surrounding whitespace from the id.
    pub fn new(vehicle_id: impl Into<String>, mode: TransportMode) -> Self {
        Self {
            vehicle_id: vehicle_id.into().trim().to_string(),
            mode,
        }
    }
}

/// Errors surfaced synchronously by [`TrackingSession::start`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StartError {
    /// The configuration failed validation; no state change occurred.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A session is already active; stop it first.
    #[error("a tracking session is already active")]
    AlreadyActive,
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session running. Initial state; re-entered on every stop.
    Idle,
    /// Ticks are being scheduled.
    Active,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Active => write!(f, "active"),
        }
    }
}

/// Observable snapshot of a session.
///
/// Published through a watch channel on every change; presentation layers
/// subscribe and render it however they like.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    /// Current lifecycle state.
    pub state: SessionState,
    /// Active config, if any.
    pub config: Option<SessionConfig>,
    /// Outcome of the most recent completed tick.
    pub last_result: Option<SubmissionResult>,
    /// Completed ticks in the current active period.
    pub ticks: u64,
}

struct Inner {
    state: SessionState,
    config: Option<SessionConfig>,
    last_result: Option<SubmissionResult>,
    ticks: u64,
    /// Bumped on every start and stop; ticks carry the epoch they were
    /// armed under and discard their result if it no longer matches.
    epoch: u64,
    scheduler: Option<Scheduler>,
}

impl Inner {
    fn snapshot(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            config: self.config.clone(),
            last_result: self.last_result.clone(),
            ticks: self.ticks,
        }
    }
}

/// The tracking session engine.
///
/// Independently constructible with injected dependencies; hosts (CLI, UI
/// shells) hold a reference and forward lifecycle events. `start`, `stop`
/// and the tick task serialize through one internal lock, so all three may
/// be invoked from any thread.
pub struct TrackingSession {
    inner: Arc<RwLock<Inner>>,
    source: Arc<dyn LocationSource>,
    transmitter: Arc<dyn Transmitter>,
    prefs: Option<Arc<dyn PreferenceStore>>,
    interval: Duration,
    status_tx: Arc<watch::Sender<SessionStatus>>,
}

impl TrackingSession {
    /// Create an idle session with the default 5 second interval.
    pub fn new(source: Arc<dyn LocationSource>, transmitter: Arc<dyn Transmitter>) -> Self {
        let inner = Inner {
            state: SessionState::Idle,
            config: None,
            last_result: None,
            ticks: 0,
            epoch: 0,
            scheduler: None,
        };
        let (status_tx, _) = watch::channel(inner.snapshot());

        Self {
            inner: Arc::new(RwLock::new(inner)),
            source,
            transmitter,
            prefs: None,
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            status_tx: Arc::new(status_tx),
        }
    }

    /// Set the reporting interval. Must be non-zero.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Attach a preference store; the config of every started session is
    /// persisted to it.
    pub fn with_preferences(mut self, prefs: Arc<dyn PreferenceStore>) -> Self {
        self.prefs = Some(prefs);
        self
    }

    /// Start tracking under the given config.
    ///
    /// Allowed only from `Idle`. The first tick fires immediately, then
    /// ticks repeat at the configured interval until [`stop`](Self::stop).
    /// On a validation failure no state changes and no tick ever fires.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, config: SessionConfig) -> Result<(), StartError> {
        let mut inner = self.inner.write();

        if inner.state == SessionState::Active {
            return Err(StartError::AlreadyActive);
        }
        if config.vehicle_id.is_empty() {
            return Err(StartError::InvalidConfig(
                "vehicle id must not be empty".to_string(),
            ));
        }

        if let Some(prefs) = &self.prefs {
            let preferences = Preferences {
                vehicle_id: config.vehicle_id.clone(),
                mode: config.mode,
            };
            // Best-effort: a failed save must not block tracking.
            if let Err(e) = prefs.save(&preferences) {
                warn!(error = %e, "Failed to persist driver preferences");
            }
        }

        inner.epoch += 1;
        inner.state = SessionState::Active;
        inner.config = Some(config.clone());
        inner.last_result = None;
        inner.ticks = 0;

        let ctx = TickContext {
            inner: Arc::clone(&self.inner),
            source: Arc::clone(&self.source),
            transmitter: Arc::clone(&self.transmitter),
            status_tx: Arc::clone(&self.status_tx),
            epoch: inner.epoch,
        };
        inner.scheduler = Some(Scheduler::arm(self.interval, move || {
            ctx.clone().run_tick()
        }));

        let status = inner.snapshot();
        drop(inner);
        self.status_tx.send_replace(status);

        info!(vehicle_id = %config.vehicle_id, mode = %config.mode, "Tracking session started");
        Ok(())
    }

    /// Stop tracking.
    ///
    /// Idempotent and allowed from any state. Disarms the scheduler and
    /// clears the config; a tick already in flight runs to completion but
    /// its result is discarded.
    pub fn stop(&self) {
        let mut inner = self.inner.write();
        if inner.state == SessionState::Idle {
            return;
        }

        inner.epoch += 1;
        if let Some(scheduler) = inner.scheduler.take() {
            scheduler.disarm();
        }
        inner.state = SessionState::Idle;
        inner.config = None;

        let status = inner.snapshot();
        drop(inner);
        self.status_tx.send_replace(status);

        info!("Tracking session stopped");
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.inner.read().state
    }

    /// Snapshot of the observable session state.
    pub fn status(&self) -> SessionStatus {
        self.inner.read().snapshot()
    }

    /// Outcome of the most recent completed tick, if any.
    pub fn last_result(&self) -> Option<SubmissionResult> {
        self.inner.read().last_result.clone()
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Everything one tick needs, cloned into the scheduler callback.
#[derive(Clone)]
struct TickContext {
    inner: Arc<RwLock<Inner>>,
    source: Arc<dyn LocationSource>,
    transmitter: Arc<dyn Transmitter>,
    status_tx: Arc<watch::Sender<SessionStatus>>,
    epoch: u64,
}

impl TickContext {
    /// Execute one sample-and-submit cycle.
    async fn run_tick(self) {
        // Snapshot the config under the lock; bail if the session this
        // tick belongs to is no longer the active one.
        let config = {
            let inner = self.inner.read();
            if inner.epoch != self.epoch || inner.state != SessionState::Active {
                return;
            }
            match &inner.config {
                Some(config) => config.clone(),
                None => return,
            }
        };

        let outcome = match self.source.acquire().await {
            LocationFix::Fix(sample) => self.transmitter.send(&sample, &config).await,
            LocationFix::NoFix => SubmissionResult::NoFix,
            LocationFix::PermissionDenied => SubmissionResult::PermissionDenied,
        };

        let mut inner = self.inner.write();
        if inner.epoch != self.epoch || inner.state != SessionState::Active {
            debug!("Discarding tick result from a stopped session");
            return;
        }

        match &outcome {
            SubmissionResult::Sent { status, .. } => {
                debug!(status, vehicle_id = %config.vehicle_id, "Location submitted")
            }
            SubmissionResult::Failed { reason } => warn!(%reason, "Submission failed"),
            SubmissionResult::NoFix => debug!("Waiting for GPS fix"),
            SubmissionResult::PermissionDenied => warn!("Location permission denied"),
        }

        inner.ticks += 1;
        inner.last_result = Some(outcome);
        let status = inner.snapshot();
        drop(inner);
        self.status_tx.send_replace(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::tests::MockLocationSource;
    use crate::location::{BoxFuture, LocationSample};
    use crate::transmit::tests::MockTransmitter;

    fn bus_config() -> SessionConfig {
        SessionConfig::new("Poda001", TransportMode::Bus)
    }

    fn fix(lat: f64, lon: f64) -> LocationFix {
        LocationFix::Fix(LocationSample::new(lat, lon))
    }

    fn session_with(
        source_outcome: LocationFix,
        transmitter: Arc<MockTransmitter>,
    ) -> (TrackingSession, Arc<MockLocationSource>) {
        let source = Arc::new(MockLocationSource::always(source_outcome));
        let session = TrackingSession::new(Arc::clone(&source) as Arc<dyn LocationSource>, transmitter);
        (session, source)
    }

    #[test]
    fn test_config_trims_vehicle_id() {
        let config = SessionConfig::new("  Poda001  ", TransportMode::Bus);
        assert_eq!(config.vehicle_id, "Poda001");
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_with_empty_id_is_rejected() {
        let transmitter = Arc::new(MockTransmitter::ok());
        let (session, _) = session_with(fix(8.4657, -13.2317), Arc::clone(&transmitter));

        let err = session
            .start(SessionConfig::new("   ", TransportMode::Bus))
            .unwrap_err();
        assert!(matches!(err, StartError::InvalidConfig(_)));
        assert_eq!(session.state(), SessionState::Idle);

        // No tick may ever fire for a rejected start.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transmitter.sent_count(), 0);
        assert_eq!(session.status().ticks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_is_rejected_without_state_change() {
        let transmitter = Arc::new(MockTransmitter::ok());
        let (session, _) = session_with(fix(1.0, 2.0), transmitter);

        session.start(bus_config()).unwrap();
        let err = session
            .start(SessionConfig::new("Other", TransportMode::Taxi))
            .unwrap_err();
        assert_eq!(err, StartError::AlreadyActive);
        assert_eq!(session.status().config, Some(bus_config()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_first_tick_submits() {
        let transmitter = Arc::new(MockTransmitter::ok());
        let (session, _) = session_with(fix(8.4657, -13.2317), Arc::clone(&transmitter));

        session.start(bus_config()).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(transmitter.sent_count(), 1);
        assert_eq!(
            session.last_result(),
            Some(SubmissionResult::Sent {
                status: 200,
                body: "ok".to_string()
            })
        );

        let (sample, config) = &transmitter.sent()[0];
        assert_eq!(sample.latitude, 8.4657);
        assert_eq!(sample.longitude, -13.2317);
        assert_eq!(config.vehicle_id, "Poda001");
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_repeat_at_interval() {
        let transmitter = Arc::new(MockTransmitter::ok());
        let (session, _) = session_with(fix(1.0, 2.0), Arc::clone(&transmitter));

        session.start(bus_config()).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(transmitter.sent_count(), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(transmitter.sent_count(), 2);

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(transmitter.sent_count(), 5);
        assert_eq!(session.status().ticks, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_then_stop_before_first_tick_sends_nothing() {
        let transmitter = Arc::new(MockTransmitter::ok());
        let (session, _) = session_with(fix(1.0, 2.0), Arc::clone(&transmitter));

        session.start(bus_config()).unwrap();
        session.stop();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transmitter.sent_count(), 0);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.last_result(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_clears_config_and_is_idempotent() {
        let transmitter = Arc::new(MockTransmitter::ok());
        let (session, _) = session_with(fix(1.0, 2.0), transmitter);

        session.start(bus_config()).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        session.stop();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.status().config, None);

        // Second stop is a no-op.
        let status_before = session.status();
        session.stop();
        assert_eq!(session.status(), status_before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_fix_recorded_without_network_call() {
        let transmitter = Arc::new(MockTransmitter::ok());
        let (session, source) = session_with(LocationFix::NoFix, Arc::clone(&transmitter));

        session.start(bus_config()).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(session.last_result(), Some(SubmissionResult::NoFix));
        assert_eq!(transmitter.sent_count(), 0, "NoFix must not reach the network");
        assert!(source.calls() >= 1);
        assert_eq!(session.state(), SessionState::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_denied_keeps_session_active() {
        let transmitter = Arc::new(MockTransmitter::ok());
        let (session, _) = session_with(LocationFix::PermissionDenied, Arc::clone(&transmitter));

        session.start(bus_config()).unwrap();
        tokio::time::sleep(Duration::from_secs(11)).await;

        assert_eq!(
            session.last_result(),
            Some(SubmissionResult::PermissionDenied)
        );
        assert_eq!(transmitter.sent_count(), 0);
        assert_eq!(session.state(), SessionState::Active);
        // Still ticking: a later permission grant would take effect.
        assert!(session.status().ticks >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_recovers_on_next_tick() {
        let transmitter = Arc::new(MockTransmitter::new(SubmissionResult::Failed {
            reason: "connection refused".to_string(),
        }));
        let (session, _) = session_with(fix(1.0, 2.0), Arc::clone(&transmitter));

        session.start(bus_config()).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(matches!(
            session.last_result(),
            Some(SubmissionResult::Failed { .. })
        ));
        assert_eq!(session.state(), SessionState::Active);

        // Backend comes back; the next tick self-heals.
        transmitter.set_outcome(SubmissionResult::Sent {
            status: 200,
            body: "ok".to_string(),
        });
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(
            session.last_result(),
            Some(SubmissionResult::Sent {
                status: 200,
                body: "ok".to_string()
            })
        );
    }

    /// Transmitter that takes a while, to let `stop()` race a tick.
    struct SlowTransmitter {
        delay: Duration,
    }

    impl Transmitter for SlowTransmitter {
        fn send<'a>(
            &'a self,
            _sample: &'a LocationSample,
            _config: &'a SessionConfig,
        ) -> BoxFuture<'a, SubmissionResult> {
            Box::pin(async move {
                tokio::time::sleep(self.delay).await;
                SubmissionResult::Sent {
                    status: 200,
                    body: "late".to_string(),
                }
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_tick_result_discarded_after_stop() {
        let transmitter = Arc::new(SlowTransmitter {
            delay: Duration::from_secs(2),
        });
        let source = Arc::new(MockLocationSource::always(fix(1.0, 2.0)));
        let session = TrackingSession::new(source, transmitter);

        session.start(bus_config()).unwrap();
        // Let the first tick enter the transmitter, then stop mid-flight.
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.stop();
        assert_eq!(session.state(), SessionState::Idle);

        // The in-flight response eventually arrives and must be dropped.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(session.last_result(), None);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.status().ticks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_stop_runs_fresh_schedule() {
        let transmitter = Arc::new(MockTransmitter::ok());
        let (session, _) = session_with(fix(1.0, 2.0), Arc::clone(&transmitter));

        session.start(bus_config()).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.stop();

        let sent_before = transmitter.sent_count();
        session
            .start(SessionConfig::new("Poda002", TransportMode::Taxi))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(transmitter.sent_count(), sent_before + 1);
        let (_, config) = transmitter.sent().last().unwrap().clone();
        assert_eq!(config.vehicle_id, "Poda002");
        assert_eq!(session.status().ticks, 1, "Tick counter resets per session");
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_persists_preferences() {
        use crate::prefs::tests::MemoryPreferenceStore;

        let store = Arc::new(MemoryPreferenceStore::new());
        let transmitter = Arc::new(MockTransmitter::ok());
        let source = Arc::new(MockLocationSource::always(fix(1.0, 2.0)));
        let session = TrackingSession::new(source, transmitter)
            .with_preferences(Arc::clone(&store) as Arc<dyn PreferenceStore>);

        session.start(bus_config()).unwrap();
        let saved = store.load().unwrap().expect("preferences saved on start");
        assert_eq!(saved.vehicle_id, "Poda001");
        assert_eq!(saved.mode, TransportMode::Bus);

        // Stopping does not forget the driver.
        session.stop();
        assert!(store.load().unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_watch_publishes_changes() {
        let transmitter = Arc::new(MockTransmitter::ok());
        let (session, _) = session_with(fix(1.0, 2.0), transmitter);
        let mut rx = session.subscribe();

        assert_eq!(rx.borrow().state, SessionState::Idle);

        session.start(bus_config()).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().state, SessionState::Active);

        rx.changed().await.unwrap();
        let status = rx.borrow_and_update().clone();
        assert_eq!(status.ticks, 1);
        assert!(matches!(
            status.last_result,
            Some(SubmissionResult::Sent { status: 200, .. })
        ));
    }
}
