//! Periodic tick scheduling.
//!
//! The [`Scheduler`] runs a callback once immediately, then at a fixed
//! period, until disarmed. The callback is awaited to completion before the
//! next period elapses, so ticks never overlap: a tick that runs long
//! delays the schedule (skip-if-busy) rather than stacking callbacks.
//! [`MissedTickBehavior::Delay`] re-aligns the cadence after a slow tick.
//!
//! Disarming prevents any future tick from starting but does not interrupt
//! a tick that is already executing. Re-arming is done by constructing a
//! fresh scheduler; each instance owns its own task and cancellation token,
//! so no residual callback from a prior schedule can fire.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Drives a tick callback on a fixed period.
///
/// Must be armed from within a tokio runtime. The scheduler disarms itself
/// on drop.
pub struct Scheduler {
    cancel: CancellationToken,
    #[allow(dead_code)]
    handle: JoinHandle<()>,
}

impl Scheduler {
    /// Arm a schedule: one immediate tick, then one tick per `period`.
    pub fn arm<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;

                    _ = token.cancelled() => {
                        trace!("Scheduler disarmed");
                        break;
                    }

                    _ = interval.tick() => {
                        tick().await;
                    }
                }
            }
        });

        Self { cancel, handle }
    }

    /// Prevent any future tick from starting.
    ///
    /// A tick currently executing runs to completion; its effects are the
    /// caller's responsibility to suppress.
    pub fn disarm(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
