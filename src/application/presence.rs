use crate::domain::presence::{PresenceSimulator, SessionPresence};
use rand::Rng;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, trace};

pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(4);

/// The mounted presence badge: a simulator plus the timer that drives it.
///
/// Ticks run on a single spawned task, so they never overlap. The task is
/// aborted exactly once, by [`PresenceSession::dispose`] or on drop.
pub struct PresenceSession {
    snapshots: watch::Receiver<SessionPresence>,
    ticker: Option<JoinHandle<()>>,
}

impl PresenceSession {
    /// Starts ticking `simulator` every `period`. Must be called inside a tokio runtime.
    pub fn start<R>(mut simulator: PresenceSimulator<R>, period: Duration) -> Self
    where
        R: Rng + Send + 'static,
    {
        let period = period.max(Duration::from_millis(1));
        let (tx, snapshots) = watch::channel(simulator.snapshot());
        let ticker = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let online = simulator.tick();
                trace!(online, "Presence tick");
                if tx.send(simulator.snapshot()).is_err() {
                    break;
                }
            }
        });
        debug!(?period, "Presence timer started");
        Self {
            snapshots,
            ticker: Some(ticker),
        }
    }

    pub fn current(&self) -> SessionPresence {
        *self.snapshots.borrow()
    }

    /// A receiver notified after every tick.
    pub fn subscribe(&self) -> watch::Receiver<SessionPresence> {
        self.snapshots.clone()
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Stops the timer and tears the session down.
    pub fn dispose(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
            debug!("Presence timer stopped");
        }
    }
}

impl Drop for PresenceSession {
    fn drop(&mut self) {
        self.cancel();
    }
}
