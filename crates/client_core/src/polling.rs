//! Fixed-interval refresh scheduler.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, info};

/// Running poller. Stopping is idempotent and dropping the handle stops it.
#[derive(Debug)]
pub struct PollHandle {
    cancel: watch::Sender<bool>,
    ticker: JoinHandle<()>,
}

impl PollHandle {
    pub fn stop(&self) {
        if !self.cancel.send_replace(true) {
            info!("users poller stopped");
        }
        self.ticker.abort();
    }

    pub fn is_stopped(&self) -> bool {
        *self.cancel.borrow()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Fires `refresh` right away and then once per `interval`.
///
/// Each refresh runs as its own task, so a slow refresh does not delay the
/// next tick and refreshes may overlap. Refreshes already running when the
/// poller stops are left to finish.
pub fn start<F, Fut>(refresh: F, interval: Duration) -> PollHandle
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (cancel, mut cancelled) = watch::channel(false);
    let refresh = Arc::new(refresh);
    info!(interval_ms = interval.as_millis() as u64, "users poller started");

    let ticker = tokio::spawn(async move {
        let mut ticks = time::interval(interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = cancelled.changed() => break,
                _ = ticks.tick() => {
                    if *cancelled.borrow() {
                        break;
                    }
                    debug!("users poller tick");
                    let refresh = Arc::clone(&refresh);
                    let gate = cancelled.clone();
                    tokio::spawn(async move {
                        // A tick that raced with stop() must not fire.
                        let stopped = *gate.borrow();
                        if !stopped {
                            refresh().await;
                        }
                    });
                }
            }
        }
    });

    PollHandle { cancel, ticker }
}

#[cfg(test)]
#[path = "tests/polling_tests.rs"]
mod tests;
