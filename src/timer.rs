//! Repeating refresh trigger
//!
//! Fires once immediately, then every period, until stopped or cancelled.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Handle to a running refresh timer
pub struct RefreshTimer {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl RefreshTimer {
    /// Spawn a timer that awaits `on_tick` on every tick
    ///
    /// A slow tick delays the following one instead of piling up behind it.
    /// Cancelling `cancel` (or any parent of it) stops the timer.
    pub fn start<F, Fut>(period: Duration, cancel: CancellationToken, mut on_tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        tokio::select! {
                            _ = token.cancelled() => break,
                            _ = on_tick() => {}
                        }
                    }
                }
            }

            tracing::debug!("Refresh timer stopped");
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Stop the timer; safe to call more than once
    pub fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
