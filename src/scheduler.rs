//! Rotation scheduler
//!
//! One task per mounted screen drives its [`Rotation`]: a fine progress tick,
//! a fade deadline and a switch deadline, all restarted whenever the wake
//! channel is bumped (list replaced, manual navigation, pause toggled).

use std::future::pending;
use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::rotation::{Advance, Rotation};
use crate::screen::RotationStyle;

pub type SharedRotation = Arc<RwLock<Rotation>>;

/// Bump a wake channel so the scheduler restarts its dwell
pub fn wake(sender: &watch::Sender<u64>) {
    sender.send_modify(|generation| *generation = generation.wrapping_add(1));
}

/// Spawn the rotation task for one screen
///
/// `on_wrap` is called when a refresh-on-wrap screen reaches the end of its
/// list; the task then idles until the wake channel is bumped.
pub fn spawn<F>(
    rotation: SharedRotation,
    style: RotationStyle,
    wake: watch::Receiver<u64>,
    cancel: CancellationToken,
    on_wrap: F,
) -> JoinHandle<()>
where
    F: Fn() + Send + 'static,
{
    tokio::spawn(async move {
        run(rotation, style, wake, cancel, on_wrap).await;
        tracing::debug!("Rotation task stopped");
    })
}

async fn next_tick(progress: &mut Option<Interval>) {
    match progress {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending::<()>().await,
    }
}

async fn run<F: Fn()>(
    rotation: SharedRotation,
    style: RotationStyle,
    mut wake: watch::Receiver<u64>,
    cancel: CancellationToken,
    on_wrap: F,
) {
    let Some(dwell) = style.dwell() else {
        // Static screens show the whole list; nothing to rotate
        cancel.cancelled().await;
        return;
    };

    let (fade, tick) = match style {
        RotationStyle::Paced { fade, tick, .. } => (Some(fade.min(dwell)), Some(tick)),
        _ => (None, None),
    };
    let step = style.progress_step();

    loop {
        let active = {
            let rotation = rotation.read().await;
            !rotation.is_empty() && !rotation.is_paused() && !rotation.wrap_pending()
        };

        if !active {
            tokio::select! {
                _ = cancel.cancelled() => return,
                changed = wake.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
            continue;
        }

        let started = Instant::now();
        let switch_at = started + dwell;
        let fade_at = fade.map(|fade| switch_at - fade);
        let mut faded = fade_at.is_none();
        let mut progress = tick.map(|tick| {
            let mut interval = time::interval_at(started + tick, tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                changed = wake.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    break;
                }
                _ = time::sleep_until(switch_at) => {
                    let outcome = rotation.write().await.advance();
                    match outcome {
                        Advance::Moved(index) => tracing::trace!("Advanced to item {}", index),
                        Advance::WrapDeferred => {
                            tracing::info!("End of list reached, refreshing before wrap");
                            on_wrap();
                        }
                        Advance::Idle => {}
                    }
                    break;
                }
                _ = time::sleep_until(fade_at.unwrap_or(switch_at)), if !faded => {
                    rotation.write().await.enter_fade();
                    faded = true;
                }
                _ = next_tick(&mut progress) => {
                    rotation.write().await.tick_progress(step);
                }
            }
        }
    }
}
