//! Device-level screen assignment
//!
//! Polls the content server for the screen this device should show and keeps
//! exactly one [`ScreenRuntime`] mounted for it.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::datasource::FeedRegistry;
use crate::error::FetchError;
use crate::fetch::{FetchGate, FetchRequest, Transport};
use crate::runtime::{ScreenContext, ScreenRuntime};
use crate::screen::{ScreenAssignment, ScreenKind, Theme};

/// How often the assignment is re-read
pub const ASSIGNMENT_INTERVAL: Duration = Duration::from_secs(60);

/// Request for this device's assignment
pub fn assignment_request(device_id: &str) -> FetchRequest {
    FetchRequest::post("/", json!({ "ipad": device_id }))
}

pub struct Kiosk {
    config: Config,
    gate: FetchGate,
    registry: FeedRegistry,
    screen: Option<ScreenRuntime>,
    theme: watch::Sender<Theme>,
}

impl Kiosk {
    pub fn new(config: Config, transport: Arc<dyn Transport>) -> Self {
        let registry = FeedRegistry::new(&config);
        let (theme, _) = watch::channel(Theme::default());

        Self {
            config,
            gate: FetchGate::new(transport),
            registry,
            screen: None,
            theme,
        }
    }

    /// Currently mounted screen, if the assignment names a known one
    pub fn screen(&self) -> Option<&ScreenRuntime> {
        self.screen.as_ref()
    }

    pub fn theme(&self) -> watch::Receiver<Theme> {
        self.theme.subscribe()
    }

    /// Fetch the assignment once and apply it
    pub async fn poll_assignment(&mut self) -> Result<ScreenAssignment, FetchError> {
        let request = assignment_request(&self.config.device_id);
        let payload = self.gate.transport().send(&request).await?;
        let assignment: ScreenAssignment = serde_json::from_value(payload.into_json()?)?;

        self.apply(assignment).await;
        Ok(assignment)
    }

    /// Remount only when the screen changes; theme changes are just published
    pub async fn apply(&mut self, assignment: ScreenAssignment) {
        self.theme.send_if_modified(|theme| {
            let changed = *theme != assignment.theme;
            *theme = assignment.theme;
            changed
        });

        let current = self.screen.as_ref().map(|screen| screen.kind());
        if current == Some(assignment.screen) {
            return;
        }

        if let Some(old) = self.screen.take() {
            old.unmount().await;
        }

        if assignment.screen == ScreenKind::Unknown {
            tracing::warn!("Assigned screen is not supported by this client");
            return;
        }

        match self.registry.get(assignment.screen) {
            Some(feed) => {
                let ctx = ScreenContext::new(feed, self.gate.clone(), self.config.zone_or_utc());
                self.screen = Some(ScreenRuntime::mount(ctx));
            }
            None => tracing::warn!("No feed registered for {} screen", assignment.screen),
        }
    }

    /// Poll the assignment every minute until `shutdown` fires
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut ticker = time::interval(ASSIGNMENT_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let polled = tokio::select! {
                        _ = shutdown.cancelled() => break,
                        polled = self.poll_assignment() => polled,
                    };
                    match polled {
                        Ok(assignment) => tracing::debug!(
                            "Assignment: {} ({:?})",
                            assignment.screen,
                            assignment.theme
                        ),
                        Err(e) => tracing::warn!("Failed to fetch screen assignment: {}", e),
                    }
                }
            }
        }

        if let Some(screen) = self.screen.take() {
            screen.unmount().await;
        }
        tracing::info!("Kiosk stopped");
    }
}
