//! Mounted screen runtime
//!
//! A [`ScreenRuntime`] owns everything one displayed screen needs: its item
//! list and cursor, fetch status, refresh timer, rotation task, prefetch cache
//! and upload state. All of it is created on mount and torn down together on
//! unmount; results that arrive after teardown are dropped.

use chrono::{DateTime, FixedOffset, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, RwLock};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::datasource::Feed;
use crate::error::FetchError;
use crate::fetch::{FetchGate, FetchStatus, ScreenParams};
use crate::item::{Item, ItemList, ItemMeta};
use crate::mutation::{Feedback, UploadJob};
use crate::prefetch::{HttpImageLoader, ImageLoader, PrefetchCache, PreparedImage};
use crate::rotation::{Phase, Rotation};
use crate::scheduler::{self, SharedRotation};
use crate::screen::{ScreenKind, ScreenProfile};
use crate::text;
use crate::timer::RefreshTimer;
use crate::weather::MapOverlay;

/// Everything needed to mount one screen
pub struct ScreenContext {
    pub feed: Arc<dyn Feed>,
    pub profile: ScreenProfile,
    pub gate: FetchGate,
    pub loader: Arc<dyn ImageLoader>,
    /// Caller filters forwarded verbatim with every fetch
    pub params: ScreenParams,
    pub zone: FixedOffset,
}

impl ScreenContext {
    pub fn new(feed: Arc<dyn Feed>, gate: FetchGate, zone: FixedOffset) -> Self {
        let loader = Arc::new(HttpImageLoader::new(gate.transport().clone()));
        Self {
            profile: ScreenProfile::for_kind(feed.kind()),
            feed,
            gate,
            loader,
            params: ScreenParams::default(),
            zone,
        }
    }

    pub fn with_params(mut self, params: ScreenParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_loader(mut self, loader: Arc<dyn ImageLoader>) -> Self {
        self.loader = loader;
        self
    }
}

/// What happened to one fetch
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// New list installed
    Applied { items: usize },
    /// Fetch failed; the previous list stays
    Failed(FetchError),
    /// A newer fetch already landed
    Stale,
    /// Screen was unmounted while the fetch was in flight
    Cancelled,
}

#[derive(Default)]
pub(crate) struct ScreenState {
    pub(crate) status: FetchStatus,
    pub(crate) last_error: Option<String>,
    applied_seq: u64,
    overlay: Option<MapOverlay>,
    last_update: Option<DateTime<Utc>>,
    pub(crate) feedback: Option<Feedback>,
}

pub(crate) struct Shared {
    pub(crate) kind: ScreenKind,
    pub(crate) profile: ScreenProfile,
    feed: Arc<dyn Feed>,
    pub(crate) gate: FetchGate,
    params: ScreenParams,
    pub(crate) zone: FixedOffset,
    // Lock order: `state` before `rotation`
    pub(crate) state: RwLock<ScreenState>,
    pub(crate) rotation: SharedRotation,
    wake: watch::Sender<u64>,
    prefetch: Option<PrefetchCache>,
    pub(crate) cancel: CancellationToken,
    next_seq: AtomicU64,
    background: Mutex<JoinSet<()>>,
    pub(crate) uploads: watch::Sender<Option<Vec<UploadJob>>>,
    pub(crate) upload_lock: tokio::sync::Mutex<()>,
}

impl Shared {
    /// One fetch, applied only if it is still the newest and the screen is live
    pub(crate) async fn refresh(&self) -> RefreshOutcome {
        if self.cancel.is_cancelled() {
            return RefreshOutcome::Cancelled;
        }

        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.write().await.status = FetchStatus::Loading;

        let result = tokio::select! {
            _ = self.cancel.cancelled() => return RefreshOutcome::Cancelled,
            result = self.gate.fetch(self.feed.as_ref(), &self.params) => result,
        };

        let mut state = self.state.write().await;
        if self.cancel.is_cancelled() {
            return RefreshOutcome::Cancelled;
        }
        if seq < state.applied_seq {
            tracing::debug!("{} screen: dropping stale fetch #{}", self.kind, seq);
            return RefreshOutcome::Stale;
        }
        state.applied_seq = seq;

        match result {
            Ok(snapshot) => {
                let count = snapshot.items.len();
                let warm = self.prefetch.as_ref().map(|_| snapshot.items.clone());

                self.rotation.write().await.replace_list(snapshot.items);
                state.status = FetchStatus::Ready;
                state.last_error = None;
                state.last_update = Some(Utc::now());
                if snapshot.overlay.is_some() {
                    state.overlay = snapshot.overlay;
                }
                // Still under the state lock so rebuilds land in apply order
                if let (Some(prefetch), Some(items)) = (&self.prefetch, warm) {
                    prefetch.rebuild(&items).await;
                }
                drop(state);
                scheduler::wake(&self.wake);

                tracing::info!("{} screen refreshed: {} items", self.kind, count);
                RefreshOutcome::Applied { items: count }
            }
            Err(e) => {
                tracing::warn!("{} screen fetch failed: {}", self.kind, e);
                state.status = FetchStatus::Error(e.to_string());
                state.last_error = Some(e.to_string());

                // A refresh-on-wrap that failed still wraps over the old list
                let wrapped = self.rotation.write().await.complete_wrap();
                drop(state);
                if wrapped {
                    scheduler::wake(&self.wake);
                }

                RefreshOutcome::Failed(e)
            }
        }
    }

    /// Start a refresh in the background, owned by this screen
    pub(crate) fn spawn_refresh(self: &Arc<Self>) {
        if self.cancel.is_cancelled() {
            return;
        }

        let shared = self.clone();
        match self.background.lock() {
            Ok(mut tasks) => {
                while tasks.try_join_next().is_some() {}
                tasks.spawn(async move {
                    shared.refresh().await;
                });
            }
            Err(e) => tracing::error!("{} screen: background task set poisoned: {}", self.kind, e),
        }
    }

    pub(crate) fn restart_dwell(&self) {
        scheduler::wake(&self.wake);
    }

    pub(crate) async fn set_feedback(&self, feedback: Feedback) {
        if !self.cancel.is_cancelled() {
            self.state.write().await.feedback = Some(feedback);
        }
    }
}

/// Read-only snapshot of a screen for rendering
#[derive(Debug, Clone)]
pub struct ScreenView {
    pub kind: ScreenKind,
    /// Whole list (static screens render all of it)
    pub items: ItemList,
    pub current: Option<Item>,
    pub index: usize,
    /// `i of n`, when there is anything to show
    pub position: Option<String>,
    pub progress: f32,
    pub phase: Phase,
    /// False while fading or when the item is flagged hidden
    pub visible: bool,
    pub paused: bool,
    /// Current item's time in the display zone
    pub timestamp: Option<String>,
    pub status: FetchStatus,
    pub last_error: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
    pub overlay: Option<MapOverlay>,
    pub feedback: Option<Feedback>,
    pub uploads: Option<Vec<UploadJob>>,
    /// Prefetched media for the current item, if warmed
    pub image: Option<Arc<PreparedImage>>,
    /// No content at all: show the full-screen loading/error state
    pub full_screen: bool,
}

/// A mounted screen
pub struct ScreenRuntime {
    pub(crate) shared: Arc<Shared>,
    timer: RefreshTimer,
    rotation_task: JoinHandle<()>,
}

impl ScreenRuntime {
    /// Mount a screen: fetch immediately, then on the profile's interval
    pub fn mount(ctx: ScreenContext) -> Self {
        let ScreenContext {
            feed,
            profile,
            gate,
            loader,
            params,
            zone,
        } = ctx;

        let kind = feed.kind();
        let cancel = CancellationToken::new();
        let (wake, wake_rx) = watch::channel(0);
        let (uploads, _) = watch::channel(None);
        let rotation: SharedRotation =
            Arc::new(RwLock::new(Rotation::new(profile.reanchor, profile.wrap)));

        let shared = Arc::new(Shared {
            kind,
            profile: profile.clone(),
            feed,
            gate,
            params,
            zone,
            state: RwLock::new(ScreenState::default()),
            rotation: rotation.clone(),
            wake,
            prefetch: profile.prefetch.then(|| PrefetchCache::new(loader)),
            cancel: cancel.clone(),
            next_seq: AtomicU64::new(0),
            background: Mutex::new(JoinSet::new()),
            uploads,
            upload_lock: tokio::sync::Mutex::new(()),
        });

        let weak = Arc::downgrade(&shared);
        let rotation_task = scheduler::spawn(
            rotation,
            profile.rotation,
            wake_rx,
            cancel.child_token(),
            move || {
                if let Some(shared) = weak.upgrade() {
                    shared.spawn_refresh();
                }
            },
        );

        let ticking = shared.clone();
        let timer = RefreshTimer::start(profile.refresh_interval, cancel.child_token(), move || {
            let shared = ticking.clone();
            async move {
                shared.refresh().await;
            }
        });

        tracing::info!(
            "Mounted {} screen (refresh every {:?})",
            kind,
            profile.refresh_interval
        );

        Self {
            shared,
            timer,
            rotation_task,
        }
    }

    pub fn kind(&self) -> ScreenKind {
        self.shared.kind
    }

    pub fn profile(&self) -> &ScreenProfile {
        &self.shared.profile
    }

    pub fn is_mounted(&self) -> bool {
        !self.shared.cancel.is_cancelled()
    }

    /// Fetch now, outside the timer (manual retry)
    pub async fn refresh_now(&self) -> RefreshOutcome {
        self.shared.refresh().await
    }

    /// Step forward one item and restart the dwell
    pub async fn next(&self) -> Option<usize> {
        self.navigate(1).await
    }

    /// Step back one item and restart the dwell
    pub async fn previous(&self) -> Option<usize> {
        self.navigate(-1).await
    }

    async fn navigate(&self, delta: isize) -> Option<usize> {
        let index = self.shared.rotation.write().await.step(delta)?;
        self.shared.restart_dwell();
        Some(index)
    }

    /// Pause or resume rotation; resuming restarts the dwell from zero
    pub async fn set_paused(&self, paused: bool) {
        self.shared.rotation.write().await.set_paused(paused);
        self.shared.restart_dwell();
        tracing::debug!("{} screen paused: {}", self.shared.kind, paused);
    }

    /// Live upload batch progress
    pub fn uploads(&self) -> watch::Receiver<Option<Vec<UploadJob>>> {
        self.shared.uploads.subscribe()
    }

    pub async fn view(&self) -> ScreenView {
        let shared = &self.shared;
        let state = shared.state.read().await;
        let rotation = shared.rotation.read().await;

        let current = rotation.current().cloned();
        let len = rotation.list().len();
        let timestamp = current.as_ref().and_then(|item| match &item.meta {
            ItemMeta::Headline(headline) => Some(headline.formatted_date(shared.zone)),
            _ => item
                .display_timestamp
                .and_then(|ts| text::format_timestamp(ts, shared.zone)),
        });
        let feedback = state
            .feedback
            .as_ref()
            .filter(|feedback| !feedback.is_expired())
            .cloned();

        let image = match (&shared.prefetch, &current) {
            (Some(prefetch), Some(item)) => prefetch.ready(&item.id).await,
            _ => None,
        };

        ScreenView {
            kind: shared.kind,
            items: rotation.list().clone(),
            index: rotation.index(),
            position: (len > 0).then(|| text::format_position(rotation.index(), len)),
            progress: rotation.progress(),
            phase: rotation.phase(),
            visible: rotation.phase() == Phase::Showing
                && current.as_ref().is_some_and(|item| item.visible),
            paused: rotation.is_paused(),
            timestamp,
            status: state.status.clone(),
            last_error: state.last_error.clone(),
            last_update: state.last_update,
            overlay: state.overlay,
            feedback,
            uploads: shared.uploads.borrow().clone(),
            image,
            full_screen: len == 0,
            current,
        }
    }

    fn teardown(&mut self) {
        self.shared.cancel.cancel();
        self.timer.stop();
        self.rotation_task.abort();
        if let Ok(mut tasks) = self.shared.background.lock() {
            tasks.abort_all();
        }
    }

    /// Tear the screen down: stop every timer and task it owns
    pub async fn unmount(mut self) {
        self.teardown();
        if let Some(prefetch) = &self.shared.prefetch {
            prefetch.clear().await;
        }
        tracing::info!("Unmounted {} screen", self.shared.kind);
    }
}

impl Drop for ScreenRuntime {
    fn drop(&mut self) {
        self.teardown();
    }
}
