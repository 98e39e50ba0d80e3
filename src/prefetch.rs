//! Prefetch cache for item media
//!
//! Every item of the current list is loaded and decoded ahead of display so
//! advancing the cursor never waits on the network. The cache is rebuilt
//! wholesale whenever the list changes; loads belonging to an older list are
//! aborted and their late results dropped.

use async_trait::async_trait;
use base64::Engine;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;

use crate::error::FetchError;
use crate::fetch::Transport;
use crate::item::ItemList;

/// A decoded, ready-to-display image
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub url: String,
    pub image: image::DynamicImage,
}

impl PreparedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Load state of one item's media
#[derive(Debug, Clone)]
pub enum Slot {
    Loading,
    Ready(Arc<PreparedImage>),
    /// Load failed; the item shows blank until the next rebuild
    Failed,
}

impl Slot {
    pub fn is_ready(&self) -> bool {
        matches!(self, Slot::Ready(_))
    }
}

/// Turns an item URL into a decoded image
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<PreparedImage, FetchError>;
}

/// Loader that downloads over the transport, or decodes `data:` URLs inline
pub struct HttpImageLoader {
    transport: Arc<dyn Transport>,
}

impl HttpImageLoader {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

/// Decode the payload of a base64 `data:` URL
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, FetchError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| FetchError::Payload("not a data URL".to_string()))?;
    let (header, data) = rest
        .split_once(',')
        .ok_or_else(|| FetchError::Payload("data URL has no payload".to_string()))?;

    if !header.ends_with(";base64") {
        return Err(FetchError::Payload(format!(
            "unsupported data URL encoding: {}",
            header
        )));
    }

    base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| FetchError::Payload(e.to_string()))
}

#[async_trait]
impl ImageLoader for HttpImageLoader {
    async fn load(&self, url: &str) -> Result<PreparedImage, FetchError> {
        let bytes = if url.starts_with("data:") {
            decode_data_url(url)?
        } else {
            self.transport.get_bytes(url).await?
        };

        let image = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| FetchError::Payload(format!("decode task failed: {}", e)))?
            .map_err(|e| FetchError::Payload(e.to_string()))?;

        Ok(PreparedImage {
            url: url.to_string(),
            image,
        })
    }
}

#[derive(Default)]
struct Slots {
    generation: u64,
    entries: HashMap<String, Slot>,
}

/// Warmed media for one screen's current list
pub struct PrefetchCache {
    loader: Arc<dyn ImageLoader>,
    slots: Arc<RwLock<Slots>>,
    tasks: Mutex<JoinSet<()>>,
}

impl PrefetchCache {
    pub fn new(loader: Arc<dyn ImageLoader>) -> Self {
        Self {
            loader,
            slots: Arc::new(RwLock::new(Slots::default())),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Replace every handle with loads for `items`
    ///
    /// All loads start at once. Items without a URL get no slot.
    pub async fn rebuild(&self, items: &ItemList) {
        let mut tasks = self.tasks.lock().await;
        // Dropping the old set aborts its loads
        *tasks = JoinSet::new();

        let generation = {
            let mut slots = self.slots.write().await;
            slots.generation += 1;
            slots.entries = items
                .iter()
                .filter(|item| !item.source_url.is_empty())
                .map(|item| (item.id.clone(), Slot::Loading))
                .collect();
            slots.generation
        };

        for item in items.iter().filter(|item| !item.source_url.is_empty()) {
            let loader = self.loader.clone();
            let slots = self.slots.clone();
            let id = item.id.clone();
            let url = item.source_url.clone();

            tasks.spawn(async move {
                let result = loader.load(&url).await;

                let mut slots = slots.write().await;
                if slots.generation != generation {
                    return;
                }

                let slot = match result {
                    Ok(image) => {
                        tracing::debug!("Prefetched {} ({}x{})", id, image.width(), image.height());
                        Slot::Ready(Arc::new(image))
                    }
                    Err(e) => {
                        tracing::warn!("Prefetch failed for {}: {}", id, e);
                        Slot::Failed
                    }
                };
                slots.entries.insert(id, slot);
            });
        }

        tracing::debug!("Prefetching {} items (generation {})", items.len(), generation);
    }

    /// Get an item's slot if it belongs to the current list
    pub async fn get(&self, id: &str) -> Option<Slot> {
        self.slots.read().await.entries.get(id).cloned()
    }

    /// Get an item's decoded image if it has finished loading
    pub async fn ready(&self, id: &str) -> Option<Arc<PreparedImage>> {
        match self.get(id).await {
            Some(Slot::Ready(image)) => Some(image),
            _ => None,
        }
    }

    /// Number of slots whose load has finished successfully
    pub async fn ready_count(&self) -> usize {
        self.slots
            .read()
            .await
            .entries
            .values()
            .filter(|slot| slot.is_ready())
            .count()
    }

    /// Abort all loads and drop every handle
    pub async fn clear(&self) {
        *self.tasks.lock().await = JoinSet::new();
        let mut slots = self.slots.write().await;
        slots.generation += 1;
        slots.entries.clear();
    }
}
