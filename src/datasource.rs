//! Feed trait and registry
//!
//! A feed knows how to ask the content server for one screen's data and how
//! to turn the response into an item list.

use std::collections::HashMap;
use std::sync::Arc;

use crate::aircraft::AircraftFeed;
use crate::config::Config;
use crate::error::FetchError;
use crate::fetch::{FetchRequest, RawPayload};
use crate::heatmap::HeatmapFeed;
use crate::item::ItemList;
use crate::news::NewsFeed;
use crate::pictures::PictureFeed;
use crate::satellite::SatelliteFeed;
use crate::screen::ScreenKind;
use crate::weather::{MapOverlay, WeatherFeed};

/// Decoded result of one successful fetch
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedSnapshot {
    pub items: ItemList,
    /// Map placement for overlay-style screens
    pub overlay: Option<MapOverlay>,
}

impl From<ItemList> for FeedSnapshot {
    fn from(items: ItemList) -> Self {
        Self {
            items,
            overlay: None,
        }
    }
}

/// A per-screen data feed
pub trait Feed: Send + Sync {
    /// Screen this feed serves
    fn kind(&self) -> ScreenKind;

    /// Request for the current list (caller filters are merged afterwards)
    fn request(&self) -> FetchRequest;

    /// Decode a response body into items
    fn decode(&self, payload: RawPayload) -> Result<FeedSnapshot, FetchError>;
}

/// Registry of available feeds
pub struct FeedRegistry {
    feeds: HashMap<ScreenKind, Arc<dyn Feed>>,
}

impl FeedRegistry {
    pub fn new(config: &Config) -> Self {
        let feeds: Vec<Arc<dyn Feed>> = vec![
            Arc::new(WeatherFeed::new()),
            Arc::new(HeatmapFeed::new(config)),
            Arc::new(AircraftFeed::new(config)),
            Arc::new(SatelliteFeed::new()),
            Arc::new(NewsFeed::new()),
            Arc::new(PictureFeed::new(config)),
        ];

        Self {
            feeds: feeds.into_iter().map(|f| (f.kind(), f)).collect(),
        }
    }

    pub fn get(&self, kind: ScreenKind) -> Option<Arc<dyn Feed>> {
        self.feeds.get(&kind).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_every_known_screen() {
        let registry = FeedRegistry::new(&Config::default());
        for kind in [
            ScreenKind::Weather,
            ScreenKind::Flights,
            ScreenKind::Radar,
            ScreenKind::Earth,
            ScreenKind::News,
            ScreenKind::Pictures,
        ] {
            assert_eq!(registry.get(kind).map(|f| f.kind()), Some(kind));
        }
        assert!(registry.get(ScreenKind::Unknown).is_none());
    }
}
