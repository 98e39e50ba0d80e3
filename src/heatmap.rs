//! Flight-density heatmap feed

use serde::Deserialize;

use crate::config::Config;
use crate::datasource::{Feed, FeedSnapshot};
use crate::error::FetchError;
use crate::fetch::{FetchRequest, RawPayload};
use crate::item::{Item, ItemList};
use crate::screen::ScreenKind;

const FLIGHTS_PATH: &str = "/flights";

/// One `[url, time]` pair as listed by the server
#[derive(Debug, Deserialize)]
struct HeatmapEntry(#[allow(dead_code)] serde_json::Value, i64);

/// Accumulated heatmap frames
///
/// Frames are always loaded from the server's accumulated-heatmap route,
/// keyed by their timestamp.
pub struct HeatmapFeed {
    server_url: String,
}

impl HeatmapFeed {
    pub fn new(config: &Config) -> Self {
        Self {
            server_url: config.server_url.clone(),
        }
    }

    fn frame_url(&self, time: i64) -> String {
        format!("{}/heatmap/accum/{}.png", self.server_url, time)
    }
}

impl Feed for HeatmapFeed {
    fn kind(&self) -> ScreenKind {
        ScreenKind::Flights
    }

    fn request(&self) -> FetchRequest {
        FetchRequest::get(FLIGHTS_PATH)
    }

    fn decode(&self, payload: RawPayload) -> Result<FeedSnapshot, FetchError> {
        let entries: Vec<serde_json::Value> = serde_json::from_value(payload.into_json()?)?;
        let total = entries.len();

        let items: Vec<Item> = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<HeatmapEntry>(entry) {
                Ok(HeatmapEntry(_, time)) => {
                    Some(Item::new(time.to_string(), self.frame_url(time)).with_timestamp(time))
                }
                Err(e) => {
                    tracing::warn!("Skipping malformed heatmap entry: {}", e);
                    None
                }
            })
            .collect();

        tracing::debug!("{} of {} heatmap frames usable", items.len(), total);

        Ok(ItemList::new(items).into())
    }
}
