//! Weather radar feed
//!
//! The server proxies RainViewer and returns past radar frames already
//! projected for the kiosk's map, plus the overlay placement.

use serde::Deserialize;

use crate::datasource::{Feed, FeedSnapshot};
use crate::error::FetchError;
use crate::fetch::{FetchRequest, RawPayload};
use crate::item::{Item, ItemList};
use crate::screen::ScreenKind;

const WEATHER_PATH: &str = "/weather";

/// Where an image overlay sits on the external map
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MapOverlay {
    /// North-west corner (lat, lon)
    pub top_left: (f64, f64),
    /// South-east corner (lat, lon)
    pub bottom_right: (f64, f64),
    pub center: (f64, f64),
    pub zoom: u8,
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    radar: RadarFrames,
    bounds: Option<Bounds>,
    coords: Option<Coords>,
}

#[derive(Debug, Deserialize)]
struct RadarFrames {
    past: Vec<RadarFrame>,
}

#[derive(Debug, Deserialize)]
struct RadarFrame {
    time: i64,
    url: String,
}

#[derive(Debug, Deserialize)]
struct Bounds {
    top_left: (f64, f64),
    bottom_right: (f64, f64),
}

#[derive(Debug, Deserialize)]
struct Coords {
    lat: f64,
    lon: f64,
    zoom: u8,
}

/// Weather radar frames, one item per past frame
pub struct WeatherFeed;

impl WeatherFeed {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WeatherFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl Feed for WeatherFeed {
    fn kind(&self) -> ScreenKind {
        ScreenKind::Weather
    }

    fn request(&self) -> FetchRequest {
        FetchRequest::get(WEATHER_PATH)
    }

    fn decode(&self, payload: RawPayload) -> Result<FeedSnapshot, FetchError> {
        let response: WeatherResponse = serde_json::from_value(payload.into_json()?)?;

        let items = response
            .radar
            .past
            .into_iter()
            .map(|frame| Item::new(frame.time.to_string(), frame.url).with_timestamp(frame.time))
            .collect();

        let overlay = match (response.bounds, response.coords) {
            (Some(bounds), Some(coords)) => Some(MapOverlay {
                top_left: bounds.top_left,
                bottom_right: bounds.bottom_right,
                center: (coords.lat, coords.lon),
                zoom: coords.zoom,
            }),
            _ => None,
        };

        tracing::debug!("Decoded weather payload: overlay={:?}", overlay);

        Ok(FeedSnapshot {
            items: ItemList::new(items),
            overlay,
        })
    }
}
