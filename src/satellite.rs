//! GOES satellite image feed
//!
//! The server may answer with a bare base64 body, a JSON string, or a JSON
//! object wrapping the image under `image` or `data`. All forms decode into
//! one `data:` URL item.

use serde::Deserialize;

use crate::datasource::{Feed, FeedSnapshot};
use crate::error::FetchError;
use crate::fetch::{Expect, FetchRequest, RawPayload};
use crate::item::{Item, ItemList};
use crate::screen::ScreenKind;

const GOES_PATH: &str = "/goes-image";
const GOES_ITEM_ID: &str = "goes-full-disk";
const DATA_URL_PREFIX: &str = "data:image/";

/// Accepted response shapes, tried in order
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImagePayload {
    Image { image: String },
    Data { data: String },
    Bare(String),
}

impl ImagePayload {
    /// Decode a text body; anything that is not a JSON object or string is raw base64
    fn from_body(body: &str) -> Result<Self, FetchError> {
        match serde_json::from_str::<serde_json::Value>(body) {
            Ok(value @ (serde_json::Value::Object(_) | serde_json::Value::String(_))) => {
                Ok(serde_json::from_value(value)?)
            }
            _ => Ok(ImagePayload::Bare(body.to_string())),
        }
    }

    fn into_inner(self) -> String {
        match self {
            ImagePayload::Image { image } => image,
            ImagePayload::Data { data } => data,
            ImagePayload::Bare(raw) => raw,
        }
    }
}

/// Normalize base64 image text into a `data:` URL
pub fn to_data_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with(DATA_URL_PREFIX) {
        trimmed.to_string()
    } else {
        format!("data:image/png;base64,{}", trimmed)
    }
}

/// Single satellite image
pub struct SatelliteFeed;

impl SatelliteFeed {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SatelliteFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl Feed for SatelliteFeed {
    fn kind(&self) -> ScreenKind {
        ScreenKind::Earth
    }

    fn request(&self) -> FetchRequest {
        FetchRequest::get(GOES_PATH).expecting(Expect::Text)
    }

    fn decode(&self, payload: RawPayload) -> Result<FeedSnapshot, FetchError> {
        let image = match payload {
            RawPayload::Text(body) => ImagePayload::from_body(&body)?,
            RawPayload::Json(value) => serde_json::from_value(value)?,
        }
        .into_inner();

        if image.trim().is_empty() {
            return Err(FetchError::EmptyResult(
                "No satellite image received".to_string(),
            ));
        }

        let item = Item::new(GOES_ITEM_ID, to_data_url(&image));
        Ok(ItemList::new(vec![item]).into())
    }
}
