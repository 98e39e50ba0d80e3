//! Photo slideshow feed and picture action endpoints
//!
//! Every picture endpoint answers `{success: bool, ...}`. A 2xx response with
//! `success: false` is a failure.

use serde::Deserialize;
use serde_json::json;

use crate::config::Config;
use crate::datasource::{Feed, FeedSnapshot};
use crate::error::FetchError;
use crate::fetch::{FetchRequest, RawPayload};
use crate::item::{Item, ItemList, ItemMeta};
use crate::screen::ScreenKind;

const LIST_PATH: &str = "/pictures/get_pictures";
const UPLOAD_PATH: &str = "/pictures/upload_picture";
const LIKE_PATH: &str = "/pictures/like_picture";
const TOGGLE_PATH: &str = "/pictures/toggle_picture_visibility";

/// Visibility flag sent as either 0/1 or a boolean
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Int(i64),
    Bool(bool),
}

impl Flag {
    pub fn is_set(&self) -> bool {
        match self {
            Flag::Int(v) => *v == 1,
            Flag::Bool(b) => *b,
        }
    }
}

/// A picture record from the server
#[derive(Debug, Clone, Deserialize)]
pub struct PictureRecord {
    pub filename: String,
    /// Absent means hidden
    #[serde(default)]
    pub show_picture: Option<Flag>,
    #[serde(default)]
    pub likes: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
}

impl PictureRecord {
    pub fn is_visible(&self) -> bool {
        self.show_picture.is_some_and(|flag| flag.is_set())
    }

    /// Like count, with missing or out-of-range values read as zero
    pub fn like_count(&self) -> u32 {
        self.likes
            .and_then(|likes| u32::try_from(likes).ok())
            .unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
struct PicturesResponse {
    success: bool,
    #[serde(default)]
    pictures: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    error: Option<String>,
}

/// Reply to a mutating picture action
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionReply {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// New like count (like action)
    #[serde(default)]
    pub likes: Option<u32>,
    /// New visibility (toggle action)
    #[serde(default)]
    pub show_picture: Option<Flag>,
    /// Stored filename (upload action)
    #[serde(default)]
    pub filename: Option<String>,
}

impl ActionReply {
    /// Decode a reply, treating `success: false` as an action error
    pub fn decode(payload: RawPayload, fallback: &str) -> Result<Self, FetchError> {
        let reply: ActionReply = serde_json::from_value(payload.into_json()?)?;
        if reply.success {
            Ok(reply)
        } else {
            Err(FetchError::Action(
                reply.error.unwrap_or_else(|| fallback.to_string()),
            ))
        }
    }
}

pub fn upload_request(picture: &str, title: &str, description: &str) -> FetchRequest {
    FetchRequest::post(
        UPLOAD_PATH,
        json!({
            "picture": picture,
            "title": title,
            "description": description,
        }),
    )
}

pub fn like_request(filename: &str) -> FetchRequest {
    FetchRequest::post(LIKE_PATH, json!({ "filename": filename }))
}

pub fn toggle_request(filename: &str) -> FetchRequest {
    FetchRequest::post(TOGGLE_PATH, json!({ "filename": filename }))
}

/// Visible pictures, in server order
pub struct PictureFeed {
    server_url: String,
    limit: u32,
}

impl PictureFeed {
    pub fn new(config: &Config) -> Self {
        Self {
            server_url: config.server_url.clone(),
            limit: config.picture_limit,
        }
    }

    fn picture_url(&self, filename: &str) -> String {
        format!("{}/pictures/{}", self.server_url, urlencoding::encode(filename))
    }
}

impl Feed for PictureFeed {
    fn kind(&self) -> ScreenKind {
        ScreenKind::Pictures
    }

    fn request(&self) -> FetchRequest {
        FetchRequest::get(LIST_PATH).with_query("limit", self.limit.to_string())
    }

    fn decode(&self, payload: RawPayload) -> Result<FeedSnapshot, FetchError> {
        let response: PicturesResponse = serde_json::from_value(payload.into_json()?)?;

        let records = match response.pictures {
            Some(records) if response.success && !records.is_empty() => records,
            _ => {
                return Err(FetchError::EmptyResult(
                    response
                        .error
                        .unwrap_or_else(|| "No pictures available".to_string()),
                ))
            }
        };

        let total = records.len();
        let items: Vec<Item> = records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<PictureRecord>(record) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Skipping malformed picture record: {}", e);
                    None
                }
            })
            .filter(PictureRecord::is_visible)
            .map(|record| {
                let mut item = Item::new(record.filename.clone(), self.picture_url(&record.filename));
                item.like_count = Some(record.like_count());
                item.with_meta(ItemMeta::Picture {
                    title: record.title,
                })
            })
            .collect();

        tracing::debug!("{} of {} pictures visible", items.len(), total);

        Ok(ItemList::new(items).into())
    }
}
