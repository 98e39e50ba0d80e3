//! Ranked news headline feed

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::Value;

use crate::datasource::{Feed, FeedSnapshot};
use crate::error::FetchError;
use crate::fetch::{FetchRequest, RawPayload};
use crate::item::{Item, ItemList, ItemMeta};
use crate::screen::ScreenKind;
use crate::text;

const NEWS_PATH: &str = "/get_news";

/// A headline as ranked by the server
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Headline {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub published_date: String,
    /// Relevance score out of 100
    #[serde(default)]
    pub ranking_score: f64,
    #[serde(default)]
    pub ai_reasoning: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

impl Headline {
    /// Publication date in the display zone
    pub fn formatted_date(&self, zone: FixedOffset) -> String {
        text::format_published_date(&self.published_date, zone)
    }

    fn published_epoch(&self) -> Option<i64> {
        DateTime::parse_from_rfc3339(&self.published_date)
            .or_else(|_| DateTime::parse_from_rfc2822(&self.published_date))
            .ok()
            .map(|dt| dt.timestamp())
    }
}

/// News headlines in ranking order
pub struct NewsFeed;

impl NewsFeed {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NewsFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl Feed for NewsFeed {
    fn kind(&self) -> ScreenKind {
        ScreenKind::News
    }

    fn request(&self) -> FetchRequest {
        FetchRequest::get(NEWS_PATH)
    }

    fn decode(&self, payload: RawPayload) -> Result<FeedSnapshot, FetchError> {
        let records: Vec<Value> = serde_json::from_value(payload.into_json()?)?;
        let total = records.len();

        let headlines: Vec<Headline> = records
            .into_iter()
            .filter_map(|record| match serde_json::from_value(record) {
                Ok(headline) => Some(headline),
                Err(e) => {
                    tracing::warn!("Skipping malformed headline: {}", e);
                    None
                }
            })
            .collect();

        if headlines.is_empty() {
            return Err(FetchError::EmptyResult("No news data received".to_string()));
        }
        if headlines.len() < total {
            tracing::debug!("{} of {} headlines usable", headlines.len(), total);
        }

        let items = headlines
            .into_iter()
            .map(|headline| {
                let mut item = Item::new(
                    format!("{}|{}", headline.published_date, headline.title),
                    "",
                );
                item.display_timestamp = headline.published_epoch();
                item.with_meta(ItemMeta::Headline(headline))
            })
            .collect();

        Ok(ItemList::new(items).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feed() -> NewsFeed {
        NewsFeed::new()
    }

    #[test]
    fn test_decode_headlines_in_server_order() {
        let payload = json!([
            {
                "title": "Second most important",
                "description": "Body",
                "published_date": "2024-06-15T18:30:00Z",
                "ranking_score": 88,
                "ai_reasoning": "Local impact",
                "author": "A. Writer"
            },
            {
                "title": "Less important",
                "description": "Other",
                "published_date": "not a date",
                "ranking_score": 41.5
            }
        ]);

        let snapshot = feed().decode(RawPayload::Json(payload)).unwrap();
        assert_eq!(snapshot.items.len(), 2);

        let first = snapshot.items.get(0).unwrap();
        assert_eq!(first.display_timestamp, Some(1_718_476_200));
        let ItemMeta::Headline(headline) = &first.meta else {
            panic!("expected headline");
        };
        assert_eq!(headline.title, "Second most important");
        assert_eq!(headline.ranking_score, 88.0);
        assert_eq!(headline.author.as_deref(), Some("A. Writer"));

        let second = snapshot.items.get(1).unwrap();
        assert_eq!(second.display_timestamp, None);
    }

    #[test]
    fn test_empty_array_is_empty_result() {
        let err = feed().decode(RawPayload::Json(json!([]))).unwrap_err();
        assert_eq!(err, FetchError::EmptyResult("No news data received".to_string()));
    }

    #[test]
    fn test_malformed_headline_is_skipped() {
        let payload = json!([
            { "title": "Good one", "published_date": "2024-06-15T18:30:00Z" },
            { "title": null },
            "not a record",
            { "title": "Also good", "ranking_score": "high" },
            { "title": "Last" }
        ]);

        let snapshot = feed().decode(RawPayload::Json(payload)).unwrap();
        let titles: Vec<String> = snapshot
            .items
            .iter()
            .filter_map(|item| match &item.meta {
                ItemMeta::Headline(h) => Some(h.title.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(titles, ["Good one", "Last"]);
    }

    #[test]
    fn test_all_malformed_is_empty_result() {
        let err = feed()
            .decode(RawPayload::Json(json!([{ "title": null }, 7])))
            .unwrap_err();
        assert_eq!(err, FetchError::EmptyResult("No news data received".to_string()));
    }

    #[test]
    fn test_object_is_payload_error() {
        let err = feed()
            .decode(RawPayload::Json(json!({ "error": "db down" })))
            .unwrap_err();
        assert!(matches!(err, FetchError::Payload(_)));
    }
}
