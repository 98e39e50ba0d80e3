//! Live aircraft feed
//!
//! The server relays a feeder's JSON object keyed by flight id. Each value is
//! a fixed positional tuple:
//!
//! ```text
//! ["4A914F", 59.2893, 18.1239, 305, 2275, 179, "5322", 0, "", "", 1415781759, "", "", "", 0, -640, "SCW10"]
//!  mode-S    lat      lon      trk  alt   spd  squawk             timestamp                       callsign
//! ```
//!
//! Non-array entries (counters, version stamps) are skipped.

use serde_json::{json, Value};

use crate::config::{Config, RadarBounds};
use crate::datasource::{Feed, FeedSnapshot};
use crate::error::FetchError;
use crate::fetch::{FetchRequest, RawPayload};
use crate::item::{Item, ItemList, ItemMeta};
use crate::screen::ScreenKind;

const RADAR_PATH: &str = "/radar-json";

/// Coordinates this close to zero are treated as missing
const MIN_COORDINATE: f64 = 0.001;

const IDX_MODE_S: usize = 0;
const IDX_LAT: usize = 1;
const IDX_LON: usize = 2;
const IDX_TRACK: usize = 3;
const IDX_ALTITUDE: usize = 4;
const IDX_SPEED: usize = 5;
const IDX_SQUAWK: usize = 6;
const IDX_TIMESTAMP: usize = 10;
const IDX_CALLSIGN: usize = 16;

/// Altitude legend bands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AltitudeBand {
    /// Above 30,000 ft
    High,
    /// 20,000 - 30,000 ft
    Medium,
    /// 10,000 - 20,000 ft
    MediumLow,
    /// Below 10,000 ft
    Low,
    /// No altitude reported
    Unknown,
}

/// One aircraft inside the radar window
#[derive(Debug, Clone, PartialEq)]
pub struct Aircraft {
    pub mode_s: String,
    pub lat: f64,
    pub lon: f64,
    /// Heading in degrees
    pub track: i64,
    /// Feet
    pub altitude: i64,
    /// Knots
    pub speed: i64,
    pub squawk: String,
    pub callsign: String,
    pub timestamp: Option<i64>,
}

impl Aircraft {
    pub fn altitude_band(&self) -> AltitudeBand {
        match self.altitude {
            a if a > 30_000 => AltitudeBand::High,
            a if a > 20_000 => AltitudeBand::Medium,
            a if a > 10_000 => AltitudeBand::MediumLow,
            a if a > 0 => AltitudeBand::Low,
            _ => AltitudeBand::Unknown,
        }
    }

    /// Altitude in hundreds of feet, or `---` when unknown
    pub fn altitude_label(&self) -> String {
        if self.altitude > 0 {
            format!("{}", (self.altitude as f64 / 100.0).round() as i64)
        } else {
            "---".to_string()
        }
    }

    /// Parse one positional record, rejecting missing or out-of-window positions
    fn from_record(record: &[Value], bounds: &RadarBounds) -> Option<Self> {
        let lat = number(record.get(IDX_LAT)?)?;
        let lon = number(record.get(IDX_LON)?)?;

        if lat.abs() <= MIN_COORDINATE || lon.abs() <= MIN_COORDINATE {
            return None;
        }
        if !bounds.contains(lat, lon) {
            return None;
        }

        Some(Self {
            mode_s: text(record.get(IDX_MODE_S)).unwrap_or_default(),
            lat,
            lon,
            track: integer(record.get(IDX_TRACK)),
            altitude: integer(record.get(IDX_ALTITUDE)),
            speed: integer(record.get(IDX_SPEED)),
            squawk: text(record.get(IDX_SQUAWK)).unwrap_or_else(|| "N/A".to_string()),
            callsign: text(record.get(IDX_CALLSIGN)).unwrap_or_else(|| "N/A".to_string()),
            timestamp: record.get(IDX_TIMESTAMP).and_then(number).map(|t| t as i64),
        })
    }
}

/// Number or numeric string
fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|n: &f64| n.is_finite())
}

/// Integer field, 0 when absent or unparseable
fn integer(value: Option<&Value>) -> i64 {
    value.and_then(number).map(|n| n.trunc() as i64).unwrap_or(0)
}

/// Non-empty string field
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Aircraft positions within the configured window
pub struct AircraftFeed {
    device_id: String,
    bounds: RadarBounds,
}

impl AircraftFeed {
    pub fn new(config: &Config) -> Self {
        Self {
            device_id: config.device_id.clone(),
            bounds: config.radar_bounds,
        }
    }
}

impl Feed for AircraftFeed {
    fn kind(&self) -> ScreenKind {
        ScreenKind::Radar
    }

    fn request(&self) -> FetchRequest {
        FetchRequest::post(RADAR_PATH, json!({ "ipad": self.device_id }))
    }

    fn decode(&self, payload: RawPayload) -> Result<FeedSnapshot, FetchError> {
        let value = payload.into_json()?;
        let Value::Object(entries) = value else {
            return Err(FetchError::Payload(
                "expected an object of aircraft records".to_string(),
            ));
        };

        let items: Vec<Item> = entries
            .iter()
            .filter_map(|(key, value)| {
                let record = value.as_array()?;
                let aircraft = Aircraft::from_record(record, &self.bounds)?;
                let mut item = Item::new(key.clone(), "");
                item.display_timestamp = aircraft.timestamp;
                Some(item.with_meta(ItemMeta::Aircraft(aircraft)))
            })
            .collect();

        tracing::debug!("{} of {} aircraft records in window", items.len(), entries.len());

        Ok(ItemList::new(items).into())
    }
}
