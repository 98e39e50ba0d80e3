//! Runtime configuration
//!
//! Values come from the environment with sensible defaults, mirroring how
//! the kiosk is deployed (one process per device).

use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;

use crate::error::ConfigError;

/// Geographic window for the live aircraft screen
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RadarBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl RadarBounds {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

impl Default for RadarBounds {
    fn default() -> Self {
        Self {
            min_lat: 39.4,
            max_lat: 40.5,
            min_lon: -87.3,
            max_lon: -85.0,
        }
    }
}

/// Kiosk configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the content server, without trailing slash
    pub server_url: String,
    /// Device identifier sent with assignment and radar requests
    pub device_id: String,
    /// Display zone offset from UTC, in minutes
    pub utc_offset_minutes: i32,
    /// Maximum pictures requested per refresh
    pub picture_limit: u32,
    pub radar_bounds: RadarBounds,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:5050".to_string(),
            device_id: "1".to_string(),
            utc_offset_minutes: -300,
            picture_limit: 100,
            radar_bounds: RadarBounds::default(),
        }
    }
}

impl Config {
    /// Load configuration from `KIOSK_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(url) = lookup("KIOSK_SERVER_URL") {
            config.server_url = url.trim_end_matches('/').to_string();
        }
        if let Some(id) = lookup("KIOSK_DEVICE_ID") {
            config.device_id = id;
        }
        if let Some(raw) = lookup("KIOSK_UTC_OFFSET_MINUTES") {
            config.utc_offset_minutes = parse("KIOSK_UTC_OFFSET_MINUTES", &raw)?;
            if config.zone().is_none() {
                return Err(ConfigError::InvalidValue {
                    key: "KIOSK_UTC_OFFSET_MINUTES",
                    value: raw,
                });
            }
        }
        if let Some(raw) = lookup("KIOSK_PICTURE_LIMIT") {
            config.picture_limit = parse("KIOSK_PICTURE_LIMIT", &raw)?;
        }
        if let Some(raw) = lookup("KIOSK_RADAR_BOUNDS") {
            config.radar_bounds = parse_bounds(&raw)?;
        }

        Ok(config)
    }

    /// Display time zone, if the configured offset is valid
    pub fn zone(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes.checked_mul(60)?)
    }

    /// Display time zone, falling back to UTC
    pub fn zone_or_utc(&self) -> FixedOffset {
        self.zone().unwrap_or_else(|| Utc.fix())
    }

    /// Absolute URL for a server path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.server_url, path)
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

fn parse_bounds(raw: &str) -> Result<RadarBounds, ConfigError> {
    let values: Vec<f64> = raw
        .split(',')
        .map(|part| parse("KIOSK_RADAR_BOUNDS", part))
        .collect::<Result<_, _>>()?;

    match values.as_slice() {
        [min_lat, max_lat, min_lon, max_lon] if min_lat <= max_lat && min_lon <= max_lon => {
            Ok(RadarBounds {
                min_lat: *min_lat,
                max_lat: *max_lat,
                min_lon: *min_lon,
                max_lon: *max_lon,
            })
        }
        _ => Err(ConfigError::InvalidValue {
            key: "KIOSK_RADAR_BOUNDS",
            value: raw.to_string(),
        }),
    }
}
