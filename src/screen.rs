//! Screen types and per-screen timing profiles
//!
//! A screen is one full-display content mode. Each kind has a fixed profile
//! describing how often its data is refreshed and how its items rotate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Available screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenKind {
    /// Weather radar frames over a map
    Weather,
    /// Accumulated flight-density heatmaps
    Flights,
    /// Live aircraft positions
    Radar,
    /// GOES satellite full-disk image
    Earth,
    /// Ranked news headlines
    News,
    /// Interactive photo slideshow
    Pictures,
    /// Any screen name this client does not know
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for ScreenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScreenKind::Weather => write!(f, "weather"),
            ScreenKind::Flights => write!(f, "flights"),
            ScreenKind::Radar => write!(f, "radar"),
            ScreenKind::Earth => write!(f, "earth"),
            ScreenKind::News => write!(f, "news"),
            ScreenKind::Pictures => write!(f, "pictures"),
            ScreenKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Display theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    #[default]
    #[serde(other)]
    Light,
}

/// Screen assignment resolved for this device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenAssignment {
    pub screen: ScreenKind,
    #[serde(default)]
    pub theme: Theme,
}

/// How items advance on a screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RotationStyle {
    /// The whole list is shown at once; the cursor never moves
    Static,
    /// Pure image sequence: short dwell, no progress or fade
    Sequence { dwell: Duration },
    /// Long dwell with a progress bar and a fade window before the switch
    Paced {
        dwell: Duration,
        fade: Duration,
        tick: Duration,
    },
}

impl RotationStyle {
    /// Dwell time per item, if the screen rotates at all
    pub fn dwell(&self) -> Option<Duration> {
        match self {
            RotationStyle::Static => None,
            RotationStyle::Sequence { dwell } | RotationStyle::Paced { dwell, .. } => Some(*dwell),
        }
    }

    /// Progress added per tick, in percent
    pub fn progress_step(&self) -> f32 {
        match self {
            RotationStyle::Paced { dwell, tick, .. } if !dwell.is_zero() => {
                100.0 * tick.as_secs_f32() / dwell.as_secs_f32()
            }
            _ => 0.0,
        }
    }
}

/// What happens to the cursor when a refresh replaces the list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReanchorPolicy {
    /// Always restart from the first item
    ResetToStart,
    /// Keep the index if it is still in bounds, otherwise restart
    KeepInBounds,
}

/// What happens when the cursor would wrap past the last item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapPolicy {
    /// Wrap straight to index 0
    Wrap,
    /// Fetch a fresh list first, then restart at index 0
    RefreshOnWrap,
}

/// Timing and policy constants for one screen
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenProfile {
    pub kind: ScreenKind,
    /// Interval between scheduled refreshes (first one fires on mount)
    pub refresh_interval: Duration,
    pub rotation: RotationStyle,
    pub reanchor: ReanchorPolicy,
    pub wrap: WrapPolicy,
    /// Warm every item's media ahead of display
    pub prefetch: bool,
}

const SEQUENCE_DWELL: Duration = Duration::from_secs(1);
const PACED: RotationStyle = RotationStyle::Paced {
    dwell: Duration::from_secs(30),
    fade: Duration::from_millis(500),
    tick: Duration::from_millis(100),
};
const TEN_MINUTES: Duration = Duration::from_secs(10 * 60);

impl ScreenProfile {
    /// Default profile for a screen kind
    pub fn for_kind(kind: ScreenKind) -> Self {
        let (refresh_interval, rotation, reanchor, wrap, prefetch) = match kind {
            ScreenKind::Weather => (
                TEN_MINUTES,
                RotationStyle::Sequence { dwell: SEQUENCE_DWELL },
                ReanchorPolicy::KeepInBounds,
                WrapPolicy::Wrap,
                true,
            ),
            ScreenKind::Flights => (
                Duration::from_secs(60),
                RotationStyle::Sequence { dwell: SEQUENCE_DWELL },
                ReanchorPolicy::KeepInBounds,
                WrapPolicy::Wrap,
                true,
            ),
            ScreenKind::Radar => (
                Duration::from_secs(5),
                RotationStyle::Static,
                ReanchorPolicy::KeepInBounds,
                WrapPolicy::Wrap,
                false,
            ),
            ScreenKind::Earth => (
                TEN_MINUTES,
                RotationStyle::Static,
                ReanchorPolicy::ResetToStart,
                WrapPolicy::Wrap,
                true,
            ),
            ScreenKind::News => (
                TEN_MINUTES,
                PACED,
                ReanchorPolicy::ResetToStart,
                WrapPolicy::Wrap,
                false,
            ),
            ScreenKind::Pictures => (
                TEN_MINUTES,
                PACED,
                ReanchorPolicy::ResetToStart,
                WrapPolicy::RefreshOnWrap,
                true,
            ),
            ScreenKind::Unknown => (
                TEN_MINUTES,
                RotationStyle::Static,
                ReanchorPolicy::ResetToStart,
                WrapPolicy::Wrap,
                false,
            ),
        };

        Self {
            kind,
            refresh_interval,
            rotation,
            reanchor,
            wrap,
            prefetch,
        }
    }
}
