//! Content rotation and refresh engine for an always-on kiosk display
//!
//! Each screen periodically re-fetches its data, rotates through the fetched
//! items on a fixed cadence, prefetches media ahead of display and accepts
//! user actions (upload, like, hide) without disturbing the rotation.

pub mod aircraft;
pub mod config;
pub mod datasource;
pub mod error;
pub mod fetch;
pub mod heatmap;
pub mod item;
pub mod kiosk;
pub mod mutation;
pub mod news;
pub mod pictures;
pub mod prefetch;
pub mod rotation;
pub mod runtime;
pub mod satellite;
pub mod scheduler;
pub mod screen;
pub mod text;
pub mod timer;
pub mod weather;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{ConfigError, FetchError, MutationError};
pub use fetch::{FetchGate, FetchStatus, HttpTransport, ScreenParams, Transport};
pub use item::{Item, ItemList};
pub use kiosk::Kiosk;
pub use mutation::{UploadFile, UploadJob, UploadReport};
pub use runtime::{RefreshOutcome, ScreenContext, ScreenRuntime, ScreenView};
pub use screen::{ScreenKind, ScreenProfile, Theme};
