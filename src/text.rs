//! Display text formatting
//!
//! Timestamps are rendered in the kiosk's configured zone using US-style
//! month/day ordering and a 24-hour clock.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};

/// Format epoch seconds as `M/D/YYYY, HH:MM:SS`
pub fn format_timestamp(epoch_secs: i64, zone: FixedOffset) -> Option<String> {
    let dt = zone.timestamp_opt(epoch_secs, 0).single()?;
    Some(dt.format("%-m/%-d/%Y, %H:%M:%S").to_string())
}

/// Format epoch seconds as `M/D/YYYY`
pub fn format_date(epoch_secs: i64, zone: FixedOffset) -> Option<String> {
    let dt = zone.timestamp_opt(epoch_secs, 0).single()?;
    Some(dt.format("%-m/%-d/%Y").to_string())
}

/// Format a headline's published date as `Mon D, YYYY, HH:MM AM`
///
/// Accepts RFC 3339, RFC 2822 and `YYYY-MM-DD HH:MM:SS` (taken as UTC).
/// Anything else is returned unchanged.
pub fn format_published_date(raw: &str, zone: FixedOffset) -> String {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .map(|dt| dt.with_timezone(&zone))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc().with_timezone(&zone))
        });

    match parsed {
        Some(dt) => dt.format("%b %-d, %Y, %I:%M %p").to_string(),
        None => raw.to_string(),
    }
}

/// Format a 1-based position counter, e.g. `3 of 10`
pub fn format_position(index: usize, len: usize) -> String {
    format!("{} of {}", index + 1, len)
}
