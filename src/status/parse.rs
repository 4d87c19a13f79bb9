//! Status API body and timestamp parsing
//!
//! The API answers with
//!
//! ```json
//! { "dog_feed_status": { "morning": "2025-08-23T14:26:25Z", "evening": false } }
//! ```
//!
//! where each slot is `false`, `null`, `true`, an ISO-8601 UTC timestamp or a
//! local `H:MM:SS am` string.

use chrono::{DateTime, NaiveDateTime, NaiveTime};
use serde::Deserialize;

use crate::error::FetchError;
use crate::status::{FeedTime, FeedingSlot, StatusSnapshot};
use crate::time::utc_to_local;

#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    dog_feed_status: Option<RawStatus>,
}

#[derive(Debug, Default, Deserialize)]
struct RawStatus {
    #[serde(default)]
    morning: Option<RawSlot>,
    #[serde(default)]
    evening: Option<RawSlot>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSlot {
    Flag(bool),
    Stamp(String),
}

/// Local formats accepted for a feeding time, tried in order
const LOCAL_FORMATS: [&str; 6] = [
    "%I:%M:%S %p",
    "%I:%M:%S%p",
    "%I:%M %p",
    "%I:%M%p",
    "%H:%M:%S",
    "%H:%M",
];

/// Decode a status API response body into a snapshot
pub fn parse_status_body(body: &[u8], utc_offset_hours: i32) -> Result<StatusSnapshot, FetchError> {
    let envelope: StatusEnvelope = serde_json::from_slice(body)?;
    let status = envelope.dog_feed_status.ok_or(FetchError::MissingStatus)?;

    Ok(StatusSnapshot::new(
        slot_from_raw(status.morning, utc_offset_hours),
        slot_from_raw(status.evening, utc_offset_hours),
    ))
}

fn slot_from_raw(raw: Option<RawSlot>, utc_offset_hours: i32) -> FeedingSlot {
    match raw {
        None | Some(RawSlot::Flag(false)) => FeedingSlot::NOT_FED,
        Some(RawSlot::Flag(true)) => FeedingSlot::fed_unknown_time(),
        Some(RawSlot::Stamp(stamp)) if stamp.trim().is_empty() => FeedingSlot::NOT_FED,
        Some(RawSlot::Stamp(stamp)) => match parse_timestamp(&stamp, utc_offset_hours) {
            Some(time) => FeedingSlot::fed_at(time),
            None => {
                log::warn!("Unrecognised feeding timestamp '{}', showing as fed", stamp);
                FeedingSlot::fed_unknown_time()
            }
        },
    }
}

/// Normalise an API timestamp to local time of day
///
/// ISO-8601 values are UTC unless they carry their own offset and are shifted
/// by `utc_offset_hours`. Plain times of day are already local.
pub fn parse_timestamp(raw: &str, utc_offset_hours: i32) -> Option<FeedTime> {
    let raw = raw.trim();

    if raw.contains('T') {
        let utc = DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.naive_utc())
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
            .ok()?;
        return utc_to_local(utc, utc_offset_hours).map(|local| FeedTime::new(local.time()));
    }

    LOCAL_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(raw, format).ok())
        .map(FeedTime::new)
}
