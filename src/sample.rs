use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::HashSet;

/// The upstream device stamps samples in its own clock, nine hours ahead of
/// the stored timeline.
const DEVICE_TIME_OFFSET_HOURS: i64 = 9;

/// One inbound frame from the noise sample stream.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSample {
    pub id: i64,
    pub time: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub metric: String,
    pub sample: f64,
}

/// An accepted sample in its persisted form. Written once, never updated.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseSample {
    pub inserted_at: DateTime<Utc>,
    pub measured_at: DateTime<Utc>,
    pub station_id: i64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    BelowRange,
    AboveRange,
    IgnoredStation,
    Accepted(NoiseSample),
}

/// Lookup key for the station directory. The same formatting is used when
/// loading station rows and when resolving frames, so a stored coordinate
/// always round-trips.
pub fn coordinate_key(lat: f64, lon: f64) -> String {
    format!("{lat},{lon}")
}

/// Integer-valued samples keep their value exactly; fractional values are
/// rounded to one decimal place.
fn normalize_value(value: f64) -> f64 {
    if value.fract() == 0.0 {
        value
    } else {
        (value * 10.0).round() / 10.0
    }
}

/// Device time corrected by the fixed offset. An unparseable device
/// timestamp falls back to the capture time, uncorrected.
fn measured_at(device_time: &str, captured_at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(device_time.trim())
        .map(|dt| dt.with_timezone(&Utc) - Duration::hours(DEVICE_TIME_OFFSET_HOURS))
        .unwrap_or(captured_at)
}

/// Classifies one raw frame. Range checks run before any station resolution;
/// the station id for persistence comes from the directory lookup by
/// coordinate, never from the frame itself.
pub fn classify<F>(
    raw: &RawSample,
    centers: &HashSet<i64>,
    lookup: F,
    captured_at: DateTime<Utc>,
) -> Outcome
where
    F: Fn(&str) -> Option<i64>,
{
    if raw.sample < 0.0 {
        return Outcome::BelowRange;
    }
    if raw.sample > 999.0 {
        return Outcome::AboveRange;
    }

    let station_id = match lookup(&coordinate_key(raw.lat, raw.lon)) {
        Some(id) => id,
        None => return Outcome::IgnoredStation,
    };
    if !centers.contains(&station_id) {
        return Outcome::IgnoredStation;
    }

    Outcome::Accepted(NoiseSample {
        inserted_at: captured_at,
        measured_at: measured_at(&raw.time, captured_at),
        station_id,
        value: normalize_value(raw.sample),
    })
}
