//! Sighting records and backend payload decoding
//!
//! The backend is loose about scalar types: ids arrive as numbers or strings,
//! coordinates sometimes as numeric strings, and timestamps as ISO-8601 text
//! or epoch milliseconds. Decoding normalizes all of these. A record without
//! usable coordinates or timestamp is dropped; the rest of the payload is kept.

use super::geo::Coordinate;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Opaque backend identifier of a sighting
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SightingId(String);

impl SightingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SightingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// A backend-recorded report. Read-only to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sighting {
    pub id: SightingId,
    pub description: String,
    pub lat: f64,
    pub lng: f64,
    pub timestamp: DateTime<Utc>,
    pub image_url: Option<String>,
    pub device_id: Option<String>,
}

impl Sighting {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// Result of decoding a `GET /sightings` body
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSightings {
    pub sightings: Vec<Sighting>,
    /// Records dropped because a required field was missing or unusable
    pub skipped: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope {
    Wrapped { sightings: Vec<Value> },
    Bare(Vec<Value>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(serde_json::Number),
    Text(String),
}

#[derive(Deserialize)]
struct WireSighting {
    id: Option<Scalar>,
    #[serde(default)]
    description: Option<String>,
    lat: Option<Scalar>,
    lng: Option<Scalar>,
    timestamp: Option<Scalar>,
    #[serde(default, alias = "imageUrl")]
    image_url: Option<String>,
    #[serde(default, alias = "deviceId")]
    device_id: Option<String>,
}

/// Decode a sightings response body (bare array or `{ "sightings": [...] }`)
///
/// Fails only when the body as a whole is not one of the two accepted shapes.
pub fn decode_sightings(body: &[u8]) -> Result<DecodedSightings, String> {
    let envelope: Envelope = serde_json::from_slice(body)
        .map_err(|e| format!("response is not a sightings list: {}", e))?;

    let records = match envelope {
        Envelope::Wrapped { sightings } => sightings,
        Envelope::Bare(sightings) => sightings,
    };

    let mut sightings = Vec::with_capacity(records.len());
    let mut skipped = 0;

    for (index, record) in records.into_iter().enumerate() {
        match decode_record(record) {
            Ok(sighting) => sightings.push(sighting),
            Err(reason) => {
                tracing::warn!(index = index, reason = %reason, "Skipping malformed sighting record");
                skipped += 1;
            }
        }
    }

    Ok(DecodedSightings { sightings, skipped })
}

fn decode_record(record: Value) -> Result<Sighting, String> {
    let wire: WireSighting = serde_json::from_value(record).map_err(|e| e.to_string())?;

    let id = match wire.id {
        Some(Scalar::Number(n)) => n.to_string(),
        Some(Scalar::Text(s)) if !s.trim().is_empty() => s,
        _ => return Err("missing id".to_string()),
    };

    let lat = scalar_to_f64(wire.lat.as_ref()).ok_or_else(|| format!("sighting {}: missing lat", id))?;
    let lng = scalar_to_f64(wire.lng.as_ref()).ok_or_else(|| format!("sighting {}: missing lng", id))?;
    if !Coordinate::new(lat, lng).is_valid() {
        return Err(format!("sighting {}: coordinates out of range ({}, {})", id, lat, lng));
    }

    let timestamp = wire
        .timestamp
        .as_ref()
        .and_then(scalar_to_timestamp)
        .ok_or_else(|| format!("sighting {}: missing or unparseable timestamp", id))?;

    Ok(Sighting {
        id: SightingId(id),
        description: wire.description.unwrap_or_default(),
        lat,
        lng,
        timestamp,
        image_url: wire.image_url.filter(|u| !u.trim().is_empty()),
        device_id: wire.device_id,
    })
}

fn scalar_to_f64(scalar: Option<&Scalar>) -> Option<f64> {
    match scalar? {
        Scalar::Number(n) => n.as_f64(),
        Scalar::Text(s) => s.trim().parse::<f64>().ok(),
    }
}

fn scalar_to_timestamp(scalar: &Scalar) -> Option<DateTime<Utc>> {
    match scalar {
        Scalar::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        Scalar::Text(s) => parse_timestamp(s),
    }
}

/// Parse a timestamp string
///
/// Accepts RFC 3339, RFC 2822, ISO 8601 with a `+hhmm` offset, naive
/// date-times with or without seconds (read as UTC), bare dates (UTC
/// midnight) and epoch millis.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|midnight| Utc.from_utc_datetime(&midnight));
    }

    raw.parse::<i64>()
        .ok()
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
}
