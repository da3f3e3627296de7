//! Shared parsing utilities for hazard sources.
//!
//! Timestamp and `GeoJSON` position helpers used by more than one adapter.

use chrono::{DateTime, Utc};
use leea_hazard_models::LatLon;

/// Parses an epoch-milliseconds timestamp (USGS `properties.time`).
#[must_use]
pub fn parse_epoch_millis(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(value.as_i64()?)
}

/// Parses an RFC 3339 timestamp with any offset into UTC.
#[must_use]
pub fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Converts a `GeoJSON` position (`[lon, lat, ...]`) into a [`LatLon`].
/// Returns `None` if fewer than two components are present.
#[must_use]
pub fn position_to_lat_lon(position: &[f64]) -> Option<LatLon> {
    match position {
        [lon, lat, ..] => Some(LatLon::new(*lat, *lon)),
        _ => None,
    }
}

/// Converts a `GeoJSON` linear ring into vertices. Returns `None` if any
/// position is short.
#[must_use]
pub fn ring_to_lat_lons(ring: &[Vec<f64>]) -> Option<Vec<LatLon>> {
    ring.iter().map(|p| position_to_lat_lon(p)).collect()
}

/// Reads a non-empty, trimmed string property.
#[must_use]
pub fn string_property(properties: Option<&geojson::JsonObject>, name: &str) -> Option<String> {
    properties?
        .get(name)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}
