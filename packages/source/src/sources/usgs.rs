//! USGS earthquake summary feed.
//!
//! The feed is chosen from the minimum magnitude and time window, e.g.
//! `4.5_day.geojson`. Each `Point` feature becomes an epicenter hazard
//! carrying its `mag`. A missing or non-numeric `mag` counts as 0.0, which
//! gets the smallest buffer. Records without coordinates or time are
//! dropped and counted.

use async_trait::async_trait;
use leea_hazard_models::{HazardFeature, SourceTier};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::parsing::{parse_epoch_millis, position_to_lat_lon, string_property};
use crate::{HazardSource, HttpSettings, SourceBatch, SourceError, SourceOutcome, retry};

/// Base URL of the USGS summary feeds.
pub const USGS_BASE: &str = "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary";

/// Time window covered by a summary feed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FeedWindow {
    /// Past hour.
    Hour,
    /// Past day.
    #[default]
    Day,
    /// Past seven days.
    Week,
    /// Past thirty days.
    Month,
}

impl FeedWindow {
    /// Parses a window name, falling back to [`FeedWindow::Day`].
    #[must_use]
    pub fn parse_or_day(s: &str) -> Self {
        s.trim().parse().unwrap_or_else(|_| {
            log::warn!("Unknown earthquake window '{s}', using 'day'");
            Self::Day
        })
    }
}

/// A longitude/latitude bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western edge.
    pub min_lon: f64,
    /// Southern edge.
    pub min_lat: f64,
    /// Eastern edge.
    pub max_lon: f64,
    /// Northern edge.
    pub max_lat: f64,
}

impl BoundingBox {
    /// Inclusive containment.
    #[must_use]
    pub fn contains(&self, at: leea_hazard_models::LatLon) -> bool {
        (self.min_lon..=self.max_lon).contains(&at.lon)
            && (self.min_lat..=self.max_lat).contains(&at.lat)
    }
}

/// Returns the feed URL and a human-readable title.
#[must_use]
pub fn feed_for(min_magnitude: f64, window: FeedWindow) -> (String, String) {
    let (prefix, label) = if min_magnitude >= 7.0 {
        ("significant", "USGS Significant Earthquakes".to_string())
    } else if min_magnitude >= 4.5 {
        ("4.5", "USGS M4.5+ Earthquakes".to_string())
    } else if min_magnitude >= 2.5 {
        ("2.5", "USGS M2.5+ Earthquakes".to_string())
    } else {
        ("all", "USGS All Earthquakes".to_string())
    };
    (
        format!("{USGS_BASE}/{prefix}_{window}.geojson"),
        format!("{label} ({window})"),
    )
}

/// Parses a USGS `FeatureCollection` into epicenter hazards.
///
/// Returns the valid features and the number of malformed records.
/// Features outside `bbox` are filtered without being counted as dropped.
///
/// # Errors
///
/// Returns [`SourceError::Malformed`] if the body has no `features` array.
pub fn parse_feed(
    body: &serde_json::Value,
    bbox: Option<&BoundingBox>,
) -> Result<(Vec<HazardFeature>, usize), SourceError> {
    let records = body["features"]
        .as_array()
        .ok_or_else(|| SourceError::Malformed {
            message: "no features array in USGS response".to_string(),
        })?;

    let mut features = Vec::with_capacity(records.len());
    let mut dropped = 0;

    for record in records {
        match parse_record(record) {
            Some(feature) => {
                let in_bbox = match (bbox, feature.geometry()) {
                    (
                        Some(bbox),
                        leea_hazard_models::HazardGeometry::Point { location, .. },
                    ) => bbox.contains(*location),
                    _ => true,
                };
                if in_bbox {
                    features.push(feature);
                }
            }
            None => dropped += 1,
        }
    }

    Ok((features, dropped))
}

fn parse_record(record: &serde_json::Value) -> Option<HazardFeature> {
    let feature = geojson::Feature::from_json_value(record.clone()).ok()?;
    let geojson::Value::Point(position) = &feature.geometry.as_ref()?.value else {
        return None;
    };
    let location = position_to_lat_lon(position)?;
    let properties = feature.properties.as_ref();
    let magnitude = properties
        .and_then(|p| p.get("mag"))
        .and_then(|mag| {
            mag.as_f64()
                .or_else(|| mag.as_str().and_then(|s| s.trim().parse().ok()))
        })
        .unwrap_or(0.0);
    let observed_at = parse_epoch_millis(properties?.get("time")?)?;

    match HazardFeature::point(SourceTier::Earthquake, location, magnitude, observed_at) {
        Ok(hazard) => Some(
            hazard
                .with_label(string_property(properties, "place"))
                .with_url(string_property(properties, "url"))
                .with_severity(string_property(properties, "alert")),
        ),
        Err(e) => {
            log::debug!("Dropping USGS record: {e}");
            None
        }
    }
}

/// Recent earthquakes from the USGS summary feeds.
pub struct UsgsEarthquakeSource {
    client: reqwest::Client,
    settings: HttpSettings,
    min_magnitude: f64,
    window: FeedWindow,
    bbox: Option<BoundingBox>,
}

impl UsgsEarthquakeSource {
    /// Creates a source for the given magnitude threshold and window.
    #[must_use]
    pub const fn new(
        client: reqwest::Client,
        settings: HttpSettings,
        min_magnitude: f64,
        window: FeedWindow,
    ) -> Self {
        Self {
            client,
            settings,
            min_magnitude,
            window,
            bbox: None,
        }
    }

    /// Restricts epicenters to a bounding box.
    #[must_use]
    pub const fn with_bbox(mut self, bbox: Option<BoundingBox>) -> Self {
        self.bbox = bbox;
        self
    }

    async fn fetch_batch(&self) -> Result<SourceBatch<HazardFeature>, SourceError> {
        let (url, title) = feed_for(self.min_magnitude, self.window);
        let body = retry::send_json(&self.settings, &url, &[], || self.client.get(&url)).await?;
        let (items, dropped) = parse_feed(&body, self.bbox.as_ref())?;

        log::info!(
            "{title}: {} epicenters ({dropped} malformed records dropped)",
            items.len()
        );

        Ok(SourceBatch {
            items,
            dropped,
            title,
            url,
        })
    }
}

#[async_trait]
impl HazardSource for UsgsEarthquakeSource {
    fn tier(&self) -> SourceTier {
        SourceTier::Earthquake
    }

    fn name(&self) -> &str {
        "usgs"
    }

    async fn fetch(&self) -> SourceOutcome<HazardFeature> {
        self.fetch_batch().await.into()
    }
}
