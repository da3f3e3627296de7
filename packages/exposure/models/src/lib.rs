#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Exposure report types.
//!
//! An [`ExposureReport`] is built once per cycle and never mutated. Its
//! counts and sums satisfy `exposed <= total`, and
//! [`ExposureReport::exposure_ratio`] is `None` exactly when `total_tiv`
//! is zero.

use leea_hazard_models::{LatLon, SourceTier};
use serde::{Deserialize, Serialize};

/// An asset inside the hazard region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposedAsset {
    /// Property identifier.
    pub id: String,
    /// Property location.
    pub location: LatLon,
    /// Total insured value.
    pub tiv: f64,
}

/// Latitude/longitude extent of a set of positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    /// Southernmost latitude.
    pub min_lat: f64,
    /// Westernmost longitude.
    pub min_lon: f64,
    /// Northernmost latitude.
    pub max_lat: f64,
    /// Easternmost longitude.
    pub max_lon: f64,
}

impl Bounds {
    /// Smallest bounds covering every position, or `None` if empty.
    #[must_use]
    pub fn covering(positions: impl IntoIterator<Item = LatLon>) -> Option<Self> {
        positions.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => Self {
                    min_lat: p.lat,
                    min_lon: p.lon,
                    max_lat: p.lat,
                    max_lon: p.lon,
                },
                Some(b) => Self {
                    min_lat: b.min_lat.min(p.lat),
                    min_lon: b.min_lon.min(p.lon),
                    max_lat: b.max_lat.max(p.lat),
                    max_lon: b.max_lon.max(p.lon),
                },
            })
        })
    }
}

/// Aggregate and per-asset exposure for one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureReport {
    /// Tier that built the hazard region; `None` when there was no region.
    pub source_used: Option<SourceTier>,
    /// Features merged into the region.
    pub feature_count: usize,
    /// Geodesic region area in square kilometres.
    pub region_area_km2: Option<f64>,
    /// Valid assets considered.
    pub total_assets: usize,
    /// Valid assets inside the region.
    pub exposed_assets: usize,
    /// Assets or rows excluded from analysis.
    pub skipped_assets: usize,
    /// TIV summed over valid assets.
    pub total_tiv: f64,
    /// TIV summed over exposed assets.
    pub exposed_tiv: f64,
    /// `exposed_tiv / total_tiv`, or `None` when `total_tiv` is zero.
    pub exposure_ratio: Option<f64>,
    /// Exposed assets by descending TIV, ties by ascending ID, capped.
    pub top_exposed: Vec<ExposedAsset>,
    /// Extent of every exposed asset.
    pub exposed_bounds: Option<Bounds>,
}

impl ExposureReport {
    /// Whether any asset is exposed.
    #[must_use]
    pub const fn has_exposure(&self) -> bool {
        self.exposed_assets > 0
    }

    /// IDs of the top exposed assets in order.
    #[must_use]
    pub fn top_exposed_ids(&self) -> Vec<&str> {
        self.top_exposed.iter().map(|a| a.id.as_str()).collect()
    }

    /// Exposure ratio as a percentage.
    #[must_use]
    pub fn exposure_percent(&self) -> Option<f64> {
        self.exposure_ratio.map(|r| r * 100.0)
    }
}

/// `exposed / total`, or `None` when `total` is zero.
#[must_use]
pub fn exposure_ratio(exposed_tiv: f64, total_tiv: f64) -> Option<f64> {
    if total_tiv > 0.0 {
        Some(exposed_tiv / total_tiv)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_is_none_only_for_zero_total() {
        assert_eq!(exposure_ratio(0.0, 0.0), None);
        assert_eq!(exposure_ratio(0.0, 10.0), Some(0.0));
        assert_eq!(exposure_ratio(2.5, 10.0), Some(0.25));
    }

    #[test]
    fn bounds_cover_all_positions() {
        let bounds = Bounds::covering([
            LatLon::new(27.0, -82.0),
            LatLon::new(25.5, -80.0),
            LatLon::new(26.0, -81.5),
        ])
        .unwrap();
        assert!((bounds.min_lat - 25.5).abs() < f64::EPSILON);
        assert!((bounds.max_lat - 27.0).abs() < f64::EPSILON);
        assert!((bounds.min_lon + 82.0).abs() < f64::EPSILON);
        assert!((bounds.max_lon + 80.0).abs() < f64::EPSILON);
        assert!(Bounds::covering([]).is_none());
    }

    #[test]
    fn serializes_camel_case() {
        let report = ExposureReport {
            source_used: Some(SourceTier::Earthquake),
            feature_count: 1,
            region_area_km2: None,
            total_assets: 0,
            exposed_assets: 0,
            skipped_assets: 0,
            total_tiv: 0.0,
            exposed_tiv: 0.0,
            exposure_ratio: None,
            top_exposed: vec![],
            exposed_bounds: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["sourceUsed"], "earthquake");
        assert!(json["exposureRatio"].is_null());
        assert_eq!(json["totalAssets"], 0);
    }
}
