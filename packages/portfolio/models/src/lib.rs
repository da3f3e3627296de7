#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Portfolio asset types.
//!
//! Assets are kept exactly as loaded. An asset with a missing or invalid
//! location, or a negative or non-finite TIV, is never coerced into a
//! valid one; the exposure analyzer excludes it and counts it as skipped.

use leea_hazard_models::LatLon;
use serde::{Deserialize, Serialize};

/// A single insured property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioAsset {
    /// Property identifier, unique within a portfolio.
    pub id: String,
    /// Property location. `None` if the source row had no coordinates.
    pub location: Option<LatLon>,
    /// Total insured value.
    pub tiv: f64,
}

impl PortfolioAsset {
    /// Creates an asset.
    #[must_use]
    pub fn new(id: impl Into<String>, location: Option<LatLon>, tiv: f64) -> Self {
        Self {
            id: id.into(),
            location,
            tiv,
        }
    }

    /// The location, if the asset can take part in analysis.
    #[must_use]
    pub fn analyzable_location(&self) -> Option<LatLon> {
        if !self.tiv.is_finite() || self.tiv < 0.0 {
            return None;
        }
        self.location.filter(LatLon::is_valid)
    }

    /// Whether the asset has a valid location and a non-negative TIV.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.analyzable_location().is_some()
    }
}

/// A loaded portfolio.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    /// Assets in file order.
    pub assets: Vec<PortfolioAsset>,
    /// Rows rejected while loading (unparseable numbers, duplicate IDs).
    pub skipped_rows: usize,
}

impl Portfolio {
    /// Creates a portfolio from already-parsed assets.
    #[must_use]
    pub const fn new(assets: Vec<PortfolioAsset>, skipped_rows: usize) -> Self {
        Self {
            assets,
            skipped_rows,
        }
    }

    /// Number of loaded assets, valid or not.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether no assets were loaded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
