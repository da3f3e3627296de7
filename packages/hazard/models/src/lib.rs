#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hazard feature types shared by every hazard source.
//!
//! Each source adapter (USGS earthquakes, NWS alerts, `NewsAPI`) produces
//! values from this crate. A [`HazardFeature`] is either a point epicenter
//! carrying a magnitude or a ready-made affected-area polygon; the two are
//! kept apart by the [`HazardGeometry`] variant rather than by inspecting
//! geometry at runtime.
//!
//! Features are validated on construction. Invalid coordinates, non-finite
//! magnitudes, and broken polygon rings are rejected with a
//! [`GeometryError`] so adapters can drop the single record and move on.

use chrono::{DateTime, Utc};
use geo::{Area as _, Coord, Intersects as _, Line, LineString, Polygon};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Reasons a hazard geometry is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// A latitude or longitude is NaN or infinite.
    #[error("non-finite coordinate ({lat}, {lon})")]
    NonFiniteCoordinate {
        /// Latitude as received.
        lat: f64,
        /// Longitude as received.
        lon: f64,
    },

    /// A coordinate lies outside the WGS84 range.
    #[error("coordinate out of range ({lat}, {lon})")]
    OutOfRange {
        /// Latitude as received.
        lat: f64,
        /// Longitude as received.
        lon: f64,
    },

    /// The magnitude of a point hazard is NaN or infinite.
    #[error("non-finite magnitude {0}")]
    NonFiniteMagnitude(f64),

    /// The ring has fewer than three distinct vertices.
    #[error("polygon ring has {distinct} distinct vertices, need at least 3")]
    TooFewVertices {
        /// Number of distinct vertices found.
        distinct: usize,
    },

    /// Two non-adjacent edges of the ring cross or touch.
    #[error("polygon ring is self-intersecting")]
    SelfIntersecting,

    /// All vertices are collinear.
    #[error("polygon ring encloses no area")]
    ZeroArea,
}

/// A hazard source tier, listed in fallback priority order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceTier {
    /// USGS earthquake catalog (point epicenters with magnitudes).
    Earthquake,
    /// NWS active alerts (native polygons).
    Alert,
    /// Keyword-matched news coverage (no geometry).
    News,
}

impl SourceTier {
    /// All tiers, most trusted first.
    pub const PRIORITY: [Self; 3] = [Self::Earthquake, Self::Alert, Self::News];

    /// Whether this tier can contribute geometry to a hazard region.
    #[must_use]
    pub const fn is_geospatial(self) -> bool {
        matches!(self, Self::Earthquake | Self::Alert)
    }

    /// Human-readable name used in logs and briefings.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Earthquake => "Earthquakes",
            Self::Alert => "NWS Alerts",
            Self::News => "News",
        }
    }
}

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl LatLon {
    /// Creates a position without validating it.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Checks that both components are finite and within range.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::NonFiniteCoordinate`] or
    /// [`GeometryError::OutOfRange`].
    pub fn validate(&self) -> Result<(), GeometryError> {
        if !self.lat.is_finite() || !self.lon.is_finite() {
            return Err(GeometryError::NonFiniteCoordinate {
                lat: self.lat,
                lon: self.lon,
            });
        }
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lon) {
            return Err(GeometryError::OutOfRange {
                lat: self.lat,
                lon: self.lon,
            });
        }
        Ok(())
    }

    /// Whether [`Self::validate`] would succeed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Converts to a `geo` coordinate (`x` = longitude, `y` = latitude).
    #[must_use]
    pub const fn to_coord(self) -> Coord<f64> {
        Coord {
            x: self.lon,
            y: self.lat,
        }
    }
}

/// Geometry of a single hazard feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HazardGeometry {
    /// An epicenter; the affected area is derived from the magnitude.
    Point {
        /// Epicenter location.
        location: LatLon,
        /// Unitless severity scalar.
        magnitude: f64,
    },
    /// An affected area given directly by the source.
    ///
    /// Stored as an open ring (the closing vertex is not repeated).
    Polygon {
        /// Ring vertices in order.
        ring: Vec<LatLon>,
    },
}

impl HazardGeometry {
    /// Converts a polygon ring into a `geo` polygon. Returns `None` for points.
    #[must_use]
    pub fn to_polygon(&self) -> Option<Polygon<f64>> {
        match self {
            Self::Point { .. } => None,
            Self::Polygon { ring } => Some(ring_polygon(ring)),
        }
    }
}

/// A single unit of hazard information from one source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardFeature {
    source: SourceTier,
    geometry: HazardGeometry,
    observed_at: DateTime<Utc>,
    raw_severity: Option<String>,
    label: Option<String>,
    url: Option<String>,
}

impl HazardFeature {
    /// Creates a point hazard.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if the location is invalid or the magnitude
    /// is not finite.
    pub fn point(
        source: SourceTier,
        location: LatLon,
        magnitude: f64,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, GeometryError> {
        location.validate()?;
        if !magnitude.is_finite() {
            return Err(GeometryError::NonFiniteMagnitude(magnitude));
        }
        Ok(Self {
            source,
            geometry: HazardGeometry::Point {
                location,
                magnitude,
            },
            observed_at,
            raw_severity: None,
            label: None,
            url: None,
        })
    }

    /// Creates a polygon hazard from a ring of vertices.
    ///
    /// The ring may be given open or closed. Consecutive duplicate vertices
    /// are collapsed; nothing else is repaired.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] if any vertex is invalid, fewer than three
    /// distinct vertices remain, the ring crosses itself, or it encloses no
    /// area.
    pub fn polygon(
        source: SourceTier,
        ring: Vec<LatLon>,
        observed_at: DateTime<Utc>,
    ) -> Result<Self, GeometryError> {
        let ring = normalize_ring(ring)?;
        Ok(Self {
            source,
            geometry: HazardGeometry::Polygon { ring },
            observed_at,
            raw_severity: None,
            label: None,
            url: None,
        })
    }

    /// Attaches a display-only severity label.
    #[must_use]
    pub fn with_severity(mut self, severity: Option<String>) -> Self {
        self.raw_severity = severity;
        self
    }

    /// Attaches a headline (place name, alert event).
    #[must_use]
    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }

    /// Attaches a link to the source's event page.
    #[must_use]
    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }

    /// The tier that produced this feature.
    #[must_use]
    pub const fn source(&self) -> SourceTier {
        self.source
    }

    /// The feature geometry.
    #[must_use]
    pub const fn geometry(&self) -> &HazardGeometry {
        &self.geometry
    }

    /// When the underlying event was observed.
    #[must_use]
    pub const fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    /// Source severity label, if any.
    #[must_use]
    pub fn raw_severity(&self) -> Option<&str> {
        self.raw_severity.as_deref()
    }

    /// Headline, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Event page link, if any.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Magnitude of a point hazard; `None` for polygons.
    #[must_use]
    pub const fn magnitude(&self) -> Option<f64> {
        match self.geometry {
            HazardGeometry::Point { magnitude, .. } => Some(magnitude),
            HazardGeometry::Polygon { .. } => None,
        }
    }
}

/// A news article used for narrative context. Carries no geometry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    /// Headline.
    pub title: String,
    /// Link to the article.
    pub url: Option<String>,
    /// Publisher name.
    pub source: Option<String>,
    /// Publication time.
    pub published_at: Option<DateTime<Utc>>,
    /// Short summary.
    pub description: Option<String>,
}

fn ring_polygon(ring: &[LatLon]) -> Polygon<f64> {
    let coords: Vec<Coord<f64>> = ring.iter().map(|p| p.to_coord()).collect();
    Polygon::new(LineString::new(coords), vec![])
}

/// Validates a ring and returns it open, with consecutive duplicates removed.
fn normalize_ring(ring: Vec<LatLon>) -> Result<Vec<LatLon>, GeometryError> {
    for vertex in &ring {
        vertex.validate()?;
    }

    let mut open: Vec<LatLon> = Vec::with_capacity(ring.len());
    for vertex in ring {
        if open.last() != Some(&vertex) {
            open.push(vertex);
        }
    }
    while open.len() > 1 && open.first() == open.last() {
        open.pop();
    }

    let distinct = {
        let mut seen: Vec<LatLon> = Vec::with_capacity(open.len());
        for vertex in &open {
            if !seen.contains(vertex) {
                seen.push(*vertex);
            }
        }
        seen.len()
    };
    if distinct < 3 {
        return Err(GeometryError::TooFewVertices { distinct });
    }
    if distinct != open.len() {
        // A repeated non-consecutive vertex pinches the ring.
        return Err(GeometryError::SelfIntersecting);
    }

    let n = open.len();
    let edges: Vec<Line<f64>> = (0..n)
        .map(|i| Line::new(open[i].to_coord(), open[(i + 1) % n].to_coord()))
        .collect();
    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            if edges[i].intersects(&edges[j]) {
                return Err(GeometryError::SelfIntersecting);
            }
        }
    }

    if ring_polygon(&open).unsigned_area() <= 0.0 {
        return Err(GeometryError::ZeroArea);
    }

    Ok(open)
}
