#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hazard region construction and containment lookups.
//!
//! [`build_region`] turns the features selected for a cycle into a single
//! [`HazardRegion`]: point hazards are buffered into disks whose radius
//! comes from [`BufferTiers`], native polygons are used as-is, and all
//! contributions are dissolved with a boolean union. [`RegionIndex`] puts
//! the parts of a region into an R-tree for fast inclusive
//! point-in-region tests during exposure analysis.

pub mod disk;
pub mod tiers;

use geo::{BooleanOps as _, BoundingRect as _, GeodesicArea as _, Intersects as _, MultiPolygon};
use leea_hazard_models::{HazardFeature, HazardGeometry, LatLon, SourceTier};
use rstar::{AABB, RTree, RTreeObject};

pub use tiers::{BufferTier, BufferTiers, TierConfigError};

/// The unioned area considered at risk for one cycle.
///
/// Immutable once built. Rebuilding produces a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct HazardRegion {
    geometry: MultiPolygon<f64>,
    source_used: SourceTier,
    feature_count: usize,
}

impl HazardRegion {
    /// The unioned geometry (`x` = longitude, `y` = latitude).
    #[must_use]
    pub const fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    /// The tier whose features built this region.
    #[must_use]
    pub const fn source_used(&self) -> SourceTier {
        self.source_used
    }

    /// Number of features merged into the region.
    #[must_use]
    pub const fn feature_count(&self) -> usize {
        self.feature_count
    }

    /// Number of disjoint parts.
    #[must_use]
    pub fn part_count(&self) -> usize {
        self.geometry.0.len()
    }

    /// Geodesic area in square kilometres.
    #[must_use]
    pub fn area_km2(&self) -> f64 {
        self.geometry.geodesic_area_unsigned() / 1_000_000.0
    }

    /// Inclusive containment: points on the boundary count as inside.
    #[must_use]
    pub fn contains(&self, location: LatLon) -> bool {
        self.geometry
            .intersects(&geo::Point::new(location.lon, location.lat))
    }

    /// Exports the region as a `GeoJSON` feature.
    #[must_use]
    pub fn to_geojson_feature(&self) -> geojson::Feature {
        let mut properties = geojson::JsonObject::new();
        properties.insert(
            "source".to_string(),
            serde_json::Value::from(self.source_used.as_ref()),
        );
        properties.insert(
            "featureCount".to_string(),
            serde_json::Value::from(self.feature_count),
        );
        geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&self.geometry))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

/// Converts one feature into its area contribution.
#[must_use]
pub fn feature_shape(feature: &HazardFeature, tiers: &BufferTiers) -> MultiPolygon<f64> {
    match feature.geometry() {
        HazardGeometry::Point {
            location,
            magnitude,
        } => disk::disk_shape(*location, tiers.radius_km(*magnitude)),
        HazardGeometry::Polygon { .. } => {
            MultiPolygon(feature.geometry().to_polygon().into_iter().collect())
        }
    }
}

/// Builds the hazard region for a single tier's features.
///
/// Returns `None` when there is nothing to contribute; an empty region is
/// never produced.
#[must_use]
pub fn build_region(features: &[HazardFeature], tiers: &BufferTiers) -> Option<HazardRegion> {
    let source_used = features.first()?.source();
    if features.iter().any(|f| f.source() != source_used) {
        log::warn!("Building region from mixed tiers; labelling it as {source_used}");
    }

    let geometry = features
        .iter()
        .map(|feature| feature_shape(feature, tiers))
        .reduce(|acc, shape| acc.union(&shape))?;

    if geometry.0.is_empty() {
        return None;
    }

    let region = HazardRegion {
        geometry,
        source_used,
        feature_count: features.len(),
    };
    log::info!(
        "Built {} hazard region from {} features ({} parts, {:.0} km²)",
        region.source_used.label(),
        region.feature_count,
        region.part_count(),
        region.area_km2(),
    );
    Some(region)
}

/// One disjoint part of a region stored in the R-tree.
struct RegionPart {
    envelope: AABB<[f64; 2]>,
    polygon: geo::Polygon<f64>,
}

impl RTreeObject for RegionPart {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree over the parts of a [`HazardRegion`].
///
/// Built once per analysis and queried per asset. Equivalent to
/// [`HazardRegion::contains`] but skips parts whose bounding box cannot
/// hold the point.
pub struct RegionIndex {
    parts: RTree<RegionPart>,
}

impl RegionIndex {
    /// Indexes every part of `region`.
    #[must_use]
    pub fn new(region: &HazardRegion) -> Self {
        let parts = region
            .geometry()
            .0
            .iter()
            .filter_map(|polygon| {
                let rect = polygon.bounding_rect()?;
                Some(RegionPart {
                    envelope: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                    polygon: polygon.clone(),
                })
            })
            .collect();

        Self {
            parts: RTree::bulk_load(parts),
        }
    }

    /// Inclusive point-in-region test.
    #[must_use]
    pub fn contains(&self, location: LatLon) -> bool {
        let point = geo::Point::new(location.lon, location.lat);
        let query_env = AABB::from_point([location.lon, location.lat]);

        self.parts
            .locate_in_envelope_intersecting(&query_env)
            .any(|part| part.polygon.intersects(&point))
    }
}
