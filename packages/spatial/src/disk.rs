//! Disk polygons around point hazards.
//!
//! A buffer of `r` km around `(φ, λ)` is drawn in a local equirectangular
//! frame: one kilometre north is `1 / R` radians of latitude everywhere,
//! while one kilometre east is `1 / (R cos φ)` radians of longitude. A
//! circle drawn directly in degrees would be squashed east-west by
//! `cos φ`, which at 60° already halves its true width.
//!
//! # Error bound
//!
//! * Polygonization: the ring has [`DISK_SEGMENTS`] vertices placed on a
//!   circle of radius `r / cos(π / n)`, so the polygon circumscribes the
//!   true circle. It never cuts into the disk and overshoots by at most
//!   `1 / cos(π / 64) - 1 ≈ 0.12 %` of `r`.
//! * Projection: holding `cos φ` at the centre latitude ignores its
//!   variation across the disk. The resulting east-west error is about
//!   `(r / R) · tan φ` relative, i.e. under 2 % for `r ≤ 200 km` below
//!   `|φ| = 70°`. Closer to the poles `cos φ` is clamped to
//!   [`MIN_COS_LATITUDE`] so the longitude span stays finite, and the
//!   disk becomes a coarse over-approximation.
//! * [`disk_polygon`] itself does not wrap longitudes. [`disk_shape`]
//!   splits a disk that crosses ±180° into parts on both sides of the
//!   antimeridian, all within `[-180, 180]`.

use std::f64::consts::PI;

use geo::{
    BooleanOps as _, BoundingRect as _, Coord, LineString, MapCoords as _, MultiPolygon, Polygon,
    Rect,
};
use leea_hazard_models::LatLon;

/// Mean Earth radius in kilometres (IUGG).
pub const EARTH_RADIUS_KM: f64 = 6_371.008_8;

/// Number of vertices in a disk ring.
pub const DISK_SEGMENTS: usize = 64;

/// Lower clamp for `cos φ` near the poles.
pub const MIN_COS_LATITUDE: f64 = 0.01;

/// Builds a polygon covering every point within `radius_km` of `center`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn disk_polygon(center: LatLon, radius_km: f64) -> Polygon<f64> {
    let segments = DISK_SEGMENTS as f64;
    let circumscribe = 1.0 / (PI / segments).cos();
    let lat_span = (radius_km / EARTH_RADIUS_KM * circumscribe).to_degrees();
    let cos_lat = center.lat.to_radians().cos().max(MIN_COS_LATITUDE);
    let lon_span = lat_span / cos_lat;

    let coords: Vec<Coord<f64>> = (0..DISK_SEGMENTS)
        .map(|i| {
            let theta = 2.0 * PI * (i as f64) / segments;
            Coord {
                x: center.lon + lon_span * theta.cos(),
                y: (center.lat + lat_span * theta.sin()).clamp(-90.0, 90.0),
            }
        })
        .collect();

    Polygon::new(LineString::new(coords), vec![])
}

/// Builds the disk around `center` as one or more parts inside the
/// `[-180, 180]` longitude range.
///
/// A disk that reaches past ±180° is copied one turn east and west, and
/// every copy is clipped to the valid range, so the pieces on the far side
/// of the antimeridian are kept.
#[must_use]
pub fn disk_shape(center: LatLon, radius_km: f64) -> MultiPolygon<f64> {
    let disk = disk_polygon(center, radius_km);
    let crosses = disk
        .bounding_rect()
        .is_some_and(|rect| rect.min().x < -180.0 || rect.max().x > 180.0);
    if !crosses {
        return MultiPolygon(vec![disk]);
    }

    let world = MultiPolygon(vec![
        Rect::new(Coord { x: -180.0, y: -90.0 }, Coord { x: 180.0, y: 90.0 }).to_polygon(),
    ]);
    [-360.0, 0.0, 360.0]
        .into_iter()
        .map(|shift| {
            let copy = disk.map_coords(|c| Coord {
                x: c.x + shift,
                y: c.y,
            });
            MultiPolygon(vec![copy]).intersection(&world)
        })
        .reduce(|acc, part| acc.union(&part))
        .unwrap_or_else(|| MultiPolygon(vec![]))
}

/// Offsets `origin` by a true ground distance east and north, using the
/// same local frame as [`disk_polygon`].
#[must_use]
pub fn offset_km(origin: LatLon, east_km: f64, north_km: f64) -> LatLon {
    let cos_lat = origin.lat.to_radians().cos().max(MIN_COS_LATITUDE);
    LatLon::new(
        origin.lat + (north_km / EARTH_RADIUS_KM).to_degrees(),
        origin.lon + (east_km / (EARTH_RADIUS_KM * cos_lat)).to_degrees(),
    )
}

#[cfg(test)]
mod tests {
    use geo::{Area as _, Intersects as _, Point};

    use super::*;

    fn covers(polygon: &Polygon<f64>, at: LatLon) -> bool {
        polygon.intersects(&Point::new(at.lon, at.lat))
    }

    #[test]
    fn ring_has_expected_vertex_count() {
        let disk = disk_polygon(LatLon::new(10.0, 20.0), 50.0);
        // Closed by `Polygon::new`.
        assert_eq!(disk.exterior().0.len(), DISK_SEGMENTS + 1);
    }

    #[test]
    fn covers_points_just_inside_radius_in_every_direction() {
        let center = LatLon::new(60.0, 10.0);
        let disk = disk_polygon(center, 100.0);
        for (east, north) in [(99.0, 0.0), (-99.0, 0.0), (0.0, 99.0), (0.0, -99.0), (69.0, 69.0)] {
            assert!(covers(&disk, offset_km(center, east, north)), "({east}, {north})");
        }
    }

    #[test]
    fn excludes_points_beyond_radius() {
        let center = LatLon::new(60.0, 10.0);
        let disk = disk_polygon(center, 100.0);
        for (east, north) in [(103.0, 0.0), (0.0, -103.0), (75.0, 75.0)] {
            assert!(!covers(&disk, offset_km(center, east, north)), "({east}, {north})");
        }
    }

    #[test]
    fn widens_in_longitude_with_latitude() {
        let equator = disk_polygon(LatLon::new(0.0, 0.0), 75.0);
        let north = disk_polygon(LatLon::new(60.0, 0.0), 75.0);
        // Degree-space area doubles at 60° because cos(60°) = 0.5.
        let ratio = north.unsigned_area() / equator.unsigned_area();
        assert!((ratio - 2.0).abs() < 1e-6, "ratio = {ratio}");
    }

    #[test]
    fn splits_at_the_antimeridian() {
        let center = LatLon::new(-17.0, 179.9);
        let shape = disk_shape(center, 75.0);
        assert_eq!(shape.0.len(), 2);
        assert!(
            shape
                .0
                .iter()
                .flat_map(|p| p.exterior().coords())
                .all(|c| c.x.abs() <= 180.0 + 1e-9)
        );

        let hits = |at: LatLon| shape.intersects(&Point::new(at.lon, at.lat));
        assert!(hits(LatLon::new(-17.0, 179.95)));
        assert!(hits(LatLon::new(-17.0, -179.95)));
        assert!(!hits(LatLon::new(-17.0, -178.0)));

        let unsplit = disk_polygon(LatLon::new(-17.0, 0.0), 75.0).unsigned_area();
        assert!((shape.unsigned_area() - unsplit).abs() / unsplit < 1e-6);
    }

    #[test]
    fn leaves_disks_away_from_the_antimeridian_whole() {
        let center = LatLon::new(35.0, -120.0);
        let shape = disk_shape(center, 200.0);
        assert_eq!(shape.0, vec![disk_polygon(center, 200.0)]);
    }

    #[test]
    fn stays_finite_at_the_pole() {
        let disk = disk_polygon(LatLon::new(90.0, 0.0), 200.0);
        assert!(
            disk.exterior()
                .coords()
                .all(|c| c.x.is_finite() && c.y.is_finite() && c.y <= 90.0)
        );
    }
}
