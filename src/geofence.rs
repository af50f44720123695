//! Geofence model
//!
//! The geofence is a protected (core) polygon, a ring buffered around it by a fixed
//! distance, and one auxiliary polygon unioned into the buffer:
//!
//! `watch_area = union(buffer(core, distance), auxiliary)`
//!
//! The buffer distance is converted from kilometres to degrees with a flat
//! 111 km/degree approximation. This is only acceptable while the protected area
//! spans a modest range of latitudes; do not reuse it for continent-sized regions.
//!
//! Containment uses `geo::Contains`, which excludes points lying exactly on a
//! boundary. Both predicates follow the same rule.

use geo::{BooleanOps, Buffer, Contains, Coord, LineString, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kilometres per degree of latitude used for the buffer approximation
pub const KM_PER_DEGREE: f64 = 111.0;

#[derive(Debug, Error, PartialEq)]
pub enum GeofenceError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("invalid coordinate: lat={latitude}, lon={longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
}

/// A WGS84 position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeographicPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeographicPoint {
    /// Create a point, rejecting non-finite or out-of-range coordinates
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeofenceError> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        if !valid {
            return Err(GeofenceError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    fn to_geo(self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// Convert a (lat, lon) ring into a `geo` polygon (x = lon, y = lat)
fn ring_to_polygon(name: &str, ring: &[GeographicPoint]) -> Result<Polygon<f64>, GeofenceError> {
    let mut distinct: Vec<GeographicPoint> = Vec::with_capacity(ring.len());
    for point in ring {
        if !distinct.contains(point) {
            distinct.push(*point);
        }
    }
    if distinct.len() < 3 {
        return Err(GeofenceError::InvalidGeometry(format!(
            "{} ring needs at least 3 distinct vertices, got {}",
            name,
            distinct.len()
        )));
    }

    let coords: Vec<Coord<f64>> = ring
        .iter()
        .map(|p| Coord {
            x: p.longitude,
            y: p.latitude,
        })
        .collect();

    // Polygon::new closes the ring if the caller left it open
    Ok(Polygon::new(LineString::from(coords), vec![]))
}

/// Derived, immutable geofence built once at startup
#[derive(Debug, Clone)]
pub struct Geofence {
    core: Polygon<f64>,
    watch_area: MultiPolygon<f64>,
    buffer_degrees: f64,
}

impl Geofence {
    /// Build the geofence from the protected area, a buffer distance in kilometres,
    /// and the auxiliary extension polygon
    pub fn build(
        protected_area: &[GeographicPoint],
        buffer_km: f64,
        auxiliary_area: &[GeographicPoint],
    ) -> Result<Self, GeofenceError> {
        if !buffer_km.is_finite() || buffer_km <= 0.0 {
            return Err(GeofenceError::InvalidGeometry(format!(
                "buffer distance must be positive, got {} km",
                buffer_km
            )));
        }

        let core = ring_to_polygon("protected area", protected_area)?;
        let auxiliary = ring_to_polygon("auxiliary area", auxiliary_area)?;

        let buffer_degrees = buffer_km / KM_PER_DEGREE;
        let buffered: MultiPolygon<f64> = core.buffer(buffer_degrees);
        let watch_area = buffered.union(&MultiPolygon::new(vec![auxiliary]));

        Ok(Self {
            core,
            watch_area,
            buffer_degrees,
        })
    }

    /// Whether the point lies strictly inside the protected area
    pub fn inside_core(&self, point: &GeographicPoint) -> bool {
        self.core.contains(&point.to_geo())
    }

    /// Whether the point lies strictly inside the buffered watch area (buffer ∪ auxiliary)
    pub fn inside_watch_area(&self, point: &GeographicPoint) -> bool {
        self.watch_area.contains(&point.to_geo())
    }

    /// Buffer distance actually applied, in degrees
    pub fn buffer_degrees(&self) -> f64 {
        self.buffer_degrees
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lon: f64) -> GeographicPoint {
        GeographicPoint::new(lat, lon).unwrap()
    }

    // 1°x1° square at the origin, plus an auxiliary square far to the east
    fn test_geofence() -> Geofence {
        let core = vec![pt(0.0, 0.0), pt(0.0, 1.0), pt(1.0, 1.0), pt(1.0, 0.0), pt(0.0, 0.0)];
        let aux = vec![pt(0.0, 5.0), pt(0.0, 6.0), pt(1.0, 6.0), pt(1.0, 5.0)];
        Geofence::build(&core, 111.0, &aux).unwrap()
    }

    #[test]
    fn test_rejects_degenerate_ring() {
        let core = vec![pt(0.0, 0.0), pt(0.0, 1.0), pt(0.0, 0.0)];
        let aux = vec![pt(0.0, 5.0), pt(0.0, 6.0), pt(1.0, 6.0)];
        let result = Geofence::build(&core, 200.0, &aux);
        assert!(matches!(result, Err(GeofenceError::InvalidGeometry(_))));
    }

    #[test]
    fn test_rejects_non_positive_buffer() {
        let core = vec![pt(0.0, 0.0), pt(0.0, 1.0), pt(1.0, 1.0)];
        let aux = vec![pt(0.0, 5.0), pt(0.0, 6.0), pt(1.0, 6.0)];
        assert!(Geofence::build(&core, 0.0, &aux).is_err());
        assert!(Geofence::build(&core, f64::NAN, &aux).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_coordinate() {
        assert!(GeographicPoint::new(91.0, 0.0).is_err());
        assert!(GeographicPoint::new(0.0, -180.5).is_err());
        assert!(GeographicPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeographicPoint::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn test_buffer_uses_flat_approximation() {
        let geofence = test_geofence();
        assert!((geofence.buffer_degrees() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_core_point() {
        let geofence = test_geofence();
        let p = pt(0.5, 0.5);
        assert!(geofence.inside_core(&p));
        assert!(geofence.inside_watch_area(&p));
    }

    #[test]
    fn test_buffer_only_point() {
        let geofence = test_geofence();
        // 0.5° north of the core, inside the 1° buffer
        let p = pt(1.5, 0.5);
        assert!(!geofence.inside_core(&p));
        assert!(geofence.inside_watch_area(&p));
    }

    #[test]
    fn test_auxiliary_point() {
        let geofence = test_geofence();
        let p = pt(0.5, 5.5);
        assert!(!geofence.inside_core(&p));
        assert!(geofence.inside_watch_area(&p));
    }

    #[test]
    fn test_outside_everything() {
        let geofence = test_geofence();
        let p = pt(0.5, 3.5);
        assert!(!geofence.inside_core(&p));
        assert!(!geofence.inside_watch_area(&p));
    }

    #[test]
    fn test_core_boundary_excluded() {
        let geofence = test_geofence();
        let p = pt(0.0, 0.5);
        assert!(!geofence.inside_core(&p));
        assert!(geofence.inside_watch_area(&p));
    }

    #[test]
    fn test_core_implies_watch_area() {
        let geofence = test_geofence();
        for i in -30..=80 {
            for j in -30..=80 {
                let p = pt(i as f64 * 0.1, j as f64 * 0.1);
                if geofence.inside_core(&p) {
                    assert!(geofence.inside_watch_area(&p), "{:?}", p);
                }
            }
        }
    }
}
