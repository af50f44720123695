//! Great-circle bearing helpers

use thiserror::Error;

use crate::geofence::GeographicPoint;

#[derive(Debug, Error, PartialEq)]
pub enum BearingError {
    /// Bearing between identical points is undefined
    #[error("bearing is undefined between identical points ({latitude}, {longitude})")]
    DegenerateInput { latitude: f64, longitude: f64 },
}

/// Initial great-circle bearing from `from` to `to`, in degrees within [0, 360)
///
/// Uses the spherical formula. Identical points yield `BearingError::DegenerateInput`;
/// callers treat that as "no bearing available" for the leg.
pub fn initial_bearing(from: &GeographicPoint, to: &GeographicPoint) -> Result<f64, BearingError> {
    if from == to {
        return Err(BearingError::DegenerateInput {
            latitude: from.latitude,
            longitude: from.longitude,
        });
    }

    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let dlon = (to.longitude - from.longitude).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    let bearing = (y.atan2(x).to_degrees() + 360.0) % 360.0;
    // (-tiny + 360) % 360 can round to exactly 360.0
    Ok(if bearing >= 360.0 { 0.0 } else { bearing })
}

/// Calculate the angular difference between two headings in degrees
/// Returns the smallest angle between the two headings (0-180 degrees)
pub fn angular_difference(angle1: f64, angle2: f64) -> f64 {
    let diff = (angle1 - angle2).abs() % 360.0;
    if diff > 180.0 { 360.0 - diff } else { diff }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lon: f64) -> GeographicPoint {
        GeographicPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn test_cardinal_bearings() {
        let origin = pt(32.0, 35.0);
        let north = initial_bearing(&origin, &pt(33.0, 35.0)).unwrap();
        let south = initial_bearing(&origin, &pt(31.0, 35.0)).unwrap();
        let east = initial_bearing(&pt(0.0, 35.0), &pt(0.0, 36.0)).unwrap();
        let west = initial_bearing(&pt(0.0, 35.0), &pt(0.0, 34.0)).unwrap();

        assert!(north.abs() < 1e-9);
        assert!((south - 180.0).abs() < 1e-9);
        assert!((east - 90.0).abs() < 1e-9);
        assert!((west - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_bearing_in_range() {
        let a = pt(32.1, 34.8);
        let b = pt(31.9, 34.7);
        let bearing = initial_bearing(&a, &b).unwrap();
        assert!((0.0..360.0).contains(&bearing));
        // Heading south-southwest
        assert!(bearing > 180.0 && bearing < 225.0);
    }

    #[test]
    fn test_identical_points_are_degenerate() {
        let a = pt(32.0, 35.0);
        assert!(matches!(
            initial_bearing(&a, &a),
            Err(BearingError::DegenerateInput { .. })
        ));
    }

    #[test]
    fn test_angular_difference_folds() {
        assert_eq!(angular_difference(10.0, 190.0), 180.0);
        assert_eq!(angular_difference(350.0, 10.0), 20.0);
        assert_eq!(angular_difference(90.0, 90.0), 0.0);
        assert_eq!(angular_difference(0.0, 270.0), 90.0);
    }
}
