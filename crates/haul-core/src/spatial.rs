//! Spatial math for distance and marker interpolation.

use crate::models::GeoPoint;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Calculate distance between two points in meters (Haversine formula).
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Distance in meters between two points.
pub fn distance_m(a: GeoPoint, b: GeoPoint) -> f64 {
    haversine_distance(a.lat, a.lng, b.lat, b.lng)
}

/// Linear interpolation between two points, `fraction` clamped to [0, 1].
pub fn interpolate(start: GeoPoint, end: GeoPoint, fraction: f64) -> GeoPoint {
    let v = fraction.clamp(0.0, 1.0);
    GeoPoint::new(
        v * end.lat + (1.0 - v) * start.lat,
        v * end.lng + (1.0 - v) * start.lng,
    )
}

/// Evenly spaced points from `start` to `end`, both endpoints included.
pub fn sample_segment(start: GeoPoint, end: GeoPoint, count: usize) -> Vec<GeoPoint> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => (0..count)
            .map(|i| interpolate(start, end, i as f64 / (count - 1) as f64))
            .collect(),
    }
}

/// Fraction of the route completed at `step_index`, in [0, 1].
pub fn route_progress(step_index: usize, route_len: usize) -> f64 {
    if route_len == 0 {
        return 0.0;
    }
    (step_index as f64 / route_len as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_distance() {
        // approx 111km per degree of latitude
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111_195.0).abs() < 1000.0);
    }

    #[test]
    fn test_interpolate_midpoint() {
        let mid = interpolate(GeoPoint::new(0.0, 0.0), GeoPoint::new(2.0, -4.0), 0.5);
        assert!((mid.lat - 1.0).abs() < 1e-12);
        assert!((mid.lng + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_interpolate_clamps() {
        let a = GeoPoint::new(1.0, 1.0);
        let b = GeoPoint::new(2.0, 2.0);
        assert_eq!(interpolate(a, b, -1.0), a);
        assert_eq!(interpolate(a, b, 3.0), b);
    }

    #[test]
    fn test_sample_segment_includes_endpoints() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 1.0);
        let samples = sample_segment(a, b, 5);
        assert_eq!(samples.len(), 5);
        assert_eq!(samples[0], a);
        assert_eq!(samples[4], b);
    }

    #[test]
    fn test_route_progress() {
        assert_eq!(route_progress(0, 0), 0.0);
        assert!((route_progress(3, 10) - 0.3).abs() < 1e-12);
        assert_eq!(route_progress(20, 10), 1.0);
    }
}
