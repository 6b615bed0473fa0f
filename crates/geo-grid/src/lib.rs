//! Geographic Grid Sampling
//!
//! Turns a rectangular bounding box into a deterministic set of sample
//! coordinates for point-by-point risk scanning, plus the great-circle
//! distance used for proximity filtering and sorting.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Earth mean radius in km
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Rectangular map viewport in degrees.
///
/// Callers are expected to pass `north > south` and `east > west`; degenerate
/// boxes are not rejected and simply produce coincident sample points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl GeoBounds {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Inclusive membership check.
    pub fn contains(&self, point: GeoPoint) -> bool {
        point.lat >= self.south
            && point.lat <= self.north
            && point.lng >= self.west
            && point.lng <= self.east
    }
}

/// A single coordinate pair (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Sample `grid_size * grid_size` cell centers inside `bounds`.
///
/// Points are emitted row-major (south to north, west to east within a row)
/// so repeated scans of the same viewport hit identical coordinates.
pub fn sample_grid(bounds: &GeoBounds, grid_size: usize) -> Vec<GeoPoint> {
    let lat_step = (bounds.north - bounds.south) / grid_size as f64;
    let lng_step = (bounds.east - bounds.west) / grid_size as f64;

    let mut points = Vec::with_capacity(grid_size * grid_size);
    for row in 0..grid_size {
        for col in 0..grid_size {
            points.push(GeoPoint {
                lat: bounds.south + lat_step * (row as f64 + 0.5),
                lng: bounds.west + lng_step * (col as f64 + 0.5),
            });
        }
    }
    points
}

/// Haversine distance between two points in km.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1_rad = a.lat * PI / 180.0;
    let lat2_rad = b.lat * PI / 180.0;
    let dlat = (b.lat - a.lat) * PI / 180.0;
    let dlng = (b.lng - a.lng) * PI / 180.0;

    let h = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bangkok_bounds() -> GeoBounds {
        GeoBounds::new(13.9, 13.5, 100.7, 100.3)
    }

    #[test]
    fn test_grid_count_and_containment() {
        let bounds = bangkok_bounds();
        let points = sample_grid(&bounds, 5);
        assert_eq!(points.len(), 25);
        for p in &points {
            assert!(bounds.contains(*p), "point {:?} outside bounds", p);
        }
    }

    #[test]
    fn test_grid_cell_centers() {
        let bounds = GeoBounds::new(2.0, 0.0, 2.0, 0.0);
        let points = sample_grid(&bounds, 2);
        // 2x2 over a 2-degree box: steps of 1.0, centers at 0.5 and 1.5
        assert_eq!(points[0], GeoPoint::new(0.5, 0.5));
        assert_eq!(points[1], GeoPoint::new(0.5, 1.5));
        assert_eq!(points[2], GeoPoint::new(1.5, 0.5));
        assert_eq!(points[3], GeoPoint::new(1.5, 1.5));
    }

    #[test]
    fn test_grid_is_deterministic() {
        let bounds = bangkok_bounds();
        assert_eq!(sample_grid(&bounds, 4), sample_grid(&bounds, 4));
    }

    #[test]
    fn test_degenerate_bounds_coincident_points() {
        let bounds = GeoBounds::new(13.75, 13.75, 100.5, 100.5);
        let points = sample_grid(&bounds, 3);
        assert_eq!(points.len(), 9);
        for p in points {
            assert_eq!(p, GeoPoint::new(13.75, 100.5));
        }
    }

    #[test]
    fn test_haversine() {
        // NYC to London: ~5,570 km
        let nyc = GeoPoint::new(40.7128, -74.0060);
        let london = GeoPoint::new(51.5074, -0.1278);
        let dist = haversine_km(nyc, london);
        assert!((dist - 5570.0).abs() < 50.0, "NYC-London was {} km", dist);
    }

    proptest! {
        #[test]
        fn prop_grid_size_squared(g in 1usize..12, n in -10.0f64..40.0, w in 90.0f64..110.0) {
            let bounds = GeoBounds::new(n + 1.0, n, w + 1.0, w);
            let points = sample_grid(&bounds, g);
            prop_assert_eq!(points.len(), g * g);
            for p in points {
                prop_assert!(bounds.contains(p));
            }
        }

        #[test]
        fn prop_haversine_zero_and_symmetric(
            lat1 in -80.0f64..80.0, lng1 in -179.0f64..179.0,
            lat2 in -80.0f64..80.0, lng2 in -179.0f64..179.0,
        ) {
            let a = GeoPoint::new(lat1, lng1);
            let b = GeoPoint::new(lat2, lng2);
            prop_assert!(haversine_km(a, a) < 1e-6);
            let ab = haversine_km(a, b);
            let ba = haversine_km(b, a);
            prop_assert!((ab - ba).abs() < 1e-6);
        }
    }
}
