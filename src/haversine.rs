//! Haversine distance model.
//!
//! Uses great-circle distance scaled by a fixed tortuosity factor as a crude
//! stand-in for street routing. Less accurate than a road network but always
//! available and deterministic.

use crate::traits::DistanceMatrixProvider;

/// Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Streets are not straight lines; straight-line meters are scaled by this.
pub const TORTUOSITY_FACTOR: f64 = 1.3;

/// Estimated travel distance in meters between two (lat, lng) points.
///
/// Symmetric, zero for identical points, never fails. Fractional meters are
/// truncated.
pub fn distance(from: (f64, f64), to: (f64, f64)) -> u32 {
    (great_circle_m(from, to) * TORTUOSITY_FACTOR) as u32
}

/// Unscaled great-circle distance in meters.
pub fn great_circle_m(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lng1) = from;
    let (lat2, lng2) = to;

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    // Rounding can push `a` past 1.0 for antipodal points.
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Haversine-based distance matrix provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct HaversineMatrix;

impl DistanceMatrixProvider for HaversineMatrix {
    fn matrix_for(&self, locations: &[(f64, f64)]) -> Vec<Vec<u32>> {
        let n = locations.len();
        let mut matrix = vec![vec![0; n]; n];

        for (i, from) in locations.iter().enumerate() {
            for (j, to) in locations.iter().enumerate() {
                if i != j {
                    matrix[i][j] = distance(*from, *to);
                }
            }
        }

        matrix
    }
}
