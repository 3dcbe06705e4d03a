//! Unoptimized reference tour.
//!
//! Visiting stops in the order they were entered and returning to the depot
//! is what a driver would do without planning. The optimized total is
//! reported against it; it never feeds back into the search.

use crate::haversine::distance;
use crate::problem::DistanceMatrix;
use crate::stops::Stop;

/// Length of the tour stops[0] → stops[1] → … → stops[n-1] → stops[0].
///
/// Returns 0 for fewer than 2 stops.
pub fn baseline_cost(stops: &[Stop]) -> u64 {
    if stops.len() < 2 {
        return 0;
    }

    let legs: u64 = stops
        .windows(2)
        .map(|pair| u64::from(distance(pair[0].coords(), pair[1].coords())))
        .sum();
    let back = distance(stops[stops.len() - 1].coords(), stops[0].coords());

    legs + u64::from(back)
}

/// Same tour as [`baseline_cost`], measured on a prebuilt matrix.
pub fn sequential_cost(matrix: &DistanceMatrix) -> u64 {
    if matrix.len() < 2 {
        return 0;
    }
    let order: Vec<usize> = (1..matrix.len()).collect();
    matrix.tour_length(0, &order)
}
