//! Collaborator seams for the route planner.
//!
//! The engine only ever consumes coordinates and distance matrices. Where
//! those come from (a geocoding service, a routing backend, a fixture) is
//! decided by whoever implements these traits.

/// Provides a distance matrix for a set of locations.
///
/// The matrix is indexed by the provided location order and holds meters.
pub trait DistanceMatrixProvider {
    fn matrix_for(&self, locations: &[(f64, f64)]) -> Vec<Vec<u32>>;
}

/// Resolves a free-form address into coordinates (lat, lng).
///
/// Returns `None` when the address cannot be resolved. Callers must drop
/// unresolved addresses before building a problem.
pub trait Geocoder {
    fn locate(&self, address: &str) -> Option<(f64, f64)>;
}
