//! Problem construction: distance matrix, demand vector and fleet.

use std::fmt;

use crate::haversine::HaversineMatrix;
use crate::stops::Stop;
use crate::traits::DistanceMatrixProvider;

/// Input rejected before any computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// No stops at all; not even a depot.
    NoStops,
    /// A solve was requested with only the depot.
    TooFewStops { found: usize },
    NoVehicles,
    ZeroCapacity { vehicle: usize },
    InvalidCoordinate { index: usize },
    /// Matrix is not `expected` × `expected`.
    MatrixShape { expected: usize },
    /// A location is not at distance 0 from itself.
    NonZeroDiagonal { index: usize },
    /// Demand vector length differs from the matrix size, or the depot has demand.
    DemandShape { expected: usize, found: usize },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::NoStops => write!(f, "no stops given; the first stop must be the depot"),
            InputError::TooFewStops { found } => write!(
                f,
                "at least 2 stops (depot + 1 delivery) are required, got {}",
                found
            ),
            InputError::NoVehicles => write!(f, "vehicle count must be positive"),
            InputError::ZeroCapacity { vehicle } => {
                write!(f, "vehicle {} has zero capacity", vehicle)
            }
            InputError::InvalidCoordinate { index } => {
                write!(f, "stop {} has an invalid coordinate", index)
            }
            InputError::MatrixShape { expected } => {
                write!(f, "distance matrix must be {0}x{0}", expected)
            }
            InputError::NonZeroDiagonal { index } => {
                write!(f, "distance matrix diagonal is not zero at {}", index)
            }
            InputError::DemandShape { expected, found } => write!(
                f,
                "demand vector must have {} entries with depot demand 0, got {}",
                expected, found
            ),
        }
    }
}

impl std::error::Error for InputError {}

/// Square matrix of travel distances in meters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistanceMatrix {
    rows: Vec<Vec<u32>>,
}

impl DistanceMatrix {
    pub fn new(rows: Vec<Vec<u32>>) -> Result<Self, InputError> {
        let n = rows.len();
        if rows.iter().any(|row| row.len() != n) {
            return Err(InputError::MatrixShape { expected: n });
        }
        if let Some(index) = (0..n).find(|&i| rows[i][i] != 0) {
            return Err(InputError::NonZeroDiagonal { index });
        }
        Ok(Self { rows })
    }

    #[inline]
    pub fn get(&self, from: usize, to: usize) -> u32 {
        self.rows[from][to]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Length of a closed tour: depot → `stops`… → depot.
    pub fn tour_length(&self, depot: usize, stops: &[usize]) -> u64 {
        let mut total = 0u64;
        let mut prev = depot;
        for &stop in stops {
            total += u64::from(self.get(prev, stop));
            prev = stop;
        }
        total + u64::from(self.get(prev, depot))
    }
}

/// Distance matrix plus per-stop demand. Index 0 is the depot.
#[derive(Debug, Clone)]
pub struct Problem {
    matrix: DistanceMatrix,
    demand: Vec<u32>,
}

impl Problem {
    /// Builds the problem with haversine distances.
    pub fn build(stops: &[Stop]) -> Result<Self, InputError> {
        Self::build_with(stops, &HaversineMatrix)
    }

    pub fn build_with<M: DistanceMatrixProvider>(
        stops: &[Stop],
        provider: &M,
    ) -> Result<Self, InputError> {
        if stops.is_empty() {
            return Err(InputError::NoStops);
        }
        if let Some(index) = stops.iter().position(|stop| !stop.has_valid_coords()) {
            return Err(InputError::InvalidCoordinate { index });
        }

        let locations: Vec<(f64, f64)> = stops.iter().map(Stop::coords).collect();
        let rows = provider.matrix_for(&locations);
        if rows.len() != stops.len() {
            return Err(InputError::MatrixShape {
                expected: stops.len(),
            });
        }
        let matrix = DistanceMatrix::new(rows)?;

        let demand = (0..stops.len()).map(|i| u32::from(i > 0)).collect();

        Ok(Self { matrix, demand })
    }

    /// Assembles a problem from a precomputed matrix and demand vector.
    pub fn from_parts(matrix: DistanceMatrix, demand: Vec<u32>) -> Result<Self, InputError> {
        if matrix.is_empty() {
            return Err(InputError::NoStops);
        }
        if demand.len() != matrix.len() || demand[0] != 0 {
            return Err(InputError::DemandShape {
                expected: matrix.len(),
                found: demand.len(),
            });
        }
        Ok(Self { matrix, demand })
    }

    pub fn matrix(&self) -> &DistanceMatrix {
        &self.matrix
    }

    pub fn demand(&self) -> &[u32] {
        &self.demand
    }

    /// Number of locations including the depot.
    pub fn len(&self) -> usize {
        self.matrix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.is_empty()
    }

    pub fn total_demand(&self) -> u64 {
        self.demand.iter().map(|&d| u64::from(d)).sum()
    }
}

/// Vehicles available for a solve. Vehicle ids are 1-based positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fleet {
    capacities: Vec<u32>,
}

impl Fleet {
    /// `count` interchangeable vehicles sharing one capacity.
    pub fn uniform(count: usize, capacity: u32) -> Result<Self, InputError> {
        Self::with_capacities(vec![capacity; count])
    }

    pub fn with_capacities(capacities: Vec<u32>) -> Result<Self, InputError> {
        if capacities.is_empty() {
            return Err(InputError::NoVehicles);
        }
        if let Some(index) = capacities.iter().position(|&c| c == 0) {
            return Err(InputError::ZeroCapacity { vehicle: index + 1 });
        }
        Ok(Self { capacities })
    }

    pub fn len(&self) -> usize {
        self.capacities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capacities.is_empty()
    }

    pub fn capacity(&self, vehicle_index: usize) -> u32 {
        self.capacities[vehicle_index]
    }

    pub fn capacities(&self) -> &[u32] {
        &self.capacities
    }

    pub fn total_capacity(&self) -> u64 {
        self.capacities.iter().map(|&c| u64::from(c)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haversine::distance;

    fn stops() -> Vec<Stop> {
        vec![
            Stop::new("Depot", -23.5505, -46.6333),
            Stop::new("A", -23.5605, -46.6433),
            Stop::new("B", -23.5450, -46.6200),
        ]
    }

    #[test]
    fn test_build_matrix_and_demand() {
        let stops = stops();
        let problem = Problem::build(&stops).unwrap();

        assert_eq!(problem.len(), 3);
        assert_eq!(problem.demand(), &[0, 1, 1]);
        assert_eq!(problem.total_demand(), 2);
        for i in 0..3 {
            assert_eq!(problem.matrix().get(i, i), 0);
            for j in 0..3 {
                assert_eq!(problem.matrix().get(i, j), problem.matrix().get(j, i));
            }
        }
        assert_eq!(
            problem.matrix().get(0, 1),
            distance(stops[0].coords(), stops[1].coords())
        );
    }

    #[test]
    fn test_depot_only_builds() {
        let problem = Problem::build(&stops()[..1]).unwrap();
        assert_eq!(problem.len(), 1);
        assert_eq!(problem.demand(), &[0]);
    }

    #[test]
    fn test_empty_stops_rejected() {
        assert_eq!(Problem::build(&[]).unwrap_err(), InputError::NoStops);
    }

    #[test]
    fn test_invalid_coordinate_rejected() {
        let mut stops = stops();
        stops.push(Stop::new("Broken", f64::NAN, 0.0));
        assert_eq!(
            Problem::build(&stops).unwrap_err(),
            InputError::InvalidCoordinate { index: 3 }
        );
    }

    #[test]
    fn test_short_provider_matrix_rejected() {
        struct Truncating;
        impl DistanceMatrixProvider for Truncating {
            fn matrix_for(&self, _locations: &[(f64, f64)]) -> Vec<Vec<u32>> {
                Vec::new()
            }
        }

        assert_eq!(
            Problem::build_with(&stops(), &Truncating).unwrap_err(),
            InputError::MatrixShape { expected: 3 }
        );
    }

    #[test]
    fn test_from_parts_validates_demand() {
        let matrix = DistanceMatrix::new(vec![vec![0, 5], vec![5, 0]]).unwrap();
        assert!(Problem::from_parts(matrix.clone(), vec![0, 1]).is_ok());
        assert_eq!(
            Problem::from_parts(matrix.clone(), vec![1, 1]).unwrap_err(),
            InputError::DemandShape { expected: 2, found: 2 }
        );
        assert_eq!(
            Problem::from_parts(matrix, vec![0]).unwrap_err(),
            InputError::DemandShape { expected: 2, found: 1 }
        );
    }

    #[test]
    fn test_ragged_matrix_rejected() {
        assert_eq!(
            DistanceMatrix::new(vec![vec![0, 1], vec![1]]).unwrap_err(),
            InputError::MatrixShape { expected: 2 }
        );
    }

    #[test]
    fn test_nonzero_diagonal_rejected() {
        assert_eq!(
            DistanceMatrix::new(vec![vec![0, 1], vec![1, 3]]).unwrap_err(),
            InputError::NonZeroDiagonal { index: 1 }
        );
    }

    #[test]
    fn test_tour_length() {
        let matrix =
            DistanceMatrix::new(vec![vec![0, 1, 4], vec![1, 0, 2], vec![4, 2, 0]]).unwrap();
        assert_eq!(matrix.tour_length(0, &[]), 0);
        assert_eq!(matrix.tour_length(0, &[1, 2]), 1 + 2 + 4);
    }

    #[test]
    fn test_fleet_validation() {
        let fleet = Fleet::uniform(2, 5).unwrap();
        assert_eq!(fleet.len(), 2);
        assert_eq!(fleet.total_capacity(), 10);

        assert_eq!(Fleet::uniform(0, 5).unwrap_err(), InputError::NoVehicles);
        assert_eq!(
            Fleet::uniform(2, 0).unwrap_err(),
            InputError::ZeroCapacity { vehicle: 1 }
        );
        assert_eq!(
            Fleet::with_capacities(vec![3, 0]).unwrap_err(),
            InputError::ZeroCapacity { vehicle: 2 }
        );
    }
}
