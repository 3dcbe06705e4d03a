//! One-call planning over a stop list.

use serde::Serialize;
use tracing::info;

use crate::baseline::sequential_cost;
use crate::haversine::HaversineMatrix;
use crate::problem::{Fleet, InputError, Problem};
use crate::report::{PlanReport, aggregate};
use crate::solver::{Infeasibility, SolveOptions, SolveOutcome, solve};
use crate::stops::Stop;
use crate::traits::DistanceMatrixProvider;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlanOutcome {
    Planned(PlanReport),
    /// No routes at all; the fleet cannot serve every stop.
    Infeasible {
        infeasibility: Infeasibility,
        baseline_distance: u64,
    },
}

impl PlanOutcome {
    pub fn report(&self) -> Option<&PlanReport> {
        match self {
            PlanOutcome::Planned(report) => Some(report),
            PlanOutcome::Infeasible { .. } => None,
        }
    }

    pub fn baseline_distance(&self) -> u64 {
        match self {
            PlanOutcome::Planned(report) => report.baseline_distance,
            PlanOutcome::Infeasible {
                baseline_distance, ..
            } => *baseline_distance,
        }
    }
}

/// Plans routes for `stops` (index 0 is the depot) with haversine distances.
pub fn plan(
    stops: &[Stop],
    fleet: &Fleet,
    options: &SolveOptions,
) -> Result<PlanOutcome, InputError> {
    plan_with(stops, fleet, options, &HaversineMatrix)
}

/// Like [`plan`], with distances from `provider`. The baseline is measured on
/// the same matrix.
pub fn plan_with<M: DistanceMatrixProvider>(
    stops: &[Stop],
    fleet: &Fleet,
    options: &SolveOptions,
    provider: &M,
) -> Result<PlanOutcome, InputError> {
    if stops.len() < 2 {
        return Err(if stops.is_empty() {
            InputError::NoStops
        } else {
            InputError::TooFewStops { found: stops.len() }
        });
    }

    let problem = Problem::build_with(stops, provider)?;
    let baseline_distance = sequential_cost(problem.matrix());
    info!(
        stops = stops.len(),
        vehicles = fleet.len(),
        baseline_distance,
        "planning"
    );

    let outcome = match solve(&problem, fleet, options) {
        SolveOutcome::Solved(solution) => {
            let routes = aggregate(stops, &problem, &solution);
            PlanOutcome::Planned(PlanReport {
                routes,
                optimized_distance: solution.total_distance,
                baseline_distance,
                termination: solution.termination,
            })
        }
        SolveOutcome::Infeasible(infeasibility) => PlanOutcome::Infeasible {
            infeasibility,
            baseline_distance,
        },
    };

    Ok(outcome)
}
