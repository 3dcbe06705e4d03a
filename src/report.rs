//! Maps solver routes back onto stops.

use serde::Serialize;

use crate::problem::Problem;
use crate::solver::{Solution, Termination};
use crate::stops::Stop;

/// One visit along a route, depot legs included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStep {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Distance from the previous step (0 for the departure).
    pub leg_distance: u64,
    pub cumulative_distance: u64,
    /// Deliveries made so far, this one included.
    pub cumulative_load: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteReport {
    pub vehicle: usize,
    pub steps: Vec<RouteStep>,
    pub distance: u64,
    pub load: u32,
}

impl RouteReport {
    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name.as_str()).collect()
    }

    /// Ordered (lat, lng) pairs, as a map layer would draw the route.
    pub fn coordinates(&self) -> Vec<(f64, f64)> {
        self.steps.iter().map(|step| (step.lat, step.lon)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanReport {
    pub routes: Vec<RouteReport>,
    pub optimized_distance: u64,
    /// Tour length when visiting stops in input order.
    pub baseline_distance: u64,
    pub termination: Termination,
}

impl PlanReport {
    /// Meters saved against the baseline; negative when planning lost.
    pub fn savings(&self) -> i64 {
        self.baseline_distance as i64 - self.optimized_distance as i64
    }
}

/// Converts each used route of `solution` into named, coordinated steps.
///
/// `stops` and `problem` must describe the same locations in the same order.
pub fn aggregate(stops: &[Stop], problem: &Problem, solution: &Solution) -> Vec<RouteReport> {
    let matrix = problem.matrix();
    let demand = problem.demand();

    solution
        .routes
        .iter()
        .filter(|route| !route.deliveries().is_empty())
        .map(|route| {
            let mut steps = Vec::with_capacity(route.stops.len());
            let mut cumulative_distance = 0u64;
            let mut cumulative_load = 0u32;
            let mut prev = None;

            for &index in &route.stops {
                let leg_distance = prev.map_or(0, |p| u64::from(matrix.get(p, index)));
                cumulative_distance += leg_distance;
                cumulative_load += demand[index];
                let stop = &stops[index];
                steps.push(RouteStep {
                    name: stop.name.clone(),
                    lat: stop.lat,
                    lon: stop.lon,
                    leg_distance,
                    cumulative_distance,
                    cumulative_load,
                });
                prev = Some(index);
            }

            RouteReport {
                vehicle: route.vehicle,
                steps,
                distance: cumulative_distance,
                load: cumulative_load,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Fleet;
    use crate::solver::{Route, SolveOptions, solve};

    fn stops() -> Vec<Stop> {
        vec![
            Stop::new("Depot", -23.5505, -46.6333),
            Stop::new("A", -23.5605, -46.6433),
            Stop::new("B", -23.5615, -46.6443),
        ]
    }

    #[test]
    fn test_steps_accumulate_distance_and_load() {
        let stops = stops();
        let problem = Problem::build(&stops).unwrap();
        let fleet = Fleet::uniform(1, 5).unwrap();
        let outcome = solve(&problem, &fleet, &SolveOptions::default());
        let solution = outcome.solution().unwrap();

        let reports = aggregate(&stops, &problem, solution);
        assert_eq!(reports.len(), 1);
        let report = &reports[0];

        assert_eq!(report.vehicle, 1);
        assert_eq!(report.steps.len(), 4);
        assert_eq!(report.names().first(), Some(&"Depot"));
        assert_eq!(report.names().last(), Some(&"Depot"));
        assert_eq!(report.steps[0].leg_distance, 0);
        assert_eq!(report.steps[0].cumulative_load, 0);
        assert_eq!(report.steps[3].cumulative_load, 2);
        assert_eq!(report.load, 2);
        assert_eq!(report.distance, solution.routes[0].distance);
        assert_eq!(
            report.steps.iter().map(|s| s.leg_distance).sum::<u64>(),
            report.distance
        );
        assert_eq!(report.coordinates()[0], (-23.5505, -46.6333));
    }

    #[test]
    fn test_empty_routes_are_omitted() {
        let stops = stops();
        let problem = Problem::build(&stops).unwrap();
        let solution = Solution {
            routes: vec![
                Route {
                    vehicle: 1,
                    stops: vec![0, 0],
                    distance: 0,
                    load: 0,
                },
                Route {
                    vehicle: 2,
                    stops: vec![0, 1, 2, 0],
                    distance: problem.matrix().tour_length(0, &[1, 2]),
                    load: 2,
                },
            ],
            total_distance: problem.matrix().tour_length(0, &[1, 2]),
            objective: 0,
            iterations: 0,
            termination: Termination::LocalOptimum,
        };

        let reports = aggregate(&stops, &problem, &solution);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].vehicle, 2);
        assert_eq!(reports[0].names(), vec!["Depot", "A", "B", "Depot"]);
    }

    #[test]
    fn test_savings_sign() {
        let report = PlanReport {
            routes: Vec::new(),
            optimized_distance: 900,
            baseline_distance: 1000,
            termination: Termination::LocalOptimum,
        };
        assert_eq!(report.savings(), 100);

        let worse = PlanReport {
            optimized_distance: 1200,
            ..report
        };
        assert_eq!(worse.savings(), -200);
    }
}
