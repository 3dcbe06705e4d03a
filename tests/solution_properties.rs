//! Invariants that must hold for every solve.

use std::time::Duration;

use proptest::prelude::*;

use route_planner::baseline::baseline_cost;
use route_planner::problem::{Fleet, Problem};
use route_planner::solver::{Infeasibility, SolveOptions, SolveOutcome, solve};
use route_planner::stops::Stop;

fn stops_strategy() -> impl Strategy<Value = Vec<Stop>> {
    prop::collection::vec((-23.70f64..-23.45, -46.80f64..-46.45), 1..12).prop_map(|coords| {
        coords
            .into_iter()
            .enumerate()
            .map(|(i, (lat, lon))| Stop::new(format!("stop-{}", i), lat, lon))
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn every_solution_is_complete_and_within_capacity(
        stops in stops_strategy(),
        vehicles in 1usize..4,
        capacity in 1u32..6,
    ) {
        let problem = Problem::build(&stops).unwrap();
        let fleet = Fleet::uniform(vehicles, capacity).unwrap();
        let options = SolveOptions {
            time_budget: Duration::from_millis(500),
            ..SolveOptions::default()
        };
        let deliveries = stops.len() - 1;

        match solve(&problem, &fleet, &options) {
            SolveOutcome::Solved(solution) => {
                prop_assert!(deliveries as u64 <= fleet.total_capacity());

                let mut served = vec![0usize; stops.len()];
                for route in &solution.routes {
                    prop_assert!(route.load <= capacity);
                    prop_assert!(!route.deliveries().is_empty());
                    for &stop in route.deliveries() {
                        served[stop] += 1;
                    }
                }
                prop_assert_eq!(served[0], 0);
                prop_assert!(served[1..].iter().all(|&count| count == 1));
            }
            SolveOutcome::Infeasible(reason) => {
                prop_assert_eq!(
                    reason,
                    Infeasibility::CapacityExceeded {
                        demand: deliveries as u64,
                        capacity: vehicles as u64 * u64::from(capacity),
                    }
                );
            }
        }
    }

    #[test]
    fn one_vehicle_for_everything_stays_within_baseline(
        stops in stops_strategy(),
        vehicles in 1usize..4,
    ) {
        let problem = Problem::build(&stops).unwrap();
        let fleet = Fleet::uniform(vehicles, 20).unwrap();
        let options = SolveOptions {
            time_budget: Duration::from_millis(500),
            ..SolveOptions::default()
        };

        let outcome = solve(&problem, &fleet, &options);
        let solution = outcome.solution().expect("one vehicle carries every delivery");
        let baseline = baseline_cost(&stops);
        prop_assert!(
            solution.total_distance <= baseline,
            "optimized {} > baseline {} with routes {:?}",
            solution.total_distance,
            baseline,
            solution.routes.iter().map(|r| &r.stops).collect::<Vec<_>>()
        );
    }
}
