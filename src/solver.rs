//! Routing search engine.
//!
//! Two phases: a cheapest-insertion construction that respects vehicle
//! capacity, then best-improvement local search (2-opt, relocate, exchange)
//! bounded by a wall-clock budget, an iteration cap and an optional
//! cancellation flag.
//!
//! When one vehicle can carry every delivery, the input order on that
//! vehicle is a second starting point. The search starts from whichever of
//! the two scores lower, so the result is never longer than the input order.
//!
//! The objective is total distance plus `span_coefficient` times the span
//! (longest minus shortest used route). A move is applied only if it strictly
//! lowers the objective. Among equally good moves the one leaving the smaller
//! span wins; remaining ties go to the first move in a fixed order (kind,
//! then indices), so parallel evaluation never changes the result.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::problem::{DistanceMatrix, Fleet, Problem};

/// Index of the depot in every problem.
pub const DEPOT: usize = 0;

#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Wall-clock budget for the whole solve.
    pub time_budget: Duration,
    /// Weight of the span between the longest and shortest used route.
    pub span_coefficient: u64,
    /// Maximum number of improving moves applied.
    pub max_iterations: usize,
    /// Checked at every iteration boundary.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            time_budget: Duration::from_secs(5),
            span_coefficient: 100,
            max_iterations: 10_000,
            cancel: None,
        }
    }
}

/// Why the improvement phase stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// No improving move left.
    LocalOptimum,
    TimeBudget,
    IterationCap,
    Cancelled,
}

impl Termination {
    /// Whether the search ran until no move could improve the solution.
    pub fn converged(self) -> bool {
        self == Termination::LocalOptimum
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Infeasibility {
    /// Total demand is larger than the whole fleet can carry.
    CapacityExceeded { demand: u64, capacity: u64 },
    /// Construction could not fit this stop into any vehicle.
    Unplaceable { stop: usize },
}

impl fmt::Display for Infeasibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Infeasibility::CapacityExceeded { demand, capacity } => write!(
                f,
                "total demand {} exceeds fleet capacity {}",
                demand, capacity
            ),
            Infeasibility::Unplaceable { stop } => {
                write!(f, "stop {} does not fit in any vehicle", stop)
            }
        }
    }
}

/// A used vehicle's tour. `stops` starts and ends at the depot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    /// 1-based vehicle id.
    pub vehicle: usize,
    pub stops: Vec<usize>,
    pub distance: u64,
    pub load: u32,
}

impl Route {
    /// Stops served, depot excluded.
    pub fn deliveries(&self) -> &[usize] {
        &self.stops[1..self.stops.len() - 1]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Solution {
    /// Used routes only, in vehicle order.
    pub routes: Vec<Route>,
    pub total_distance: u64,
    /// Total distance plus the span penalty.
    pub objective: u64,
    pub iterations: usize,
    pub termination: Termination,
}

impl Solution {
    pub fn span(&self) -> u64 {
        let longest = self.routes.iter().map(|r| r.distance).max();
        let shortest = self.routes.iter().map(|r| r.distance).min();
        match (longest, shortest) {
            (Some(longest), Some(shortest)) => longest - shortest,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    Solved(Solution),
    Infeasible(Infeasibility),
}

impl SolveOutcome {
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            SolveOutcome::Solved(solution) => Some(solution),
            SolveOutcome::Infeasible(_) => None,
        }
    }

    pub fn is_feasible(&self) -> bool {
        matches!(self, SolveOutcome::Solved(_))
    }
}

/// Assigns every non-depot stop of `problem` to a vehicle of `fleet` and
/// orders each vehicle's stops.
///
/// Returns shortly after `options.time_budget` runs out. Once it has, any
/// stops construction has not placed yet are appended to the cheapest
/// route with room, and move scans stop early.
pub fn solve(problem: &Problem, fleet: &Fleet, options: &SolveOptions) -> SolveOutcome {
    let started = Instant::now();
    let deadline = started + options.time_budget;

    let demand = problem.total_demand();
    let capacity = fleet.total_capacity();
    if demand > capacity {
        warn!(demand, capacity, "fleet cannot carry total demand");
        return SolveOutcome::Infeasible(Infeasibility::CapacityExceeded { demand, capacity });
    }

    let mut state = SearchState::new(problem, fleet, options.span_coefficient);

    debug!(stops = problem.len() - 1, vehicles = fleet.len(), "constructing");
    let constructed = state.construct(deadline);
    let input_order = SearchState::input_order(problem, fleet, options.span_coefficient);
    match (constructed, input_order) {
        (Err(stop), None) => {
            warn!(stop, "construction failed to place stop");
            return SolveOutcome::Infeasible(Infeasibility::Unplaceable { stop });
        }
        (Err(stop), Some(seed)) => {
            debug!(stop, "construction failed, starting from input order");
            state = seed;
        }
        (Ok(()), Some(seed)) if seed.score() < state.score() => {
            debug!(cost = seed.score().cost, "input order beats construction");
            state = seed;
        }
        (Ok(()), _) => {}
    }
    let initial = state.score();
    debug!(cost = initial.cost, span = initial.span, "construction done");

    let (iterations, termination) = state.improve(options, deadline);
    let solution = state.into_solution(iterations, termination);

    info!(
        routes = solution.routes.len(),
        total_distance = solution.total_distance,
        objective = solution.objective,
        iterations,
        ?termination,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "solve finished"
    );

    SolveOutcome::Solved(solution)
}

/// Objective value of a candidate state. Orders by cost, then span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Score {
    cost: u64,
    span: u64,
}

/// Positions index the route's stop list without the depot. For `Relocate`,
/// `at` is the position after removal when `from == to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Move {
    TwoOpt { route: usize, i: usize, j: usize },
    Relocate { from: usize, pos: usize, to: usize, at: usize },
    Exchange { a: usize, pos_a: usize, b: usize, pos_b: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Candidate {
    score: Score,
    mv: Move,
}

#[derive(Debug, Clone, Copy)]
struct RouteChange {
    route: usize,
    distance: u64,
    len: usize,
}

struct SearchState<'a> {
    matrix: &'a DistanceMatrix,
    demand: &'a [u32],
    capacities: &'a [u32],
    span_coefficient: u64,
    routes: Vec<Vec<usize>>,
    distances: Vec<u64>,
    loads: Vec<u32>,
}

impl<'a> SearchState<'a> {
    fn new(problem: &'a Problem, fleet: &'a Fleet, span_coefficient: u64) -> Self {
        let vehicles = fleet.len();
        Self {
            matrix: problem.matrix(),
            demand: problem.demand(),
            capacities: fleet.capacities(),
            span_coefficient,
            routes: vec![Vec::new(); vehicles],
            distances: vec![0; vehicles],
            loads: vec![0; vehicles],
        }
    }

    /// Every delivery in input order on the first vehicle that can carry
    /// them all. `None` if no vehicle can, or there is nothing to deliver.
    fn input_order(
        problem: &'a Problem,
        fleet: &'a Fleet,
        span_coefficient: u64,
    ) -> Option<Self> {
        if problem.len() < 2 {
            return None;
        }
        let load = u32::try_from(problem.total_demand()).ok()?;
        let vehicle = fleet.capacities().iter().position(|&c| c >= load)?;

        let mut state = Self::new(problem, fleet, span_coefficient);
        state.routes[vehicle] = (1..problem.len()).collect();
        state.loads[vehicle] = load;
        state.refresh(vehicle);
        Some(state)
    }

    #[inline]
    fn d(&self, from: usize, to: usize) -> u64 {
        u64::from(self.matrix.get(from, to))
    }

    fn score(&self) -> Score {
        self.score_with(&[])
    }

    /// Score of the current state with `changes` applied on top.
    fn score_with(&self, changes: &[RouteChange]) -> Score {
        let mut total = 0u64;
        let mut longest: Option<u64> = None;
        let mut shortest: Option<u64> = None;

        for route in 0..self.routes.len() {
            let (distance, len) = changes
                .iter()
                .find(|change| change.route == route)
                .map(|change| (change.distance, change.len))
                .unwrap_or((self.distances[route], self.routes[route].len()));

            total += distance;
            if len > 0 {
                longest = Some(longest.map_or(distance, |l| l.max(distance)));
                shortest = Some(shortest.map_or(distance, |s| s.min(distance)));
            }
        }

        let span = match (longest, shortest) {
            (Some(longest), Some(shortest)) => longest - shortest,
            _ => 0,
        };

        Score {
            cost: total.saturating_add(self.span_coefficient.saturating_mul(span)),
            span,
        }
    }

    /// Neighbours of position `pos` in `route` (depot at both ends).
    #[inline]
    fn neighbours(route: &[usize], pos: usize) -> (usize, usize) {
        let prev = if pos == 0 { DEPOT } else { route[pos - 1] };
        let next = route.get(pos + 1).copied().unwrap_or(DEPOT);
        (prev, next)
    }

    /// Neighbours of the gap before position `at` in `route`.
    #[inline]
    fn gap(route: &[usize], at: usize) -> (usize, usize) {
        let prev = if at == 0 { DEPOT } else { route[at - 1] };
        let next = route.get(at).copied().unwrap_or(DEPOT);
        (prev, next)
    }

    fn insertion_distance(&self, route: usize, at: usize, stop: usize) -> u64 {
        let (prev, next) = Self::gap(&self.routes[route], at);
        self.distances[route] + self.d(prev, stop) + self.d(stop, next) - self.d(prev, next)
    }

    fn removal_distance(&self, route: usize, pos: usize) -> u64 {
        let stops = &self.routes[route];
        let (prev, next) = Self::neighbours(stops, pos);
        let stop = stops[pos];
        self.distances[route] + self.d(prev, next) - self.d(prev, stop) - self.d(stop, next)
    }

    fn fits(&self, route: usize, load: u32) -> bool {
        load <= self.capacities[route]
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Cheapest insertion from the depot. Each step inserts the
    /// (stop, vehicle, position) with the lowest resulting score. Past the
    /// deadline the remaining stops go through [`Self::append_remaining`].
    ///
    /// Returns the first stop that fits nowhere.
    fn construct(&mut self, deadline: Instant) -> Result<(), usize> {
        let mut unassigned: Vec<usize> = (1..self.matrix.len()).collect();

        while !unassigned.is_empty() {
            if Instant::now() >= deadline {
                debug!(remaining = unassigned.len(), "time budget spent during construction");
                return self.append_remaining(unassigned);
            }

            let mut best: Option<(Score, usize, usize, usize)> = None;

            for (k, &stop) in unassigned.iter().enumerate() {
                for route in 0..self.routes.len() {
                    if !self.fits(route, self.loads[route] + self.demand[stop]) {
                        continue;
                    }
                    let len = self.routes[route].len();
                    for at in 0..=len {
                        let distance = self.insertion_distance(route, at, stop);
                        let score = self.score_with(&[RouteChange {
                            route,
                            distance,
                            len: len + 1,
                        }]);
                        if best.is_none_or(|(b, ..)| score < b) {
                            best = Some((score, k, route, at));
                        }
                    }
                }
            }

            let Some((_, k, route, at)) = best else {
                return Err(unassigned[0]);
            };
            let stop = unassigned.remove(k);
            self.insert(route, at, stop);
        }

        Ok(())
    }

    /// Appends each stop to the end of the route with room whose score
    /// grows least. One pass over the vehicles per stop.
    fn append_remaining(&mut self, unassigned: Vec<usize>) -> Result<(), usize> {
        for stop in unassigned {
            let mut best: Option<(Score, usize)> = None;
            for route in 0..self.routes.len() {
                if !self.fits(route, self.loads[route] + self.demand[stop]) {
                    continue;
                }
                let len = self.routes[route].len();
                let score = self.score_with(&[RouteChange {
                    route,
                    distance: self.insertion_distance(route, len, stop),
                    len: len + 1,
                }]);
                if best.is_none_or(|(b, _)| score < b) {
                    best = Some((score, route));
                }
            }

            let Some((_, route)) = best else {
                return Err(stop);
            };
            let at = self.routes[route].len();
            self.insert(route, at, stop);
        }
        Ok(())
    }

    fn insert(&mut self, route: usize, at: usize, stop: usize) {
        self.distances[route] = self.insertion_distance(route, at, stop);
        self.loads[route] += self.demand[stop];
        self.routes[route].insert(at, stop);
        trace!(stop, vehicle = route + 1, at, "inserted");
    }

    // ------------------------------------------------------------------
    // Improvement
    // ------------------------------------------------------------------

    fn improve(&mut self, options: &SolveOptions, deadline: Instant) -> (usize, Termination) {
        let mut current = self.score();
        let mut iterations = 0;

        let termination = loop {
            if options
                .cancel
                .as_ref()
                .is_some_and(|flag| flag.load(AtomicOrdering::Relaxed))
            {
                break Termination::Cancelled;
            }
            if iterations >= options.max_iterations {
                break Termination::IterationCap;
            }
            if Instant::now() >= deadline {
                break Termination::TimeBudget;
            }

            let Some(candidate) = self.best_move(current, deadline) else {
                // An empty scan after the deadline may have been cut short.
                if Instant::now() >= deadline {
                    break Termination::TimeBudget;
                }
                break Termination::LocalOptimum;
            };

            self.apply(candidate.mv);
            current = self.score();
            debug_assert_eq!(current, candidate.score);
            iterations += 1;
            trace!(
                iteration = iterations,
                cost = current.cost,
                span = current.span,
                mv = ?candidate.mv,
                "move applied"
            );
        };

        (iterations, termination)
    }

    /// Best strictly improving move over all neighbourhoods, evaluated in
    /// parallel per source route. Scans stop early once `deadline` passes;
    /// any move returned then is still improving.
    fn best_move(&self, current: Score, deadline: Instant) -> Option<Candidate> {
        (0..self.routes.len())
            .into_par_iter()
            .filter_map(|route| self.best_move_from(route, current, deadline))
            .min()
    }

    fn best_move_from(
        &self,
        route: usize,
        current: Score,
        deadline: Instant,
    ) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        let mut consider = |score: Score, mv: Move| {
            if score.cost >= current.cost {
                return;
            }
            let candidate = Candidate { score, mv };
            if best.is_none_or(|b| candidate < b) {
                best = Some(candidate);
            }
        };

        self.two_opt_moves(route, deadline, &mut consider);
        self.relocate_moves(route, deadline, &mut consider);
        self.exchange_moves(route, deadline, &mut consider);

        best
    }

    /// Reverse `stops[i..=j]`.
    fn two_opt_moves(
        &self,
        route: usize,
        deadline: Instant,
        consider: &mut impl FnMut(Score, Move),
    ) {
        let stops = &self.routes[route];
        let n = stops.len();
        if n < 2 {
            return;
        }
        let d = |from: usize, to: usize| self.d(from, to) as i64;
        let base = self.distances[route] as i64;

        for i in 0..n - 1 {
            if Instant::now() >= deadline {
                return;
            }
            let prev = if i == 0 { DEPOT } else { stops[i - 1] };
            let mut forward = 0i64;
            let mut backward = 0i64;

            for j in i + 1..n {
                forward += d(stops[j - 1], stops[j]);
                backward += d(stops[j], stops[j - 1]);
                let next = stops.get(j + 1).copied().unwrap_or(DEPOT);

                let distance = base - d(prev, stops[i]) - d(stops[j], next)
                    + d(prev, stops[j])
                    + d(stops[i], next)
                    - forward
                    + backward;

                let score = self.score_with(&[RouteChange {
                    route,
                    distance: distance as u64,
                    len: n,
                }]);
                consider(score, Move::TwoOpt { route, i, j });
            }
        }
    }

    /// Move one stop of `from` to any position of any route.
    fn relocate_moves(
        &self,
        from: usize,
        deadline: Instant,
        consider: &mut impl FnMut(Score, Move),
    ) {
        let stops = &self.routes[from];
        let n = stops.len();

        for pos in 0..n {
            if Instant::now() >= deadline {
                return;
            }
            let stop = stops[pos];
            let from_distance = self.removal_distance(from, pos);
            // `from` with `stops[pos]` taken out.
            let shortened = |k: usize| if k < pos { stops[k] } else { stops[k + 1] };

            for to in 0..self.routes.len() {
                if to == from {
                    for at in 0..n {
                        if at == pos {
                            continue;
                        }
                        let prev = if at == 0 { DEPOT } else { shortened(at - 1) };
                        let next = if at + 1 < n { shortened(at) } else { DEPOT };
                        let distance = from_distance + self.d(prev, stop) + self.d(stop, next)
                            - self.d(prev, next);

                        let score = self.score_with(&[RouteChange {
                            route: from,
                            distance,
                            len: n,
                        }]);
                        consider(score, Move::Relocate { from, pos, to, at });
                    }
                    continue;
                }

                if !self.fits(to, self.loads[to] + self.demand[stop]) {
                    continue;
                }
                let to_len = self.routes[to].len();
                for at in 0..=to_len {
                    let to_distance = self.insertion_distance(to, at, stop);
                    let score = self.score_with(&[
                        RouteChange {
                            route: from,
                            distance: from_distance,
                            len: n - 1,
                        },
                        RouteChange {
                            route: to,
                            distance: to_distance,
                            len: to_len + 1,
                        },
                    ]);
                    consider(score, Move::Relocate { from, pos, to, at });
                }
            }
        }
    }

    /// Swap one stop of `a` with one stop of every later route.
    fn exchange_moves(
        &self,
        a: usize,
        deadline: Instant,
        consider: &mut impl FnMut(Score, Move),
    ) {
        let d = |from: usize, to: usize| self.d(from, to) as i64;
        let stops_a = &self.routes[a];

        for b in a + 1..self.routes.len() {
            if Instant::now() >= deadline {
                return;
            }
            let stops_b = &self.routes[b];

            for (pos_a, &s) in stops_a.iter().enumerate() {
                let (prev_a, next_a) = Self::neighbours(stops_a, pos_a);

                for (pos_b, &t) in stops_b.iter().enumerate() {
                    let load_a = self.loads[a] - self.demand[s] + self.demand[t];
                    let load_b = self.loads[b] - self.demand[t] + self.demand[s];
                    if !self.fits(a, load_a) || !self.fits(b, load_b) {
                        continue;
                    }
                    let (prev_b, next_b) = Self::neighbours(stops_b, pos_b);

                    let distance_a = self.distances[a] as i64 - d(prev_a, s) - d(s, next_a)
                        + d(prev_a, t)
                        + d(t, next_a);
                    let distance_b = self.distances[b] as i64 - d(prev_b, t) - d(t, next_b)
                        + d(prev_b, s)
                        + d(s, next_b);

                    let score = self.score_with(&[
                        RouteChange {
                            route: a,
                            distance: distance_a as u64,
                            len: stops_a.len(),
                        },
                        RouteChange {
                            route: b,
                            distance: distance_b as u64,
                            len: stops_b.len(),
                        },
                    ]);
                    consider(score, Move::Exchange { a, pos_a, b, pos_b });
                }
            }
        }
    }

    fn apply(&mut self, mv: Move) {
        match mv {
            Move::TwoOpt { route, i, j } => {
                self.routes[route][i..=j].reverse();
                self.refresh(route);
            }
            Move::Relocate { from, pos, to, at } => {
                let stop = self.routes[from].remove(pos);
                self.routes[to].insert(at, stop);
                self.loads[from] -= self.demand[stop];
                self.loads[to] += self.demand[stop];
                self.refresh(from);
                self.refresh(to);
            }
            Move::Exchange { a, pos_a, b, pos_b } => {
                let s = self.routes[a][pos_a];
                let t = self.routes[b][pos_b];
                self.routes[a][pos_a] = t;
                self.routes[b][pos_b] = s;
                self.loads[a] = self.loads[a] - self.demand[s] + self.demand[t];
                self.loads[b] = self.loads[b] - self.demand[t] + self.demand[s];
                self.refresh(a);
                self.refresh(b);
            }
        }
    }

    fn refresh(&mut self, route: usize) {
        self.distances[route] = if self.routes[route].is_empty() {
            0
        } else {
            self.matrix.tour_length(DEPOT, &self.routes[route])
        };
    }

    fn into_solution(self, iterations: usize, termination: Termination) -> Solution {
        let objective = self.score().cost;
        let routes: Vec<Route> = self
            .routes
            .into_iter()
            .zip(self.distances)
            .zip(self.loads)
            .enumerate()
            .filter(|(_, ((stops, _), _))| !stops.is_empty())
            .map(|(index, ((stops, distance), load))| {
                let mut full = Vec::with_capacity(stops.len() + 2);
                full.push(DEPOT);
                full.extend(stops);
                full.push(DEPOT);
                Route {
                    vehicle: index + 1,
                    stops: full,
                    distance,
                    load,
                }
            })
            .collect();
        let total_distance = routes.iter().map(|r| r.distance).sum();

        Solution {
            routes,
            total_distance,
            objective,
            iterations,
            termination,
        }
    }
}
