//! route-planner
//!
//! Capacitated single-depot vehicle routing over geographic stops: haversine
//! distances, cheapest-insertion construction and time-budgeted local search.

pub mod traits;
pub mod haversine;
pub mod stops;
pub mod problem;
pub mod solver;
pub mod baseline;
pub mod report;
pub mod planner;
pub mod nominatim;
