//! Test fixtures for route-planner.
//!
//! Real Sao Paulo landmarks (coordinates from OpenStreetMap) and helpers to
//! turn them into stop lists.

pub mod sao_paulo_locations;

pub use sao_paulo_locations::*;
