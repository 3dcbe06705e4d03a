//! Stops and the caller-owned stop list.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::traits::Geocoder;

/// A named point to visit. The first stop of a list is the depot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl Stop {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
        }
    }

    /// Location coordinates (lat, lng).
    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }

    pub fn has_valid_coords(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Accumulates stops across a session until cleared.
///
/// Stops can only be appended or cleared all at once, so index 0 stays the
/// depot for as long as the list is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StopList {
    stops: Vec<Stop>,
}

impl StopList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stop: Stop) -> &Stop {
        self.stops.push(stop);
        &self.stops[self.stops.len() - 1]
    }

    /// Resolves `address` and appends it, named after the address.
    ///
    /// Returns `None` (and leaves the list untouched) when the geocoder cannot
    /// resolve it.
    pub fn push_address<G: Geocoder>(&mut self, address: &str, geocoder: &G) -> Option<&Stop> {
        match geocoder.locate(address) {
            Some((lat, lon)) => {
                info!(address, lat, lon, "stop added");
                Some(self.push(Stop::new(address, lat, lon)))
            }
            None => {
                warn!(address, "address could not be resolved, not added");
                None
            }
        }
    }

    pub fn clear(&mut self) {
        self.stops.clear();
    }

    pub fn depot(&self) -> Option<&Stop> {
        self.stops.first()
    }

    /// Every stop after the depot.
    pub fn deliveries(&self) -> &[Stop] {
        self.stops.get(1..).unwrap_or(&[])
    }

    pub fn as_slice(&self) -> &[Stop] {
        &self.stops
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }
}

impl From<Vec<Stop>> for StopList {
    fn from(stops: Vec<Stop>) -> Self {
        Self { stops }
    }
}

impl FromIterator<Stop> for StopList {
    fn from_iter<I: IntoIterator<Item = Stop>>(iter: I) -> Self {
        Self {
            stops: iter.into_iter().collect(),
        }
    }
}
