//! Nominatim HTTP adapter for address lookup.

use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::traits::Geocoder;

#[derive(Debug, Clone)]
pub struct NominatimConfig {
    pub base_url: String,
    /// Nominatim's usage policy requires an identifying user agent.
    pub user_agent: String,
    /// Comma-separated ISO 3166-1 codes; `None` searches worldwide.
    pub country_codes: Option<String>,
    pub timeout_secs: u64,
    /// Minimum spacing between two requests.
    pub min_interval: Duration,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: concat!("route-planner/", env!("CARGO_PKG_VERSION")).to_string(),
            country_codes: Some("br".to_string()),
            timeout_secs: 10,
            min_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug)]
pub enum GeocodeError {
    Http(reqwest::Error),
    InvalidCoordinate(String),
}

impl fmt::Display for GeocodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeocodeError::Http(err) => write!(f, "geocoding request failed: {}", err),
            GeocodeError::InvalidCoordinate(value) => {
                write!(f, "geocoder returned an invalid coordinate {:?}", value)
            }
        }
    }
}

impl std::error::Error for GeocodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GeocodeError::Http(err) => Some(err),
            GeocodeError::InvalidCoordinate(_) => None,
        }
    }
}

impl From<reqwest::Error> for GeocodeError {
    fn from(err: reqwest::Error) -> Self {
        GeocodeError::Http(err)
    }
}

#[derive(Debug)]
pub struct NominatimClient {
    config: NominatimConfig,
    client: reqwest::blocking::Client,
    last_request: Mutex<Option<Instant>>,
}

impl NominatimClient {
    pub fn new(config: NominatimConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            config,
            client,
            last_request: Mutex::new(None),
        })
    }

    /// Looks up `address`, returning the best match if any.
    pub fn search(&self, address: &str) -> Result<Option<(f64, f64)>, GeocodeError> {
        self.throttle();

        let places = self
            .request(address)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<Vec<NominatimPlace>>())?;

        places
            .into_iter()
            .next()
            .map(NominatimPlace::coords)
            .transpose()
    }

    fn request(&self, address: &str) -> reqwest::blocking::RequestBuilder {
        let url = format!("{}/search", self.config.base_url.trim_end_matches('/'));
        let mut query = vec![("q", address), ("format", "jsonv2"), ("limit", "1")];
        if let Some(codes) = &self.config.country_codes {
            query.push(("countrycodes", codes.as_str()));
        }
        self.client.get(url).query(&query)
    }

    /// Sleeps until `min_interval` has passed since the previous request.
    fn throttle(&self) {
        let mut last = match self.last_request.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.config.min_interval {
                std::thread::sleep(self.config.min_interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}

impl Geocoder for NominatimClient {
    fn locate(&self, address: &str) -> Option<(f64, f64)> {
        match self.search(address) {
            Ok(Some(coords)) => {
                debug!(address, lat = coords.0, lon = coords.1, "address resolved");
                Some(coords)
            }
            Ok(None) => {
                debug!(address, "no match");
                None
            }
            Err(err) => {
                warn!(address, error = %err, "geocoding failed");
                None
            }
        }
    }
}

/// Nominatim encodes coordinates as strings.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

impl NominatimPlace {
    fn coords(self) -> Result<(f64, f64), GeocodeError> {
        let lat = self
            .lat
            .parse::<f64>()
            .map_err(|_| GeocodeError::InvalidCoordinate(self.lat.clone()))?;
        let lon = self
            .lon
            .parse::<f64>()
            .map_err(|_| GeocodeError::InvalidCoordinate(self.lon.clone()))?;
        Ok((lat, lon))
    }
}
