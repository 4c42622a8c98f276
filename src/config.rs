use std::{env, time::Duration};

use tracing::warn;

use crate::{
    repository::VehicleType,
    shared::geo::{Coordinate, Distance},
    trip::DriverLocation,
};

pub const API_BASE_URL_VAR: &str = "SNAPCHARGE_API_BASE_URL";
pub const OSRM_URL_VAR: &str = "SNAPCHARGE_OSRM_URL";
pub const NOMINATIM_URL_VAR: &str = "SNAPCHARGE_NOMINATIM_URL";
pub const REQUEST_TIMEOUT_VAR: &str = "SNAPCHARGE_REQUEST_TIMEOUT_SECS";
pub const CORRIDOR_VAR: &str = "SNAPCHARGE_CORRIDOR_KM";

pub struct Config {
    /// Marketplace backend serving the driver endpoints.
    pub api_base_url: String,
    pub osrm_base_url: String,
    pub nominatim_url: String,
    pub user_agent: String,
    /// Upper bound for any single remote call.
    pub request_timeout: Duration,
    /// Quiet period before a search or plan request is sent.
    pub debounce: Duration,
    pub corridor: Distance,
    pub search_radius: Distance,
    pub geocode_limit: usize,
    pub route_cache_ttl: Duration,
    /// Sessions count as expired this long before their real expiry.
    pub session_skew: Duration,
    pub default_location: DriverLocation,
    pub default_vehicle_type: VehicleType,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".into(),
            osrm_base_url: "https://router.project-osrm.org".into(),
            nominatim_url: "https://nominatim.openstreetmap.org/search".into(),
            user_agent: "SnapCharge/1.0".into(),
            request_timeout: Duration::from_secs(15),
            debounce: Duration::from_millis(300),
            corridor: Distance::from_kilometers(2.0),
            search_radius: Distance::from_kilometers(20.0),
            geocode_limit: 5,
            route_cache_ttl: Duration::from_secs(10 * 60),
            session_skew: Duration::from_secs(30),
            default_location: DriverLocation::new("Pune", Coordinate::new(18.5204, 73.8567)),
            default_vehicle_type: VehicleType::FourWheeler,
        }
    }
}

impl Config {
    /// Defaults overridden by `SNAPCHARGE_*` environment variables.
    /// Unparsable numeric values are logged and ignored.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_BASE_URL_VAR) {
            self.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = lookup(OSRM_URL_VAR) {
            self.osrm_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = lookup(NOMINATIM_URL_VAR) {
            self.nominatim_url = url;
        }
        if let Some(value) = lookup(REQUEST_TIMEOUT_VAR) {
            match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.request_timeout = Duration::from_secs(secs),
                _ => warn!("Ignoring {REQUEST_TIMEOUT_VAR}={value:?}"),
            }
        }
        if let Some(value) = lookup(CORRIDOR_VAR) {
            match value.trim().parse::<f64>() {
                Ok(km) if km > 0.0 => self.corridor = Distance::from_kilometers(km),
                _ => warn!("Ignoring {CORRIDOR_VAR}={value:?}"),
            }
        }
        self
    }
}
