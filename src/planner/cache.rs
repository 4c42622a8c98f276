use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

use crate::{planner::RoadRoute, repository::VehicleType, trip::TripStop};

/// Key for a road route: vehicle type plus the stop coordinates rounded to
/// about a meter. Labels do not take part.
pub fn route_cache_key(stops: &[TripStop], vehicle_type: Option<VehicleType>) -> String {
    let vehicle = vehicle_type.map(|v| v.as_str()).unwrap_or("unknown");
    let coordinates: Vec<String> = stops
        .iter()
        .map(|stop| {
            format!(
                "{:.5},{:.5}",
                stop.coordinate.latitude, stop.coordinate.longitude
            )
        })
        .collect();
    format!("v1|{vehicle}|{}", coordinates.join("|"))
}

struct Entry {
    expires_at: Instant,
    route: RoadRoute,
}

/// Road routes keyed by [`route_cache_key`], each kept for a fixed time.
pub struct RouteCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl RouteCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &str) -> Option<RoadRoute> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.route.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: String, route: RoadRoute) {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key,
            Entry {
                expires_at: now + self.ttl,
                route,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
