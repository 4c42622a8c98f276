//! Trip planning computed in process: road routes from a [`RouteProvider`],
//! places from a [`Geocoder`], stations from the local repository.

mod cache;
mod nominatim;
mod osrm;

use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

pub use cache::*;
pub use nominatim::*;
pub use osrm::*;

use crate::{
    config::Config,
    repository::{StationRepository, VehicleType},
    service::{self, TripService},
    shared::{
        geo::{BoundingBox, Coordinate, Distance},
        polyline, round_to,
        time::Duration,
    },
    trip::{
        CorridorMatcher, LocationSearchResult, RouteGeometry, RouteTotals, TripLeg,
        TripPlanRequest, TripPlanResponse, TripRoute,
    },
};

#[derive(Error, Debug)]
pub enum Error {
    #[error("At least two stops are required, got {0}")]
    NotEnoughStops(usize),
    #[error("Corridor width must be positive, got {0} km")]
    InvalidCorridor(f64),
    #[error("No route found: {0}")]
    NoRoute(String),
    #[error("Routing returned {got} legs for {expected} stop pairs")]
    LegMismatch { expected: usize, got: usize },
    #[error("Routing request failed: {0}")]
    Routing(reqwest::Error),
    #[error("Routing service responded with status {0}")]
    RoutingStatus(u16),
    #[error("Geocoding request failed: {0}")]
    Geocoding(reqwest::Error),
    #[error("Geocoding service responded with status {0}")]
    GeocodingStatus(u16),
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid route geometry: {0}")]
    Polyline(#[from] polyline::Error),
    #[error("Invalid url: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoadLeg {
    pub distance: Distance,
    pub duration: Duration,
}

/// A drivable route through every stop, in stop order.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadRoute {
    pub distance: Distance,
    pub duration: Duration,
    /// Encoded polyline, precision 5.
    pub polyline: String,
    /// One per consecutive stop pair.
    pub legs: Vec<RoadLeg>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    pub label: String,
    pub coordinate: Coordinate,
}

#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn route(
        &self,
        stops: &[Coordinate],
        vehicle_type: Option<VehicleType>,
    ) -> Result<RoadRoute, self::Error>;
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &str, limit: usize) -> Result<Vec<GeocodedPlace>, self::Error>;
}

pub struct LocalPlanner {
    repository: Arc<RwLock<StationRepository>>,
    routes: Arc<dyn RouteProvider>,
    geocoder: Arc<dyn Geocoder>,
    cache: RouteCache,
    corridor: Distance,
    geocode_limit: usize,
}

impl LocalPlanner {
    pub fn new(
        repository: Arc<RwLock<StationRepository>>,
        routes: Arc<dyn RouteProvider>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        let config = Config::default();
        Self {
            repository,
            routes,
            geocoder,
            cache: RouteCache::new(config.route_cache_ttl),
            corridor: config.corridor,
            geocode_limit: config.geocode_limit,
        }
    }

    /// Planner backed by OSRM and Nominatim at the configured urls.
    pub fn from_config(
        config: &Config,
        repository: Arc<RwLock<StationRepository>>,
    ) -> Result<Self, self::Error> {
        let routes = OsrmRouteProvider::new(config)?;
        let geocoder = NominatimGeocoder::new(config)?;
        Ok(Self::new(repository, Arc::new(routes), Arc::new(geocoder))
            .with_corridor(config.corridor)
            .with_cache(RouteCache::new(config.route_cache_ttl))
            .with_geocode_limit(config.geocode_limit))
    }

    pub fn with_corridor(mut self, corridor: Distance) -> Self {
        self.corridor = corridor;
        self
    }

    pub fn with_cache(mut self, cache: RouteCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_geocode_limit(mut self, limit: usize) -> Self {
        self.geocode_limit = limit;
        self
    }

    pub fn repository(&self) -> &Arc<RwLock<StationRepository>> {
        &self.repository
    }

    pub fn cache(&self) -> &RouteCache {
        &self.cache
    }

    /// Places matching `query`, each with a count of stations by status
    /// within `radius`. A literal "lat, lng" skips the geocoder.
    pub async fn search_locations(
        &self,
        query: &str,
        radius: Distance,
    ) -> Result<Vec<LocationSearchResult>, self::Error> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let places = match Coordinate::parse_pair(query) {
            Some(coordinate) => vec![GeocodedPlace {
                label: coordinate.to_string(),
                coordinate,
            }],
            None => self.geocoder.geocode(query, self.geocode_limit).await?,
        };
        let repository = self.repository.read().await;
        Ok(places
            .into_iter()
            .map(|place| LocationSearchResult {
                availability: repository.availability_summary(&place.coordinate, radius),
                label: place.label,
                coordinate: place.coordinate,
            })
            .collect())
    }

    pub async fn plan_trip(
        &self,
        request: &TripPlanRequest,
    ) -> Result<TripPlanResponse, self::Error> {
        let stops = &request.stops;
        if stops.len() < 2 {
            return Err(Error::NotEnoughStops(stops.len()));
        }
        let corridor = match request.corridor_km {
            Some(km) if km.is_finite() && km > 0.0 => Distance::from_kilometers(km),
            Some(km) => return Err(Error::InvalidCorridor(km)),
            None => self.corridor,
        };

        let now = Instant::now();
        let key = route_cache_key(stops, request.vehicle_type);
        let road = match self.cache.get(&key) {
            Some(road) => {
                debug!("Route cache hit for {key}");
                road
            }
            None => {
                let coordinates: Vec<Coordinate> =
                    stops.iter().map(|stop| stop.coordinate).collect();
                let road = self.routes.route(&coordinates, request.vehicle_type).await?;
                self.cache.insert(key, road.clone());
                road
            }
        };
        if road.legs.len() != stops.len() - 1 {
            return Err(Error::LegMismatch {
                expected: stops.len() - 1,
                got: road.legs.len(),
            });
        }

        let geometry = RouteGeometry::new(polyline::decode(&road.polyline)?);
        let bbox = geometry
            .bounds()
            .or_else(|| BoundingBox::from_coordinates(stops.iter().map(|stop| &stop.coordinate)))
            .ok_or(Error::NotEnoughStops(stops.len()))?;
        let legs = stops
            .windows(2)
            .zip(&road.legs)
            .map(|(pair, leg)| TripLeg {
                from_label: pair[0].label.clone(),
                to_label: pair[1].label.clone(),
                distance_km: round_to(leg.distance.as_kilometers(), 2),
                duration_min: round_to(leg.duration.as_minutes(), 1),
            })
            .collect();

        let totals = RouteTotals {
            distance: road.distance,
            duration: road.duration,
        };
        let matcher = CorridorMatcher::new(corridor).for_vehicle(request.vehicle_type);
        let stations = {
            let repository = self.repository.read().await;
            let candidates = repository.stations_in_bounds(&bbox.expand(corridor));
            matcher.match_stations(candidates, &geometry, totals)
        };
        info!(
            "Planned {} stops over {:.1} km with {} stations in a {} km corridor, took {:?}",
            stops.len(),
            road.distance.as_kilometers(),
            stations.len(),
            corridor.as_kilometers(),
            now.elapsed()
        );

        Ok(TripPlanResponse {
            route: TripRoute {
                distance_km: round_to(road.distance.as_kilometers(), 2),
                duration_min: round_to(road.duration.as_minutes(), 1),
                polyline: road.polyline,
                bbox,
                legs,
            },
            stations,
        })
    }
}

#[async_trait]
impl TripService for LocalPlanner {
    async fn search_locations(
        &self,
        query: &str,
        radius: Distance,
    ) -> Result<Vec<LocationSearchResult>, service::Error> {
        Ok(LocalPlanner::search_locations(self, query, radius).await?)
    }

    async fn plan_trip(&self, request: &TripPlanRequest) -> Result<TripPlanResponse, service::Error> {
        Ok(LocalPlanner::plan_trip(self, request).await?)
    }
}
